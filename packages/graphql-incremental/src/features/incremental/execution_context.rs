//! Execution context and the field-resolution collaborator
//!
//! The engine never resolves fields itself. It calls a [`FieldResolver`]
//! supplied by the execution strategy and only orchestrates those calls.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::call_context::DeferredCallContext;
use super::call_state::IncrementalCallState;
use crate::config::EngineConfig;
use crate::errors::FieldFailure;
use crate::shared::models::{GraphQLError, MergedField, ResultPath};

/// Shape of a completed value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompleteValueType {
    Null,
    Scalar,
    Enum,
    Object,
    List,
}

impl CompleteValueType {
    /// Best guess from the JSON value alone (enums look like scalars)
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Null => CompleteValueType::Null,
            Value::Array(_) => CompleteValueType::List,
            Value::Object(_) => CompleteValueType::Object,
            _ => CompleteValueType::Scalar,
        }
    }
}

/// Resolved value of one field plus the field errors raised while resolving it
#[derive(Debug, Clone, PartialEq)]
pub struct FieldValueInfo {
    pub value: Value,
    pub value_type: CompleteValueType,
    pub errors: Vec<GraphQLError>,
}

impl FieldValueInfo {
    pub fn new(value: Value) -> Self {
        let value_type = CompleteValueType::of(&value);
        Self {
            value,
            value_type,
            errors: Vec::new(),
        }
    }

    /// A nullable field that failed: `null` plus its error
    pub fn null_with_error(error: GraphQLError) -> Self {
        Self {
            value: Value::Null,
            value_type: CompleteValueType::Null,
            errors: vec![error],
        }
    }

    pub fn with_value_type(mut self, value_type: CompleteValueType) -> Self {
        self.value_type = value_type;
        self
    }
}

pub type FieldResult = std::result::Result<FieldValueInfo, FieldFailure>;

/// Parameters of one field resolution
#[derive(Debug, Clone)]
pub struct FieldParams {
    pub path: ResultPath,
    pub field: MergedField,
    /// Present when the field is resolved on behalf of a deferred call
    pub deferred_call_context: Option<Arc<DeferredCallContext>>,
}

impl FieldParams {
    pub fn result_key(&self) -> &str {
        self.field.result_key()
    }
}

#[async_trait]
pub trait FieldResolver: Send + Sync {
    async fn resolve(&self, ctx: &ExecutionContext, params: FieldParams) -> FieldResult;
}

struct FnResolver<F>(F);

#[async_trait]
impl<F, Fut> FieldResolver for FnResolver<F>
where
    F: Fn(ExecutionContext, FieldParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FieldResult> + Send + 'static,
{
    async fn resolve(&self, ctx: &ExecutionContext, params: FieldParams) -> FieldResult {
        (self.0)(ctx.clone(), params).await
    }
}

/// Wrap an async closure as a resolver
pub fn resolver_fn<F, Fut>(f: F) -> Arc<dyn FieldResolver>
where
    F: Fn(ExecutionContext, FieldParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = FieldResult> + Send + 'static,
{
    Arc::new(FnResolver(f))
}

/// Per-request state shared by everything that executes on behalf of it
#[derive(Clone)]
pub struct ExecutionContext {
    execution_id: Uuid,
    call_state: IncrementalCallState,
    config: Arc<EngineConfig>,
}

impl ExecutionContext {
    pub fn new(config: EngineConfig) -> Self {
        let config = Arc::new(config);
        Self {
            execution_id: Uuid::new_v4(),
            call_state: IncrementalCallState::with_config(&config.incremental),
            config,
        }
    }

    pub fn execution_id(&self) -> Uuid {
        self.execution_id
    }

    /// Scheduler of this request; resolvers enqueue nested deferred calls here
    pub fn call_state(&self) -> &IncrementalCallState {
        &self.call_state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl std::fmt::Debug for ExecutionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionContext")
            .field("execution_id", &self.execution_id)
            .field("request_id", &self.call_state.request_id())
            .finish()
    }
}
