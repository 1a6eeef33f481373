//! Incremental calls: one schedulable unit of deferred or streamed work

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{try_join_all, BoxFuture};
use serde_json::{Map, Value};
use tracing::debug;

use super::call_context::DeferredCallContext;
use super::execution_context::FieldValueInfo;
use super::payload::{DeferPayload, IncrementalPayload};
use crate::errors::{EngineError, FieldFailure, Result};
use crate::shared::models::ResultPath;

/// Produces exactly one payload when invoked
#[async_trait]
pub trait IncrementalCall: Send + Sync {
    /// A failed future is a structural failure and ends the whole stream
    async fn invoke(&self) -> Result<IncrementalPayload>;

    fn label(&self) -> Option<&str>;

    fn path(&self) -> &ResultPath;
}

/// Resolved value of one field, keyed by its result key
#[derive(Debug, Clone, PartialEq)]
pub struct FieldWithExecutionResult {
    pub result_key: String,
    pub result: FieldValueInfo,
}

pub type FieldFuture = BoxFuture<'static, std::result::Result<FieldWithExecutionResult, FieldFailure>>;

/// Lazily starts the resolution of one field
pub type FieldSupplier = Box<dyn Fn() -> FieldFuture + Send + Sync>;

/// All fields of one `@defer` label under one parent
pub struct DeferredFragmentCall {
    label: Option<String>,
    path: ResultPath,
    suppliers: Vec<FieldSupplier>,
    context: Arc<DeferredCallContext>,
}

impl DeferredFragmentCall {
    pub fn new(
        label: Option<String>,
        path: ResultPath,
        suppliers: Vec<FieldSupplier>,
        context: Arc<DeferredCallContext>,
    ) -> Self {
        Self {
            label,
            path,
            suppliers,
            context,
        }
    }

    pub fn field_count(&self) -> usize {
        self.suppliers.len()
    }

    pub fn context(&self) -> &Arc<DeferredCallContext> {
        &self.context
    }

    fn payload_from(&self, fields: Vec<FieldWithExecutionResult>) -> DeferPayload {
        let mut data = Map::with_capacity(fields.len());
        let mut errors = Vec::new();
        for field in fields {
            errors.extend(field.result.errors);
            data.insert(field.result_key, field.result.value);
        }
        errors.extend(self.context.errors());

        DeferPayload::new(self.path.clone(), self.label.clone(), Value::Object(data))
            .with_errors(errors)
    }
}

#[async_trait]
impl IncrementalCall for DeferredFragmentCall {
    async fn invoke(&self) -> Result<IncrementalPayload> {
        let futures: Vec<FieldFuture> = self.suppliers.iter().map(|supplier| supplier()).collect();

        match try_join_all(futures).await {
            Ok(fields) => Ok(self.payload_from(fields).into()),
            Err(FieldFailure::NonNull(violation)) => {
                debug!(
                    label = ?self.label,
                    path = %violation.path,
                    "Non-null violation, discarding deferred fragment data"
                );
                let error = violation.wrap(self.path.clone()).to_graphql_error();
                Ok(DeferPayload::error_only(self.path.clone(), self.label.clone(), vec![error]).into())
            }
            Err(FieldFailure::Defect(error)) => Err(error),
        }
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn path(&self) -> &ResultPath {
        &self.path
    }
}

/// `@stream` placeholder; invoking it fails
pub struct StreamedCall {
    label: Option<String>,
    path: ResultPath,
}

impl StreamedCall {
    pub fn new(label: Option<String>, path: ResultPath) -> Self {
        Self { label, path }
    }
}

#[async_trait]
impl IncrementalCall for StreamedCall {
    async fn invoke(&self) -> Result<IncrementalPayload> {
        Err(EngineError::Unsupported(format!(
            "@stream at '{}' is not executable",
            self.path
        )))
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn path(&self) -> &ResultPath {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::models::{GraphQLError, NonNullViolation};
    use futures::FutureExt;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn supplier(key: &'static str, outcome: std::result::Result<Value, FieldFailure>) -> FieldSupplier {
        Box::new(move || {
            let outcome = outcome.clone();
            async move {
                outcome.map(|value| FieldWithExecutionResult {
                    result_key: key.to_string(),
                    result: FieldValueInfo::new(value),
                })
            }
            .boxed()
        })
    }

    fn call(suppliers: Vec<FieldSupplier>) -> DeferredFragmentCall {
        DeferredFragmentCall::new(
            Some("slow".to_string()),
            ResultPath::root().segment("hero"),
            suppliers,
            Arc::new(DeferredCallContext::new()),
        )
    }

    #[tokio::test]
    async fn test_merges_fields_in_order() {
        let call = call(vec![supplier("b", Ok(json!(2))), supplier("a", Ok(json!(1)))]);
        call.context().add_error(GraphQLError::new("recorded"));

        let payload = match call.invoke().await.unwrap() {
            IncrementalPayload::Defer(p) => p,
            other => panic!("unexpected payload {other:?}"),
        };
        assert_eq!(payload.label.as_deref(), Some("slow"));
        assert_eq!(payload.path, ResultPath::root().segment("hero"));
        assert_eq!(payload.data, json!({"b": 2, "a": 1}));
        assert_eq!(payload.errors, vec![GraphQLError::new("recorded")]);
    }

    #[tokio::test]
    async fn test_non_null_violation_discards_siblings() {
        let violation = NonNullViolation::new(ResultPath::parse("/hero/id").unwrap(), "ID!");
        let call = call(vec![
            supplier("name", Ok(json!("R2"))),
            supplier("id", Err(FieldFailure::NonNull(violation.clone()))),
        ]);

        let payload = call.invoke().await.unwrap();
        let spec = payload.to_specification();
        assert_eq!(spec["data"], Value::Null);
        assert_eq!(payload.errors().len(), 1);
        assert_eq!(payload.errors()[0].message, violation.message);
    }

    #[tokio::test]
    async fn test_defect_fails_the_call() {
        let call = call(vec![supplier(
            "name",
            Err(FieldFailure::Defect(EngineError::deferred_call("db down"))),
        )]);
        assert_eq!(
            call.invoke().await.unwrap_err(),
            EngineError::deferred_call("db down")
        );
    }

    #[tokio::test]
    async fn test_streamed_call_is_unsupported() {
        let call = StreamedCall::new(None, ResultPath::root().segment("items"));
        assert!(matches!(call.invoke().await, Err(EngineError::Unsupported(_))));
        assert_eq!(call.label(), None);
    }
}
