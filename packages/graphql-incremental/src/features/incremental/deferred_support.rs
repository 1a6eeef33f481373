//! Deferred execution support
//!
//! Splits a merged selection set into the fields resolved now and the fields
//! resolved later, and builds one [`DeferredFragmentCall`] per defer label.
//! A field that several labels share is resolved once: the first call to
//! reach it starts the resolution, the others await the same shared future.

use std::sync::Arc;

use dashmap::DashMap;
use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use super::call::{DeferredFragmentCall, FieldSupplier, FieldWithExecutionResult, IncrementalCall};
use super::call_context::DeferredCallContext;
use super::execution_context::{ExecutionContext, FieldParams, FieldResolver, FieldResult};
use crate::config::IncrementalConfig;
use crate::errors::FieldFailure;
use crate::shared::models::{DeferredExecution, MergedField, MergedSelectionSet, ResultPath};

pub trait DeferredExecutionSupport: Send + Sync {
    fn is_deferred_field(&self, result_key: &str) -> bool;

    fn deferred_fields_count(&self) -> usize;

    /// Result keys resolved in the initial response, in selection order
    fn non_deferred_field_names(&self) -> Vec<String>;

    /// One call per distinct enabled defer label, in first-seen order
    fn create_calls(&self) -> Vec<Arc<dyn IncrementalCall>>;
}

/// Real or no-op support depending on `config.enabled`
pub fn deferred_execution_support(
    config: &IncrementalConfig,
    selection_set: &MergedSelectionSet,
    path: ResultPath,
    ctx: ExecutionContext,
    resolver: Arc<dyn FieldResolver>,
) -> Arc<dyn DeferredExecutionSupport> {
    if config.enabled {
        Arc::new(DeferredExecutionSupportImpl::new(selection_set, path, ctx, resolver))
    } else {
        Arc::new(NoOpDeferredExecutionSupport::new(selection_set))
    }
}

type SharedFieldFuture = Shared<BoxFuture<'static, FieldResult>>;

pub struct DeferredExecutionSupportImpl {
    path: ResultPath,
    ctx: ExecutionContext,
    resolver: Arc<dyn FieldResolver>,
    execution_to_fields: IndexMap<DeferredExecution, Vec<MergedField>>,
    deferred_fields: IndexSet<String>,
    non_deferred_fields: Vec<String>,
    memo: Arc<DashMap<String, SharedFieldFuture>>,
}

impl DeferredExecutionSupportImpl {
    pub fn new(
        selection_set: &MergedSelectionSet,
        path: ResultPath,
        ctx: ExecutionContext,
        resolver: Arc<dyn FieldResolver>,
    ) -> Self {
        let mut execution_to_fields: IndexMap<DeferredExecution, Vec<MergedField>> = IndexMap::new();
        let mut deferred_fields = IndexSet::new();
        let mut non_deferred_fields = Vec::new();

        for field in selection_set.fields() {
            let executions = field.enabled_deferred_executions();
            if executions.is_empty() {
                non_deferred_fields.push(field.result_key().to_string());
                continue;
            }
            for execution in executions {
                execution_to_fields
                    .entry(execution.clone())
                    .or_default()
                    .push(field.clone());
            }
            deferred_fields.insert(field.result_key().to_string());
        }

        debug!(
            path = %path,
            deferred = deferred_fields.len(),
            labels = execution_to_fields.len(),
            "Classified selection set"
        );

        Self {
            path,
            ctx,
            resolver,
            execution_to_fields,
            deferred_fields,
            non_deferred_fields,
            memo: Arc::new(DashMap::new()),
        }
    }

    fn create_call(&self, execution: &DeferredExecution, fields: &[MergedField]) -> DeferredFragmentCall {
        let call_context = Arc::new(DeferredCallContext::new());
        let suppliers = fields
            .iter()
            .map(|field| self.field_supplier(field, &call_context))
            .collect();
        DeferredFragmentCall::new(
            execution.label.clone(),
            self.path.clone(),
            suppliers,
            call_context,
        )
    }

    /// Memoized per result key; the first evaluating call's context is used
    fn field_supplier(&self, field: &MergedField, call_context: &Arc<DeferredCallContext>) -> FieldSupplier {
        let memo = Arc::clone(&self.memo);
        let resolver = Arc::clone(&self.resolver);
        let ctx = self.ctx.clone();
        let field = field.clone();
        let path = self.path.clone();
        let call_context = Arc::clone(call_context);

        Box::new(move || {
            let result_key = field.result_key().to_string();
            let shared = memo
                .entry(result_key.clone())
                .or_insert_with(|| {
                    let resolver = Arc::clone(&resolver);
                    let ctx = ctx.clone();
                    let params = FieldParams {
                        path: path.segment(result_key.clone()),
                        field: field.clone(),
                        deferred_call_context: Some(Arc::clone(&call_context)),
                    };
                    async move { resolver.resolve(&ctx, params).await }
                        .boxed()
                        .shared()
                })
                .clone();

            async move {
                let result = shared.await?;
                Ok::<_, FieldFailure>(FieldWithExecutionResult { result_key, result })
            }
            .boxed()
        })
    }
}

impl DeferredExecutionSupport for DeferredExecutionSupportImpl {
    fn is_deferred_field(&self, result_key: &str) -> bool {
        self.deferred_fields.contains(result_key)
    }

    fn deferred_fields_count(&self) -> usize {
        self.deferred_fields.len()
    }

    fn non_deferred_field_names(&self) -> Vec<String> {
        self.non_deferred_fields.clone()
    }

    fn create_calls(&self) -> Vec<Arc<dyn IncrementalCall>> {
        self.execution_to_fields
            .iter()
            .map(|(execution, fields)| {
                Arc::new(self.create_call(execution, fields)) as Arc<dyn IncrementalCall>
            })
            .collect()
    }
}

/// Support used when incremental delivery is disabled: nothing is deferred
#[derive(Debug, Clone, Default)]
pub struct NoOpDeferredExecutionSupport {
    field_names: Vec<String>,
}

impl NoOpDeferredExecutionSupport {
    pub fn new(selection_set: &MergedSelectionSet) -> Self {
        Self {
            field_names: selection_set.keys().map(str::to_string).collect(),
        }
    }
}

impl DeferredExecutionSupport for NoOpDeferredExecutionSupport {
    fn is_deferred_field(&self, _result_key: &str) -> bool {
        false
    }

    fn deferred_fields_count(&self) -> usize {
        0
    }

    fn non_deferred_field_names(&self) -> Vec<String> {
        self.field_names.clone()
    }

    fn create_calls(&self) -> Vec<Arc<dyn IncrementalCall>> {
        Vec::new()
    }
}
