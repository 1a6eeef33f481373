//! Incremental delivery
//!
//! Deferred calls, the scheduler that drains them into `hasNext` batches,
//! the wire payloads and the support that splits a selection set into
//! immediate and deferred fields.

pub mod call;
pub mod call_context;
pub mod call_state;
pub mod deferred_support;
pub mod execution_context;
pub mod payload;

pub use call::{
    DeferredFragmentCall, FieldFuture, FieldSupplier, FieldWithExecutionResult, IncrementalCall,
    StreamedCall,
};
pub use call_context::DeferredCallContext;
pub use call_state::{IncrementalCallState, IncrementalPublisher};
pub use deferred_support::{
    deferred_execution_support, DeferredExecutionSupport, DeferredExecutionSupportImpl,
    NoOpDeferredExecutionSupport,
};
pub use execution_context::{
    resolver_fn, CompleteValueType, ExecutionContext, FieldParams, FieldResolver, FieldResult,
    FieldValueInfo,
};
pub use payload::{DeferPayload, DelayedIncrementalPartialResult, IncrementalPayload, StreamPayload};
