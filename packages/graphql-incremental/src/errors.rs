//! Error types for graphql-incremental
//!
//! `EngineError` is what escapes the engine: structural failures of a deferred
//! call, upstream/mapping failures of the publisher bridge, and misuse of the
//! tree/zipper API. GraphQL field errors and non-null violations never show up
//! here; they are folded into payloads (see [`FieldFailure`]).

use thiserror::Error;

use crate::config::ConfigError;
use crate::shared::models::NonNullViolation;

/// Main error type for incremental delivery operations
///
/// Cloneable because one failure can be observed by several parties (a
/// memoized field future shared across defer labels, or a terminal signal
/// handed to a subscriber).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// A deferred call failed for a reason other than a GraphQL field error
    #[error("Deferred call failed: {0}")]
    DeferredCall(String),

    /// `@stream` is modelled but not executable
    #[error("Unsupported incremental feature: {0}")]
    Unsupported(String),

    /// The upstream source of a publisher bridge signalled an error
    #[error("Upstream source failed: {0}")]
    Upstream(String),

    /// A per-item mapping step of the publisher bridge failed
    #[error("Mapping failed: {0}")]
    Mapping(String),

    /// A tree position does not exist in the node it was applied to
    #[error("Invalid position '{position}' for {node} node")]
    InvalidPosition { position: String, node: &'static str },

    /// Zipper navigation past the root or into a missing child
    #[error("Zipper error: {0}")]
    Zipper(String),

    /// Malformed result path literal
    #[error("Invalid result path '{input}': {reason}")]
    InvalidPath { input: String, reason: String },

    /// A specification map could not be turned back into a value
    #[error("Malformed {kind}: {reason}")]
    MalformedPayload { kind: &'static str, reason: String },

    /// A single-subscriber publisher was subscribed twice
    #[error("Publisher allows only one subscriber")]
    AlreadySubscribed,

    /// No tokio runtime is available to drive async work
    #[error("No async runtime available: {0}")]
    NoRuntime(String),

    /// The serial executor's worker is gone
    #[error("Executor closed")]
    ExecutorClosed,

    /// Enqueueing would exceed the configured pending-call limit
    #[error("Too many pending incremental calls (limit {limit})")]
    TooManyPendingCalls { limit: usize },

    /// The consumer went away before a value was produced
    #[error("Cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl EngineError {
    /// Create a deferred-call defect
    pub fn deferred_call(msg: impl Into<String>) -> Self {
        EngineError::DeferredCall(msg.into())
    }

    /// Create an upstream failure
    pub fn upstream(msg: impl Into<String>) -> Self {
        EngineError::Upstream(msg.into())
    }

    /// Create a mapping failure
    pub fn mapping(msg: impl Into<String>) -> Self {
        EngineError::Mapping(msg.into())
    }

    /// Create a zipper error
    pub fn zipper(msg: impl Into<String>) -> Self {
        EngineError::Zipper(msg.into())
    }

    pub fn malformed(kind: &'static str, reason: impl Into<String>) -> Self {
        EngineError::MalformedPayload {
            kind,
            reason: reason.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        EngineError::Config(msg.into())
    }

    /// Whether this error ends an incremental stream (as opposed to a
    /// caller-side usage error that can be retried with other input)
    pub fn is_terminal_signal(&self) -> bool {
        matches!(
            self,
            EngineError::DeferredCall(_)
                | EngineError::Unsupported(_)
                | EngineError::Upstream(_)
                | EngineError::Mapping(_)
                | EngineError::NoRuntime(_)
                | EngineError::ExecutorClosed
                | EngineError::TooManyPendingCalls { .. }
        )
    }
}

impl From<ConfigError> for EngineError {
    fn from(err: ConfigError) -> Self {
        EngineError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(err: serde_json::Error) -> Self {
        EngineError::malformed("json", err.to_string())
    }
}

/// Failure of one field resolution
///
/// Lets a deferred call tell a non-null violation (folded into an error-only
/// payload) apart from a defect (which fails the whole stream).
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FieldFailure {
    #[error(transparent)]
    NonNull(#[from] NonNullViolation),

    #[error(transparent)]
    Defect(#[from] EngineError),
}

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;
