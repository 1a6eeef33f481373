/*
 * GraphQL Incremental - @defer/@stream delivery core
 *
 * Feature-First Architecture:
 * - shared/      : Common models (ResultPath, GraphQLError, selection sets)
 * - features/    : Vertical slices (result_tree → reactive → incremental)
 * - config/      : YAML configuration with validation
 *
 * Field resolution is supplied by the caller; this crate orchestrates the
 * deferred work and publishes `hasNext` batches.
 */

#![allow(clippy::type_complexity)] // Publisher / future aliases
#![allow(clippy::new_without_default)] // Default impl not always needed

// ═══════════════════════════════════════════════════════════════════════════
// Module Exports - Feature-First Architecture
// ═══════════════════════════════════════════════════════════════════════════

/// Shared models
pub mod shared;

/// Feature modules
pub mod features;

/// Configuration system
pub mod config;

/// Error types
pub mod errors;

/// Tracing subscriber setup
pub mod observability;

// ═══════════════════════════════════════════════════════════════════════════
// Re-exports for Public API
// ═══════════════════════════════════════════════════════════════════════════

pub use config::{EngineConfig, IncrementalConfig, LoggingConfig};
pub use errors::{EngineError, FieldFailure, Result};
pub use features::incremental::{
    deferred_execution_support, DeferredExecutionSupport, DelayedIncrementalPartialResult,
    ExecutionContext, FieldResolver, IncrementalCall, IncrementalCallState, IncrementalPayload,
};
pub use features::reactive::{MappingPublisher, Publisher, PublisherOrdering, PublisherStream};
pub use features::result_tree::{ExecutionResultNode, NodeMultiZipper, NodeZipper};
pub use observability::init_tracing;
pub use shared::models::{ExecutionResult, GraphQLError, MergedSelectionSet, ResultPath};
