//! Shared data models consumed across features

pub mod execution_result;
pub mod graphql_error;
pub mod non_null;
pub mod result_path;
pub mod selection_set;

pub use execution_result::ExecutionResult;
pub use graphql_error::{classification, GraphQLError, SourceLocation};
pub use non_null::NonNullViolation;
pub use result_path::{PathSegment, ResultPath};
pub use selection_set::{DeferredExecution, MergedField, MergedSelectionSet};
