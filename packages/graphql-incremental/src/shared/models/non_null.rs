//! Non-null violation signal

use thiserror::Error;

use super::graphql_error::{classification, GraphQLError};
use super::result_path::ResultPath;

/// A field resolved to null although its type forbids it
///
/// Carried by result nodes and returned by field resolution. When it bubbles
/// to an ancestor the original path and message are kept and the ancestor's
/// path is recorded in `bubbled_to`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct NonNullViolation {
    pub path: ResultPath,
    pub type_name: String,
    pub message: String,
    pub bubbled_to: Option<ResultPath>,
}

impl NonNullViolation {
    pub fn new(path: ResultPath, type_name: impl Into<String>) -> Self {
        let type_name = type_name.into();
        let message = format!(
            "Cannot return null for non-nullable type '{}' at path '{}'",
            type_name, path
        );
        Self {
            path,
            type_name,
            message,
            bubbled_to: None,
        }
    }

    /// The violation as captured by an ancestor at `path`
    pub fn wrap(&self, path: ResultPath) -> Self {
        Self {
            bubbled_to: Some(path),
            ..self.clone()
        }
    }

    /// Where the null ends up in the response
    pub fn null_path(&self) -> &ResultPath {
        self.bubbled_to.as_ref().unwrap_or(&self.path)
    }

    pub fn to_graphql_error(&self) -> GraphQLError {
        GraphQLError::new(self.message.clone())
            .with_path(self.path.clone())
            .with_classification(classification::NULL_VALUE_IN_NON_NULLABLE_FIELD)
    }
}
