//! Deferred call context

use crate::shared::models::GraphQLError;
use crate::shared::sync::Mutex;

/// Errors recorded by the fields of one deferred call
///
/// Written by concurrently resolving fields, read once when the call builds
/// its payload. Append-only.
#[derive(Debug, Default)]
pub struct DeferredCallContext {
    errors: Mutex<Vec<GraphQLError>>,
}

impl DeferredCallContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&self, error: GraphQLError) {
        self.errors.lock().push(error);
    }

    pub fn add_errors(&self, errors: impl IntoIterator<Item = GraphQLError>) {
        self.errors.lock().extend(errors);
    }

    /// Snapshot of the recorded errors, in recording order
    pub fn errors(&self) -> Vec<GraphQLError> {
        self.errors.lock().clone()
    }

    pub fn error_count(&self) -> usize {
        self.errors.lock().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_concurrent_appends() {
        let ctx = Arc::new(DeferredCallContext::new());
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ctx = Arc::clone(&ctx);
                thread::spawn(move || {
                    for i in 0..25 {
                        ctx.add_error(GraphQLError::new(format!("{t}-{i}")));
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(ctx.error_count(), 200);
    }

    #[test]
    fn test_add_errors_keeps_order() {
        let ctx = DeferredCallContext::new();
        ctx.add_error(GraphQLError::new("a"));
        ctx.add_errors(vec![GraphQLError::new("b"), GraphQLError::new("c")]);
        let messages: Vec<_> = ctx.errors().into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["a", "b", "c"]);
    }
}
