//! Resolver and call fixtures

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use graphql_incremental::errors::{EngineError, FieldFailure, Result};
use graphql_incremental::features::incremental::{
    resolver_fn, DeferPayload, FieldParams, FieldResolver, FieldValueInfo, IncrementalCall,
    IncrementalPayload,
};
use graphql_incremental::shared::models::ResultPath;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use tokio::sync::oneshot;

/// Resolves every field from a fixed table; unknown keys resolve to `null`
pub fn table_resolver(table: Vec<(&str, Value)>, calls: Arc<AtomicUsize>) -> Arc<dyn FieldResolver> {
    let table: Arc<HashMap<String, Value>> =
        Arc::new(table.into_iter().map(|(k, v)| (k.to_string(), v)).collect());
    resolver_fn(move |_ctx, params: FieldParams| {
        let table = Arc::clone(&table);
        let calls = Arc::clone(&calls);
        async move {
            calls.fetch_add(1, Ordering::SeqCst);
            let value = table.get(params.result_key()).cloned().unwrap_or(Value::Null);
            Ok(FieldValueInfo::new(value))
        }
    })
}

/// Always fails with a resolver defect
pub fn broken_resolver(message: &'static str) -> Arc<dyn FieldResolver> {
    resolver_fn(move |_ctx, _params: FieldParams| async move {
        Err(FieldFailure::Defect(EngineError::deferred_call(message)))
    })
}

/// Completes with `{ "<key>": "<key>" }` at `/<key>` once released
pub struct GatedCall {
    path: ResultPath,
    key: String,
    gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl GatedCall {
    pub fn new(key: &str) -> (Arc<Self>, oneshot::Sender<()>) {
        let (sender, receiver) = oneshot::channel();
        let call = Arc::new(Self {
            path: ResultPath::root().segment(key),
            key: key.to_string(),
            gate: Mutex::new(Some(receiver)),
        });
        (call, sender)
    }
}

#[async_trait]
impl IncrementalCall for GatedCall {
    async fn invoke(&self) -> Result<IncrementalPayload> {
        let gate = self.gate.lock().take();
        if let Some(gate) = gate {
            gate.await
                .map_err(|_| EngineError::deferred_call("gate dropped"))?;
        }
        let mut data = Map::new();
        data.insert(self.key.clone(), Value::String(self.key.clone()));
        Ok(DeferPayload::new(self.path.clone(), Some(self.key.clone()), Value::Object(data)).into())
    }

    fn label(&self) -> Option<&str> {
        Some(&self.key)
    }

    fn path(&self) -> &ResultPath {
        &self.path
    }
}

/// Completes immediately, or fails when `fail` is set
pub struct ImmediateCall {
    path: ResultPath,
    fail: bool,
}

impl ImmediateCall {
    pub fn ok(key: &str) -> Arc<dyn IncrementalCall> {
        Arc::new(Self {
            path: ResultPath::root().segment(key),
            fail: false,
        })
    }

    pub fn failing(key: &str) -> Arc<dyn IncrementalCall> {
        Arc::new(Self {
            path: ResultPath::root().segment(key),
            fail: true,
        })
    }
}

#[async_trait]
impl IncrementalCall for ImmediateCall {
    async fn invoke(&self) -> Result<IncrementalPayload> {
        if self.fail {
            return Err(EngineError::deferred_call(format!("{} failed", self.path)));
        }
        Ok(DeferPayload::new(self.path.clone(), None, json!({})).into())
    }

    fn label(&self) -> Option<&str> {
        None
    }

    fn path(&self) -> &ResultPath {
        &self.path
    }
}
