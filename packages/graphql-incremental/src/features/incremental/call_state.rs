//! Incremental call state (the scheduler)
//!
//! Drains a FIFO queue of incremental calls and publishes one batch per
//! completed call. Decrementing the pending count, computing `hasNext` and
//! offering the batch happen under one lock, so exactly the last batch
//! carries `hasNext: false`. A call may enqueue nested calls while it
//! resolves; they are picked up when it completes.

use std::collections::VecDeque;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use once_cell::sync::OnceCell;
use tokio::runtime::Handle;
use tracing::{debug, error, info, trace};
use uuid::Uuid;

use super::call::IncrementalCall;
use super::payload::{DelayedIncrementalPartialResult, IncrementalPayload};
use crate::config::IncrementalConfig;
use crate::errors::{EngineError, Result};
use crate::features::reactive::SingleSubscriberPublisher;
use crate::shared::sync::Mutex;

pub type IncrementalPublisher = SingleSubscriberPublisher<DelayedIncrementalPartialResult>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StreamState {
    Open,
    Completed,
    Failed,
}

struct CallStateInner {
    queue: VecDeque<Arc<dyn IncrementalCall>>,
    pending_calls: usize,
    calls_detected: bool,
    stream: StreamState,
}

struct CallStateShared {
    request_id: Uuid,
    max_pending_calls: usize,
    inner: Mutex<CallStateInner>,
    publisher: IncrementalPublisher,
    runtime: OnceCell<Handle>,
}

/// Scheduler for one top-level request; clones share state
#[derive(Clone)]
pub struct IncrementalCallState {
    shared: Arc<CallStateShared>,
}

impl Default for IncrementalCallState {
    fn default() -> Self {
        Self::with_config(&IncrementalConfig::default())
    }
}

impl IncrementalCallState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: &IncrementalConfig) -> Self {
        Self {
            shared: Arc::new(CallStateShared {
                request_id: Uuid::new_v4(),
                max_pending_calls: config.max_pending_calls,
                inner: Mutex::new(CallStateInner {
                    queue: VecDeque::new(),
                    pending_calls: 0,
                    calls_detected: false,
                    stream: StreamState::Open,
                }),
                publisher: SingleSubscriberPublisher::new(),
                runtime: OnceCell::new(),
            }),
        }
    }

    pub fn request_id(&self) -> Uuid {
        self.shared.request_id
    }

    /// Queue a call; it counts as pending until its batch is published
    pub fn enqueue(&self, call: Arc<dyn IncrementalCall>) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        if inner.stream != StreamState::Open {
            debug!(request_id = %self.shared.request_id, "Stream is terminal, ignoring enqueue");
            return Ok(());
        }
        if inner.pending_calls >= self.shared.max_pending_calls {
            return Err(EngineError::TooManyPendingCalls {
                limit: self.shared.max_pending_calls,
            });
        }
        trace!(
            request_id = %self.shared.request_id,
            label = ?call.label(),
            path = %call.path(),
            "Enqueued incremental call"
        );
        inner.queue.push_back(call);
        inner.pending_calls += 1;
        inner.calls_detected = true;
        Ok(())
    }

    pub fn enqueue_all(&self, calls: impl IntoIterator<Item = Arc<dyn IncrementalCall>>) -> Result<()> {
        for call in calls {
            self.enqueue(call)?;
        }
        Ok(())
    }

    /// Whether anything was ever enqueued
    pub fn incremental_calls_detected(&self) -> bool {
        self.shared.inner.lock().calls_detected
    }

    pub fn pending_calls(&self) -> usize {
        self.shared.inner.lock().pending_calls
    }

    /// Start draining and return the stream of batches
    ///
    /// Calls are invoked on the ambient tokio runtime. With nothing pending
    /// the stream completes without emitting a batch.
    pub fn start_deferred_calls(&self) -> Result<IncrementalPublisher> {
        let handle = Handle::try_current().map_err(|e| EngineError::NoRuntime(e.to_string()))?;
        let _ = self.shared.runtime.set(handle);

        let nothing_pending = {
            let mut inner = self.shared.inner.lock();
            if inner.pending_calls == 0 && inner.stream == StreamState::Open {
                inner.stream = StreamState::Completed;
                self.shared.publisher.complete();
                true
            } else {
                false
            }
        };

        if nothing_pending {
            debug!(request_id = %self.shared.request_id, "No incremental calls, completing");
        } else {
            info!(
                request_id = %self.shared.request_id,
                pending = self.pending_calls(),
                "Starting incremental delivery"
            );
            self.drain();
        }
        Ok(self.shared.publisher.clone())
    }

    fn drain(&self) {
        loop {
            let call = {
                let mut inner = self.shared.inner.lock();
                if inner.stream != StreamState::Open {
                    return;
                }
                match inner.queue.pop_front() {
                    Some(call) => call,
                    None => return,
                }
            };
            if self.shared.publisher.is_cancelled() {
                debug!(request_id = %self.shared.request_id, "Subscriber cancelled, not invoking call");
                return;
            }
            self.spawn_call(call);
        }
    }

    fn spawn_call(&self, call: Arc<dyn IncrementalCall>) {
        let state = self.clone();
        let task = async move {
            // a panicking call is a structural failure like any other error
            let outcome = AssertUnwindSafe(async { call.invoke().await })
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err(EngineError::deferred_call("deferred call panicked")));
            state.call_completed(call.as_ref(), outcome);
        };
        match self.shared.runtime.get() {
            Some(handle) => {
                handle.spawn(task);
            }
            None => {
                error!(request_id = %self.shared.request_id, "Draining without a runtime");
            }
        }
    }

    fn call_completed(&self, call: &dyn IncrementalCall, outcome: Result<IncrementalPayload>) {
        let resume = {
            let mut inner = self.shared.inner.lock();
            if inner.stream != StreamState::Open {
                debug!(
                    request_id = %self.shared.request_id,
                    label = ?call.label(),
                    "Stream already terminal, dropping late result"
                );
                return;
            }

            match outcome {
                Err(err) => {
                    error!(
                        request_id = %self.shared.request_id,
                        label = ?call.label(),
                        error = %err,
                        "Deferred call failed, aborting stream"
                    );
                    inner.stream = StreamState::Failed;
                    inner.queue.clear();
                    self.shared.publisher.error(err);
                    false
                }
                Ok(payload) => {
                    inner.pending_calls -= 1;
                    let has_next = inner.pending_calls != 0;
                    trace!(
                        request_id = %self.shared.request_id,
                        label = ?payload.label(),
                        has_next,
                        "Publishing incremental batch"
                    );
                    self.shared
                        .publisher
                        .offer(DelayedIncrementalPartialResult::new(vec![payload], has_next));
                    if !has_next {
                        inner.stream = StreamState::Completed;
                        self.shared.publisher.complete();
                        info!(request_id = %self.shared.request_id, "Incremental delivery complete");
                    }
                    has_next
                }
            }
        };

        if resume {
            self.drain();
        }
    }
}

impl std::fmt::Debug for IncrementalCallState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("IncrementalCallState")
            .field("request_id", &self.shared.request_id)
            .field("queued", &inner.queue.len())
            .field("pending_calls", &inner.pending_calls)
            .field("stream", &inner.stream)
            .finish()
    }
}
