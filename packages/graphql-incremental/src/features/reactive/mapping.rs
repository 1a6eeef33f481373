//! Mapping publisher bridge
//!
//! Subscribes to an upstream publisher, runs an async mapping step per item
//! and forwards the mapped values downstream. The ordered variant forwards in
//! upstream arrival order whatever order the mappings complete in; the
//! unordered variant forwards each value as soon as its mapping is done.
//!
//! All in-flight bookkeeping and every downstream call happen under one lock,
//! so two completing mappings can never drain concurrently. An upstream
//! terminal signal that arrives while mappings are in flight is parked and
//! runs once the in-flight queue is empty.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::runtime::Handle;
use tracing::{debug, warn};

use super::subscription::{Publisher, Subscriber, Subscription};
use crate::config::IncrementalConfig;
use crate::errors::{EngineError, Result};

/// Async per-item mapping step
pub type MapFn<U, D> = Arc<dyn Fn(U) -> BoxFuture<'static, Result<D>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublisherOrdering {
    #[default]
    Ordered,
    Unordered,
}

pub struct MappingPublisher<U, D> {
    upstream: Arc<dyn Publisher<U>>,
    mapper: MapFn<U, D>,
    ordering: PublisherOrdering,
}

impl<U, D> MappingPublisher<U, D>
where
    U: Send + 'static,
    D: Send + 'static,
{
    pub fn new(upstream: Arc<dyn Publisher<U>>, mapper: MapFn<U, D>, ordering: PublisherOrdering) -> Self {
        Self {
            upstream,
            mapper,
            ordering,
        }
    }

    pub fn ordered<F>(upstream: Arc<dyn Publisher<U>>, mapper: F) -> Self
    where
        F: Fn(U) -> BoxFuture<'static, Result<D>> + Send + Sync + 'static,
    {
        Self::new(upstream, Arc::new(mapper), PublisherOrdering::Ordered)
    }

    pub fn unordered<F>(upstream: Arc<dyn Publisher<U>>, mapper: F) -> Self
    where
        F: Fn(U) -> BoxFuture<'static, Result<D>> + Send + Sync + 'static,
    {
        Self::new(upstream, Arc::new(mapper), PublisherOrdering::Unordered)
    }

    /// Variant picked by `publisher_ordering`
    pub fn from_config(upstream: Arc<dyn Publisher<U>>, mapper: MapFn<U, D>, config: &IncrementalConfig) -> Self {
        Self::new(upstream, mapper, config.publisher_ordering)
    }

    pub fn ordering(&self) -> PublisherOrdering {
        self.ordering
    }
}

impl<U, D> Publisher<D> for MappingPublisher<U, D>
where
    U: Send + 'static,
    D: Send + 'static,
{
    fn subscribe(&self, downstream: Arc<dyn Subscriber<D>>) {
        let bridge = BridgeSubscriber {
            core: Arc::new(BridgeCore {
                downstream,
                mapper: Arc::clone(&self.mapper),
                ordering: self.ordering,
                state: Mutex::new(BridgeState {
                    in_flight: VecDeque::new(),
                    next_id: 0,
                    parked_terminal: None,
                    terminated: false,
                }),
                upstream: OnceCell::new(),
                cancelled: Arc::new(AtomicBool::new(false)),
            }),
        };
        self.upstream.subscribe(Arc::new(bridge));
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Bridge internals
// ═══════════════════════════════════════════════════════════════════════════

enum Terminal {
    Complete,
    Error(EngineError),
}

struct InFlight<D> {
    id: u64,
    /// Mapped value waiting for its turn (ordered variant only)
    value: Option<D>,
}

struct BridgeState<D> {
    in_flight: VecDeque<InFlight<D>>,
    next_id: u64,
    parked_terminal: Option<Terminal>,
    terminated: bool,
}

struct BridgeCore<U, D> {
    downstream: Arc<dyn Subscriber<D>>,
    mapper: MapFn<U, D>,
    ordering: PublisherOrdering,
    state: Mutex<BridgeState<D>>,
    upstream: OnceCell<Subscription>,
    /// Downstream cancelled; kept outside the lock so cancelling from inside
    /// a downstream callback cannot deadlock
    cancelled: Arc<AtomicBool>,
}

struct BridgeSubscriber<U, D> {
    core: Arc<BridgeCore<U, D>>,
}

impl<U, D> Subscriber<U> for BridgeSubscriber<U, D>
where
    U: Send + 'static,
    D: Send + 'static,
{
    fn on_subscribe(&self, subscription: Subscription) {
        if self.core.upstream.set(subscription.clone()).is_err() {
            warn!("Bridge subscribed twice, cancelling the second upstream");
            subscription.cancel();
            return;
        }
        let cancelled = Arc::clone(&self.core.cancelled);
        let upstream = subscription;
        self.core
            .downstream
            .on_subscribe(Subscription::with_cancel_hook(move || {
                cancelled.store(true, Ordering::SeqCst);
                upstream.cancel();
            }));
    }

    fn on_next(&self, item: U) {
        let id = {
            let mut state = self.core.state.lock();
            if state.terminated || self.core.is_cancelled() {
                return;
            }
            let id = state.next_id;
            state.next_id += 1;
            state.in_flight.push_back(InFlight { id, value: None });
            id
        };

        let mapping = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| (self.core.mapper)(item)));
        let future = match mapping {
            Ok(future) => future,
            Err(_) => {
                self.core
                    .mapping_completed(id, Err(EngineError::mapping("mapping function panicked")));
                return;
            }
        };

        match Handle::try_current() {
            Ok(handle) => {
                let core = Arc::clone(&self.core);
                handle.spawn(async move {
                    let outcome = std::panic::AssertUnwindSafe(future)
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|_| Err(EngineError::mapping("mapping future panicked")));
                    core.mapping_completed(id, outcome);
                });
            }
            Err(e) => self
                .core
                .mapping_completed(id, Err(EngineError::NoRuntime(e.to_string()))),
        }
    }

    fn on_error(&self, error: EngineError) {
        self.core.upstream_terminal(Terminal::Error(error));
    }

    fn on_complete(&self) {
        self.core.upstream_terminal(Terminal::Complete);
    }
}

impl<U, D> BridgeCore<U, D>
where
    U: Send + 'static,
    D: Send + 'static,
{
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn cancel_upstream(&self) {
        if let Some(upstream) = self.upstream.get() {
            upstream.cancel();
        }
    }

    fn mapping_completed(&self, id: u64, outcome: Result<D>) {
        let mut state = self.state.lock();
        if state.terminated {
            debug!(id, "Mapping finished after termination, dropping");
            return;
        }

        let value = match outcome {
            Ok(value) => value,
            Err(error) => {
                warn!(id, error = %error, "Mapping failed, terminating stream");
                state.terminated = true;
                state.in_flight.clear();
                state.parked_terminal = None;
                self.cancel_upstream();
                if !self.is_cancelled() {
                    self.downstream.on_error(error);
                }
                return;
            }
        };

        match self.ordering {
            PublisherOrdering::Ordered => {
                if let Some(slot) = state.in_flight.iter_mut().find(|f| f.id == id) {
                    slot.value = Some(value);
                }
                while state.in_flight.front().is_some_and(|f| f.value.is_some()) {
                    let ready = state.in_flight.pop_front().and_then(|f| f.value);
                    if let Some(ready) = ready {
                        if !self.is_cancelled() {
                            self.downstream.on_next(ready);
                        }
                    }
                }
            }
            PublisherOrdering::Unordered => {
                state.in_flight.retain(|f| f.id != id);
                if !self.is_cancelled() {
                    self.downstream.on_next(value);
                }
            }
        }

        if state.in_flight.is_empty() {
            if let Some(terminal) = state.parked_terminal.take() {
                state.terminated = true;
                self.fire_terminal(terminal);
            }
        }
    }

    fn upstream_terminal(&self, terminal: Terminal) {
        let mut state = self.state.lock();
        if state.terminated {
            return;
        }
        if let Terminal::Error(error) = &terminal {
            debug!(error = %error, "Upstream failed");
            self.cancel_upstream();
        }
        if state.in_flight.is_empty() {
            state.terminated = true;
            self.fire_terminal(terminal);
        } else {
            debug!(in_flight = state.in_flight.len(), "Parking upstream terminal signal");
            state.parked_terminal = Some(terminal);
        }
    }

    /// Caller holds the state lock and has set `terminated`
    fn fire_terminal(&self, terminal: Terminal) {
        if self.is_cancelled() {
            return;
        }
        match terminal {
            Terminal::Complete => self.downstream.on_complete(),
            Terminal::Error(error) => self.downstream.on_error(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reactive::adapters::{PublisherStream, StreamPublisher};
    use futures::StreamExt;
    use tokio::sync::oneshot;

    fn source(items: Vec<u32>) -> Arc<dyn Publisher<u32>> {
        Arc::new(StreamPublisher::new(futures::stream::iter(items.into_iter().map(Ok))))
    }

    #[tokio::test]
    async fn test_ordered_maps_all_items() {
        let publisher = MappingPublisher::ordered(source(vec![1, 2, 3]), |x| {
            async move { Ok(x * 10) }.boxed()
        });
        let items: Vec<_> = PublisherStream::new(&publisher).collect().await;
        assert_eq!(items, vec![Ok(10), Ok(20), Ok(30)]);
    }

    #[tokio::test]
    async fn test_mapping_failure_terminates() {
        let publisher = MappingPublisher::ordered(source(vec![1, 2, 3]), |x| {
            async move {
                if x == 2 {
                    Err(EngineError::mapping("bad item"))
                } else {
                    Ok(x)
                }
            }
            .boxed()
        });
        let items: Vec<_> = PublisherStream::new(&publisher).collect().await;
        assert_eq!(items.last(), Some(&Err(EngineError::mapping("bad item"))));
        assert!(items.iter().filter(|i| i.is_err()).count() == 1);
    }

    #[tokio::test]
    async fn test_upstream_error_waits_for_in_flight() {
        let upstream = crate::features::reactive::SingleSubscriberPublisher::new();
        let (release_tx, release_rx) = oneshot::channel::<()>();
        let release = Arc::new(Mutex::new(Some(release_rx)));

        let publisher = MappingPublisher::ordered(Arc::new(upstream.clone()), move |x: u32| {
            let release = release.lock().take();
            async move {
                if let Some(rx) = release {
                    let _ = rx.await;
                }
                Ok(x + 1)
            }
            .boxed()
        });
        let stream = PublisherStream::new(&publisher);

        upstream.offer(1);
        upstream.error(EngineError::upstream("source died"));
        tokio::task::yield_now().await;
        let _ = release_tx.send(());

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items, vec![Ok(2), Err(EngineError::upstream("source died"))]);
    }

    #[test]
    fn test_ordering_serde() {
        assert_eq!(
            serde_json::to_string(&PublisherOrdering::Unordered).unwrap(),
            "\"unordered\""
        );
        assert_eq!(PublisherOrdering::default(), PublisherOrdering::Ordered);
    }
}
