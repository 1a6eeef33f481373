//! Mapping bridge tests
//!
//! Ordered vs unordered delivery when asynchronous mappings finish out of
//! order, terminal signal parking, and cancellation in both directions.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::{FutureExt, StreamExt};
use graphql_incremental::errors::EngineError;
use graphql_incremental::features::reactive::{
    MapFn, MappingPublisher, Publisher, PublisherOrdering, PublisherStream,
    SingleSubscriberPublisher,
};
use graphql_incremental::IncrementalConfig;
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use tokio::sync::oneshot;

type Gates = Arc<Mutex<HashMap<u32, oneshot::Receiver<()>>>>;

/// Mapper that multiplies by ten once the item's gate is released
fn gated_mapper(gates: Gates) -> impl Fn(u32) -> BoxFuture<'static, graphql_incremental::Result<u32>> + Send + Sync + 'static {
    move |item| {
        let gate = gates.lock().remove(&item);
        async move {
            match gate {
                Some(gate) => gate
                    .await
                    .map_err(|_| EngineError::mapping("gate dropped"))?,
                None => return Err(EngineError::mapping(format!("no gate for {item}"))),
            }
            Ok(item * 10)
        }
        .boxed()
    }
}

fn gates_for(items: &[u32]) -> (Gates, HashMap<u32, oneshot::Sender<()>>) {
    let mut receivers = HashMap::new();
    let mut senders = HashMap::new();
    for &item in items {
        let (tx, rx) = oneshot::channel();
        receivers.insert(item, rx);
        senders.insert(item, tx);
    }
    (Arc::new(Mutex::new(receivers)), senders)
}

fn upstream_of(items: &[u32], complete: bool) -> SingleSubscriberPublisher<u32> {
    let upstream = SingleSubscriberPublisher::new();
    for &item in items {
        upstream.offer(item);
    }
    if complete {
        upstream.complete();
    }
    upstream
}

fn shared(upstream: SingleSubscriberPublisher<u32>) -> Arc<dyn Publisher<u32>> {
    Arc::new(upstream)
}

async fn nothing_within(stream: &mut PublisherStream<u32>, wait: Duration) -> bool {
    tokio::time::timeout(wait, stream.next()).await.is_err()
}

// ============================================================================
// Ordering
// ============================================================================

#[tokio::test]
async fn ordered_bridge_holds_back_later_results() {
    let (gates, mut release) = gates_for(&[1, 2, 3]);
    let upstream = upstream_of(&[1, 2, 3], true);
    let bridge = MappingPublisher::ordered(shared(upstream), gated_mapper(gates));
    let mut stream = PublisherStream::new(&bridge);

    // e2 finishes first but must wait for e1
    release.remove(&2).unwrap().send(()).unwrap();
    assert!(nothing_within(&mut stream, Duration::from_millis(50)).await);

    release.remove(&1).unwrap().send(()).unwrap();
    assert_eq!(stream.next().await, Some(Ok(10)));
    assert_eq!(stream.next().await, Some(Ok(20)));

    // completion is parked until e3 is delivered
    assert!(nothing_within(&mut stream, Duration::from_millis(50)).await);
    release.remove(&3).unwrap().send(()).unwrap();
    assert_eq!(stream.next().await, Some(Ok(30)));
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn unordered_bridge_forwards_in_completion_order() {
    let (gates, mut release) = gates_for(&[1, 2, 3]);
    let upstream = upstream_of(&[1, 2, 3], true);
    let bridge = MappingPublisher::unordered(shared(upstream), gated_mapper(gates));
    let mut stream = PublisherStream::new(&bridge);

    release.remove(&2).unwrap().send(()).unwrap();
    assert_eq!(stream.next().await, Some(Ok(20)));

    release.remove(&1).unwrap().send(()).unwrap();
    assert_eq!(stream.next().await, Some(Ok(10)));

    release.remove(&3).unwrap().send(()).unwrap();
    assert_eq!(stream.next().await, Some(Ok(30)));
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn ordering_comes_from_config() {
    let mapper: MapFn<u32, u32> = Arc::new(|x: u32| async move { Ok::<_, EngineError>(x + 1) }.boxed());
    let config = IncrementalConfig::default().publisher_ordering(PublisherOrdering::Unordered);
    let bridge = MappingPublisher::from_config(shared(upstream_of(&[1], true)), mapper, &config);
    assert_eq!(bridge.ordering(), PublisherOrdering::Unordered);

    let items: Vec<_> = PublisherStream::new(&bridge).collect().await;
    assert_eq!(items, vec![Ok(2)]);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn upstream_error_is_delivered_after_accepted_values() {
    let (gates, mut release) = gates_for(&[1]);
    let upstream = upstream_of(&[1], false);
    upstream.error(EngineError::upstream("source closed"));
    let bridge = MappingPublisher::ordered(shared(upstream.clone()), gated_mapper(gates));
    let mut stream = PublisherStream::new(&bridge);

    assert!(nothing_within(&mut stream, Duration::from_millis(50)).await);
    release.remove(&1).unwrap().send(()).unwrap();
    assert_eq!(stream.next().await, Some(Ok(10)));
    assert_eq!(stream.next().await, Some(Err(EngineError::upstream("source closed"))));
    assert_eq!(stream.next().await, None);
}

#[tokio::test]
async fn mapping_failure_cancels_upstream() {
    let (gates, _release) = gates_for(&[1]);
    // item 7 has no gate and fails immediately
    let upstream = upstream_of(&[1, 7], false);
    let bridge = MappingPublisher::ordered(shared(upstream.clone()), gated_mapper(gates));
    let mut stream = PublisherStream::new(&bridge);

    assert_eq!(
        stream.next().await,
        Some(Err(EngineError::mapping("no gate for 7")))
    );
    assert_eq!(stream.next().await, None);
    assert!(upstream.is_cancelled());

    // later upstream values go nowhere
    upstream.offer(8);
    assert!(upstream.is_cancelled());
}

// ============================================================================
// Cancellation
// ============================================================================

#[tokio::test]
async fn downstream_cancel_reaches_upstream() {
    let upstream = upstream_of(&[1], false);
    let mapper: MapFn<u32, u32> = Arc::new(|x: u32| async move { Ok::<_, EngineError>(x) }.boxed());
    let bridge = MappingPublisher::new(
        shared(upstream.clone()),
        mapper,
        PublisherOrdering::Ordered,
    );
    let mut stream = PublisherStream::new(&bridge);
    assert_eq!(stream.next().await, Some(Ok(1)));

    stream.cancel();
    assert!(upstream.is_cancelled());

    upstream.offer(2);
    upstream.complete();
    assert!(nothing_within(&mut stream, Duration::from_millis(50)).await);
}

#[tokio::test]
async fn dropping_stream_before_subscription_cancels_upstream() {
    let upstream = upstream_of(&[1, 2], false);
    let mapper: MapFn<u32, u32> = Arc::new(|x: u32| async move { Ok::<_, EngineError>(x) }.boxed());
    let bridge = MappingPublisher::new(
        shared(upstream.clone()),
        mapper,
        PublisherOrdering::Ordered,
    );

    // both subscriptions are still in flight on the serial executors
    drop(PublisherStream::new(&bridge));

    let cancelled = tokio::time::timeout(Duration::from_secs(1), async {
        while !upstream.is_cancelled() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(cancelled.is_ok(), "upstream still running after the consumer left");
}
