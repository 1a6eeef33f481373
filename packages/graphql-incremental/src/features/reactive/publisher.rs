//! Single-subscriber publisher
//!
//! Producer-side endpoint of a stream: `offer`, `complete` and `error` may be
//! called before anyone subscribes; signals are buffered and then delivered
//! to the one subscriber through a [`SerialExecutor`], so callbacks never
//! overlap and arrive in offer order.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use super::executor::SerialExecutor;
use super::subscription::{Publisher, Signal, Subscriber, Subscription};
use crate::errors::EngineError;

enum SubscriberState<T> {
    Unsubscribed,
    Active(Arc<dyn Subscriber<T>>),
    Terminated,
}

struct PublisherInner<T> {
    state: SubscriberState<T>,
    buffer: VecDeque<Signal<T>>,
    /// A terminal signal was offered (it may still sit in the buffer)
    terminal_offered: bool,
}

struct PublisherShared<T> {
    inner: Mutex<PublisherInner<T>>,
    subscription: Subscription,
    executor: SerialExecutor,
}

pub struct SingleSubscriberPublisher<T> {
    shared: Arc<PublisherShared<T>>,
}

impl<T> Clone for SingleSubscriberPublisher<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> Default for SingleSubscriberPublisher<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + 'static> SingleSubscriberPublisher<T> {
    pub fn new() -> Self {
        Self {
            shared: Arc::new(PublisherShared {
                inner: Mutex::new(PublisherInner {
                    state: SubscriberState::Unsubscribed,
                    buffer: VecDeque::new(),
                    terminal_offered: false,
                }),
                subscription: Subscription::new(),
                executor: SerialExecutor::new(),
            }),
        }
    }

    pub fn offer(&self, item: T) {
        self.push(Signal::Next(item));
    }

    /// No more data will be offered
    pub fn complete(&self) {
        self.push(Signal::Complete);
    }

    pub fn error(&self, error: EngineError) {
        self.push(Signal::Error(error));
    }

    /// The subscriber cancelled
    pub fn is_cancelled(&self) -> bool {
        self.shared.subscription.is_cancelled()
    }

    pub fn is_terminal_offered(&self) -> bool {
        self.shared.inner.lock().terminal_offered
    }

    fn push(&self, signal: Signal<T>) {
        {
            let mut inner = self.shared.inner.lock();
            if inner.terminal_offered || self.is_cancelled() {
                debug!("Publisher is terminal, dropping signal");
                return;
            }
            inner.terminal_offered = signal.is_terminal();
            inner.buffer.push_back(signal);
            if !matches!(inner.state, SubscriberState::Active(_)) {
                return;
            }
        }
        self.schedule_drain();
    }

    fn schedule_drain(&self) {
        let shared = Arc::clone(&self.shared);
        if let Err(e) = self.shared.executor.execute(move || shared.drain()) {
            warn!(error = %e, "Cannot deliver publisher signals");
        }
    }
}

impl<T: Send + 'static> PublisherShared<T> {
    /// Runs on the serial executor only
    fn drain(&self) {
        let (subscriber, signals) = {
            let mut inner = self.inner.lock();
            let subscriber = match &inner.state {
                SubscriberState::Active(s) => Arc::clone(s),
                _ => return,
            };
            (subscriber, std::mem::take(&mut inner.buffer))
        };

        for signal in signals {
            if self.subscription.is_cancelled() {
                self.terminate();
                return;
            }
            let terminal = signal.is_terminal();
            if terminal {
                self.terminate();
            }
            signal.deliver(subscriber.as_ref());
            if terminal {
                return;
            }
        }
    }

    fn terminate(&self) {
        let mut inner = self.inner.lock();
        inner.state = SubscriberState::Terminated;
        inner.buffer.clear();
    }
}

impl<T: Send + 'static> Publisher<T> for SingleSubscriberPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let started = {
            let mut inner = self.shared.inner.lock();
            if !matches!(inner.state, SubscriberState::Unsubscribed) {
                drop(inner);
                subscriber.on_subscribe(Subscription::cancelled());
                subscriber.on_error(EngineError::AlreadySubscribed);
                return;
            }

            // Queued under the lock: any drain scheduled by a concurrent offer
            // lands behind it, so on_subscribe precedes every on_next
            let subscription = self.shared.subscription.clone();
            let first = Arc::clone(&subscriber);
            let started = self
                .shared
                .executor
                .execute(move || first.on_subscribe(subscription));
            inner.state = match started {
                Ok(()) => SubscriberState::Active(Arc::clone(&subscriber)),
                Err(_) => SubscriberState::Terminated,
            };
            started
        };

        match started {
            Ok(()) => self.schedule_drain(),
            Err(e) => {
                warn!(error = %e, "Cannot start publisher delivery");
                subscriber.on_subscribe(Subscription::cancelled());
                subscriber.on_error(e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::reactive::adapters::PublisherStream;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_buffers_until_subscribed() {
        let publisher = SingleSubscriberPublisher::new();
        publisher.offer(1);
        publisher.offer(2);
        publisher.complete();
        publisher.offer(3);

        let items: Vec<_> = PublisherStream::new(&publisher).collect().await;
        assert_eq!(items, vec![Ok(1), Ok(2)]);
    }

    #[tokio::test]
    async fn test_error_is_terminal() {
        let publisher = SingleSubscriberPublisher::new();
        let stream = PublisherStream::new(&publisher);
        publisher.offer("a");
        publisher.error(EngineError::upstream("gone"));
        publisher.complete();

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items, vec![Ok("a"), Err(EngineError::upstream("gone"))]);
    }

    #[tokio::test]
    async fn test_second_subscriber_rejected() {
        let publisher = SingleSubscriberPublisher::<u8>::new();
        let _first = PublisherStream::new(&publisher);
        let second: Vec<_> = PublisherStream::new(&publisher).collect().await;
        assert_eq!(second, vec![Err(EngineError::AlreadySubscribed)]);
    }

    #[tokio::test]
    async fn test_cancel_stops_delivery() {
        let publisher = SingleSubscriberPublisher::new();
        let mut stream = PublisherStream::new(&publisher);
        publisher.offer(1);
        assert_eq!(stream.next().await, Some(Ok(1)));

        drop(stream);
        assert!(publisher.is_cancelled());
        publisher.offer(2);
        assert!(!publisher.is_terminal_offered());
    }
}
