//! Adapters between `futures::Stream` and [`Publisher`]

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::stream::{BoxStream, Stream, StreamExt};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use super::subscription::{Publisher, Signal, Subscriber, Subscription};
use crate::errors::{EngineError, Result};

// ═══════════════════════════════════════════════════════════════════════════
// Stream -> Publisher
// ═══════════════════════════════════════════════════════════════════════════

/// Publishes the items of a stream to a single subscriber
///
/// The stream is polled on a task of the ambient runtime; an `Err` item ends
/// the publication with `on_error`.
pub struct StreamPublisher<T> {
    stream: Mutex<Option<BoxStream<'static, Result<T>>>>,
}

impl<T: Send + 'static> StreamPublisher<T> {
    pub fn new<S>(stream: S) -> Self
    where
        S: Stream<Item = Result<T>> + Send + 'static,
    {
        Self {
            stream: Mutex::new(Some(stream.boxed())),
        }
    }
}

impl<T: Send + 'static> Publisher<T> for StreamPublisher<T> {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>) {
        let Some(mut stream) = self.stream.lock().take() else {
            subscriber.on_subscribe(Subscription::cancelled());
            subscriber.on_error(EngineError::AlreadySubscribed);
            return;
        };

        let handle = match Handle::try_current() {
            Ok(handle) => handle,
            Err(e) => {
                subscriber.on_subscribe(Subscription::cancelled());
                subscriber.on_error(EngineError::NoRuntime(e.to_string()));
                return;
            }
        };

        let subscription = Subscription::new();
        let token = subscription.token().clone();
        subscriber.on_subscribe(subscription);

        handle.spawn(async move {
            loop {
                let next = tokio::select! {
                    _ = token.cancelled() => return,
                    next = stream.next() => next,
                };
                match next {
                    Some(Ok(item)) => subscriber.on_next(item),
                    Some(Err(error)) => {
                        subscriber.on_error(error);
                        return;
                    }
                    None => {
                        subscriber.on_complete();
                        return;
                    }
                }
            }
        });
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Publisher -> Stream
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Default)]
struct SlotState {
    subscription: Option<Subscription>,
    cancelled: bool,
}

/// Holds the subscription a publisher hands over, possibly later than the
/// consumer decides to cancel
///
/// A cancel that arrives before `on_subscribe` is remembered and applied to
/// the subscription as soon as it is attached.
#[derive(Default)]
struct SubscriptionSlot {
    state: Mutex<SlotState>,
}

impl SubscriptionSlot {
    fn attach(&self, subscription: Subscription) {
        let rejected = {
            let mut state = self.state.lock();
            if state.cancelled || state.subscription.is_some() {
                true
            } else {
                state.subscription = Some(subscription.clone());
                false
            }
        };
        if rejected {
            subscription.cancel();
        }
    }

    fn cancel(&self) {
        let subscription = {
            let mut state = self.state.lock();
            state.cancelled = true;
            state.subscription.clone()
        };
        if let Some(subscription) = subscription {
            subscription.cancel();
        }
    }
}

struct ChannelSubscriber<T> {
    sender: mpsc::UnboundedSender<Signal<T>>,
    slot: Arc<SubscriptionSlot>,
}

impl<T: Send> Subscriber<T> for ChannelSubscriber<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.slot.attach(subscription);
    }

    fn on_next(&self, item: T) {
        let _ = self.sender.send(Signal::Next(item));
    }

    fn on_error(&self, error: EngineError) {
        let _ = self.sender.send(Signal::Error(error));
    }

    fn on_complete(&self) {
        let _ = self.sender.send(Signal::Complete);
    }
}

/// Consumes a publisher as a stream of `Result<T>`
///
/// An error is yielded as the last item. Dropping the stream cancels the
/// subscription.
pub struct PublisherStream<T> {
    receiver: mpsc::UnboundedReceiver<Signal<T>>,
    slot: Arc<SubscriptionSlot>,
    done: bool,
}

impl<T: Send + 'static> PublisherStream<T> {
    pub fn new<P>(publisher: &P) -> Self
    where
        P: Publisher<T> + ?Sized,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let slot = Arc::new(SubscriptionSlot::default());
        publisher.subscribe(Arc::new(ChannelSubscriber {
            sender,
            slot: Arc::clone(&slot),
        }));
        Self {
            receiver,
            slot,
            done: false,
        }
    }

    /// Cancel the subscription, now or once the publisher hands it over
    pub fn cancel(&self) {
        self.slot.cancel();
    }
}

impl<T> Unpin for PublisherStream<T> {}

impl<T> Stream for PublisherStream<T> {
    type Item = Result<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.done {
            return Poll::Ready(None);
        }
        match self.receiver.poll_recv(cx) {
            Poll::Ready(Some(Signal::Next(item))) => Poll::Ready(Some(Ok(item))),
            Poll::Ready(Some(Signal::Error(error))) => {
                self.done = true;
                Poll::Ready(Some(Err(error)))
            }
            Poll::Ready(Some(Signal::Complete)) | Poll::Ready(None) => {
                self.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T> Drop for PublisherStream<T> {
    fn drop(&mut self) {
        self.slot.cancel();
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Publisher -> first value
// ═══════════════════════════════════════════════════════════════════════════

struct FirstValueSubscriber<T> {
    sender: Mutex<Option<oneshot::Sender<Result<Option<T>>>>>,
    slot: SubscriptionSlot,
}

impl<T> FirstValueSubscriber<T> {
    fn finish(&self, outcome: Result<Option<T>>) {
        if let Some(sender) = self.sender.lock().take() {
            let _ = sender.send(outcome);
        }
        self.slot.cancel();
    }
}

impl<T: Send> Subscriber<T> for FirstValueSubscriber<T> {
    fn on_subscribe(&self, subscription: Subscription) {
        self.slot.attach(subscription);
    }

    fn on_next(&self, item: T) {
        self.finish(Ok(Some(item)));
    }

    fn on_error(&self, error: EngineError) {
        self.finish(Err(error));
    }

    fn on_complete(&self) {
        self.finish(Ok(None));
    }
}

/// First item of `publisher`, or `None` if it completes empty
///
/// The subscription is cancelled once the first item arrived.
pub async fn first_value<T, P>(publisher: &P) -> Result<Option<T>>
where
    T: Send + 'static,
    P: Publisher<T> + ?Sized,
{
    let (sender, receiver) = oneshot::channel();
    publisher.subscribe(Arc::new(FirstValueSubscriber {
        sender: Mutex::new(Some(sender)),
        slot: SubscriptionSlot::default(),
    }));
    receiver.await.map_err(|_| EngineError::Cancelled)?
}
