//! Subscriber / publisher contract
//!
//! Demand is always unbounded, so there is no `request(n)`: a subscription is
//! a cancellation handle and a subscriber sees `on_subscribe`, any number of
//! `on_next`, then at most one of `on_error` / `on_complete`.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::errors::EngineError;

pub trait Subscriber<T>: Send + Sync {
    fn on_subscribe(&self, subscription: Subscription);

    fn on_next(&self, item: T);

    fn on_error(&self, error: EngineError);

    fn on_complete(&self);
}

pub trait Publisher<T>: Send + Sync {
    fn subscribe(&self, subscriber: Arc<dyn Subscriber<T>>);
}

type CancelHook = Arc<dyn Fn() + Send + Sync>;

/// Cancellation handle handed to a subscriber
///
/// Clones share state. An optional hook runs on cancel, which is how a bridge
/// forwards downstream cancellation to its upstream.
#[derive(Clone, Default)]
pub struct Subscription {
    token: CancellationToken,
    on_cancel: Option<CancelHook>,
    fired: Arc<AtomicBool>,
}

impl Subscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cancel_hook(hook: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            token: CancellationToken::new(),
            on_cancel: Some(Arc::new(hook)),
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// A subscription that is already cancelled (handed to rejected subscribers)
    pub fn cancelled() -> Self {
        let subscription = Self::new();
        subscription.token.cancel();
        subscription
    }

    pub fn cancel(&self) {
        // first caller wins, even across threads
        if self.fired.swap(true, Ordering::AcqRel) {
            return;
        }
        self.token.cancel();
        if let Some(hook) = &self.on_cancel {
            hook();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.is_cancelled())
            .field("has_hook", &self.on_cancel.is_some())
            .finish()
    }
}

/// One signal on its way to a subscriber
#[derive(Debug, Clone, PartialEq)]
pub enum Signal<T> {
    Next(T),
    Error(EngineError),
    Complete,
}

impl<T> Signal<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Signal::Next(_))
    }

    pub fn deliver(self, subscriber: &dyn Subscriber<T>) {
        match self {
            Signal::Next(item) => subscriber.on_next(item),
            Signal::Error(error) => subscriber.on_error(error),
            Signal::Complete => subscriber.on_complete(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Barrier;
    use std::thread;

    #[test]
    fn test_cancel_runs_hook_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let subscription = Subscription::with_cancel_hook(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let clone = subscription.clone();

        subscription.cancel();
        clone.cancel();

        assert!(clone.is_cancelled());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_cancel_runs_hook_once() {
        for _ in 0..200 {
            let calls = Arc::new(AtomicUsize::new(0));
            let counter = Arc::clone(&calls);
            let subscription = Subscription::with_cancel_hook(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
            let barrier = Arc::new(Barrier::new(4));

            let handles: Vec<_> = (0..4)
                .map(|_| {
                    let subscription = subscription.clone();
                    let barrier = Arc::clone(&barrier);
                    thread::spawn(move || {
                        barrier.wait();
                        subscription.cancel();
                    })
                })
                .collect();
            for handle in handles {
                handle.join().unwrap();
            }

            assert!(subscription.is_cancelled());
            assert_eq!(calls.load(Ordering::SeqCst), 1);
        }
    }

    #[test]
    fn test_cancelled_constructor() {
        assert!(Subscription::cancelled().is_cancelled());
        assert!(!Subscription::new().is_cancelled());
    }

    #[test]
    fn test_signal_terminal() {
        assert!(!Signal::Next(1).is_terminal());
        assert!(Signal::<i32>::Complete.is_terminal());
        assert!(Signal::<i32>::Error(EngineError::Cancelled).is_terminal());
    }
}
