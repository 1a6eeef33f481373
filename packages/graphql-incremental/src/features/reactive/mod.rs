//! Reactive support
//!
//! A small subscribe/cancel stream contract, the serial executor used to
//! deliver signals, a buffering single-subscriber publisher, the mapping
//! bridge and adapters to and from `futures::Stream`.

pub mod adapters;
pub mod executor;
pub mod mapping;
pub mod publisher;
pub mod subscription;

pub use adapters::{first_value, PublisherStream, StreamPublisher};
pub use executor::SerialExecutor;
pub use mapping::{MapFn, MappingPublisher, PublisherOrdering};
pub use publisher::SingleSubscriberPublisher;
pub use subscription::{Publisher, Signal, Subscriber, Subscription};
