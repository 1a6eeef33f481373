//! Shared kernel: data models used by every feature, plus the lock shim

pub mod models;
pub(crate) mod sync;
