//! Common test utilities for graphql-incremental
//!
//! Shared fixtures (resolvers, calls) and builders (result trees, selection
//! sets) for the integration tests.

#![allow(dead_code)]

mod builders;
mod fixtures;

pub use builders::*;
pub use fixtures::*;
