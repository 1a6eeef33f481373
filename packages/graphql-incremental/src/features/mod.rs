//! Feature modules
//!
//! - result_tree/ - persistent result nodes, zippers, materialization
//! - reactive/    - publisher/subscriber contract and the mapping bridge
//! - incremental/ - deferred calls, scheduler, payloads

pub mod incremental;
pub mod reactive;
pub mod result_tree;
