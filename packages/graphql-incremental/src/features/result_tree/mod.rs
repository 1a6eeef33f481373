//! Result tree
//!
//! Persistent execution result nodes, zippers for localized edits and the
//! multi-zipper used to reconcile many edits against one root.

pub mod materialize;
pub mod multi_zipper;
pub mod node;
pub mod zipper;

pub use materialize::{materialize, to_execution_result, unresolved_nodes};
pub use multi_zipper::NodeMultiZipper;
pub use node::{
    ExecutionResultNode, FieldInfo, LeafNode, ListNode, NodeRef, ObjectNode, RootNode,
    UnresolvedNode,
};
pub use zipper::{Breadcrumb, NodeZipper};
