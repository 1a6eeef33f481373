//! Batched reconciliation of many zippers over one root
//!
//! Zippers are folded deepest first. All zippers of one round that share a
//! parent are merged with a single `with_new_children` call; folding them one
//! by one would rebuild the parent from its stale breadcrumb each time and
//! drop every sibling edit but the last.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::trace;

use super::node::NodeRef;
use super::zipper::NodeZipper;
use crate::errors::{EngineError, Result};
use crate::shared::models::PathSegment;

#[derive(Debug, Clone, PartialEq)]
pub struct NodeMultiZipper {
    common_root: NodeRef,
    zippers: Vec<NodeZipper>,
}

impl NodeMultiZipper {
    pub fn new(common_root: NodeRef, zippers: Vec<NodeZipper>) -> Self {
        Self {
            common_root,
            zippers,
        }
    }

    pub fn common_root(&self) -> &NodeRef {
        &self.common_root
    }

    pub fn zippers(&self) -> &[NodeZipper] {
        &self.zippers
    }

    pub fn size(&self) -> usize {
        self.zippers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zippers.is_empty()
    }

    pub fn with_new_zipper(&self, zipper: NodeZipper) -> Self {
        let mut zippers = self.zippers.clone();
        zippers.push(zipper);
        Self::new(Arc::clone(&self.common_root), zippers)
    }

    pub fn with_replaced_zippers(&self, zippers: Vec<NodeZipper>) -> Self {
        Self::new(Arc::clone(&self.common_root), zippers)
    }

    /// Replace the zipper equal to `old`
    pub fn with_replaced_zipper(&self, old: &NodeZipper, new: NodeZipper) -> Result<Self> {
        let index = self
            .zippers
            .iter()
            .position(|z| z == old)
            .ok_or_else(|| EngineError::zipper("zipper to replace is not part of this multi-zipper"))?;
        let mut zippers = self.zippers.clone();
        zippers[index] = new;
        Ok(Self::new(Arc::clone(&self.common_root), zippers))
    }

    /// Point the zipper whose current node is `current` (by identity) at `new_node`
    pub fn with_replaced_zipper_for_node(&self, current: &NodeRef, new_node: NodeRef) -> Result<Self> {
        let index = self
            .zippers
            .iter()
            .position(|z| Arc::ptr_eq(z.current_node(), current))
            .ok_or_else(|| EngineError::zipper("no zipper for the given node"))?;
        let mut zippers = self.zippers.clone();
        zippers[index] = zippers[index].with_node(new_node);
        Ok(Self::new(Arc::clone(&self.common_root), zippers))
    }

    pub fn zipper_for_node(&self, node: &NodeRef) -> Option<&NodeZipper> {
        self.zippers
            .iter()
            .find(|z| Arc::ptr_eq(z.current_node(), node))
    }

    /// Rebuild the root with every zipper's current node in place
    pub fn to_root_node(&self) -> Result<NodeRef> {
        if self.zippers.is_empty() {
            return Ok(Arc::clone(&self.common_root));
        }

        let mut current = self.zippers.clone();
        loop {
            let max_depth = current.iter().map(NodeZipper::depth).max().unwrap_or(0);
            if max_depth == 0 {
                return current
                    .pop()
                    .map(|z| Arc::clone(z.current_node()))
                    .ok_or_else(|| EngineError::zipper("no zipper left"));
            }

            let (deepest, mut rest): (Vec<_>, Vec<_>) =
                current.into_iter().partition(|z| z.depth() == max_depth);

            let mut by_parent: IndexMap<Vec<PathSegment>, Vec<NodeZipper>> = IndexMap::new();
            for zipper in deepest {
                let parent = zipper.parent_location().unwrap_or_default();
                by_parent.entry(parent).or_default().push(zipper);
            }
            trace!(
                depth = max_depth,
                parents = by_parent.len(),
                "Merging zippers at depth"
            );

            for (_, group) in by_parent {
                rest.push(merge_siblings(group)?);
            }
            current = rest;
        }
    }
}

/// One `with_new_children` on the shared parent for all zippers of a group
fn merge_siblings(group: Vec<NodeZipper>) -> Result<NodeZipper> {
    let first = group
        .first()
        .ok_or_else(|| EngineError::zipper("empty sibling group"))?;
    let (parent, ancestors) = first
        .breadcrumbs()
        .split_first()
        .ok_or_else(|| EngineError::zipper("sibling group without a parent"))?;

    let replacements: Vec<(PathSegment, NodeRef)> = group
        .iter()
        .map(|z| {
            let position = z.breadcrumbs()[0].position.clone();
            (position, Arc::clone(z.current_node()))
        })
        .collect();

    let new_parent = parent.node.with_new_children(replacements)?;
    Ok(NodeZipper::new(Arc::new(new_parent), ancestors.to_vec()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::result_tree::node::{ExecutionResultNode, FieldInfo};
    use crate::shared::models::ResultPath;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn info(p: &str, ty: &str) -> FieldInfo {
        FieldInfo::new(ResultPath::parse(p).unwrap(), ty)
    }

    /// root { obj { a: <unresolved>, b: <unresolved> }, c: 1 }
    fn tree_with_two_unresolved() -> NodeRef {
        let mut obj = IndexMap::new();
        obj.insert(
            "a".to_string(),
            ExecutionResultNode::unresolved(info("/obj/a", "Int")).into_ref(),
        );
        obj.insert(
            "b".to_string(),
            ExecutionResultNode::unresolved(info("/obj/b", "Int")).into_ref(),
        );
        let mut root = IndexMap::new();
        root.insert(
            "obj".to_string(),
            ExecutionResultNode::object(info("/obj", "Obj"), obj).into_ref(),
        );
        root.insert(
            "c".to_string(),
            ExecutionResultNode::leaf(info("/c", "Int"), json!(1)).into_ref(),
        );
        ExecutionResultNode::root(root).into_ref()
    }

    fn zipper_at(root: &NodeRef, location: &[&str]) -> NodeZipper {
        location
            .iter()
            .fold(NodeZipper::root(Arc::clone(root)), |z, key| {
                z.move_down(&PathSegment::key(*key)).unwrap()
            })
    }

    #[test]
    fn test_sibling_edits_are_both_kept() {
        let root = tree_with_two_unresolved();
        let za = zipper_at(&root, &["obj", "a"])
            .with_node(ExecutionResultNode::leaf(info("/obj/a", "Int"), json!(10)).into_ref());
        let zb = zipper_at(&root, &["obj", "b"])
            .with_node(ExecutionResultNode::leaf(info("/obj/b", "Int"), json!(20)).into_ref());

        let new_root = NodeMultiZipper::new(Arc::clone(&root), vec![za, zb])
            .to_root_node()
            .unwrap();

        let obj = new_root.child(&PathSegment::key("obj")).unwrap();
        let a = obj.child(&PathSegment::key("a")).unwrap();
        let b = obj.child(&PathSegment::key("b")).unwrap();
        assert!(!a.is_unresolved());
        assert!(!b.is_unresolved());
        assert!(Arc::ptr_eq(
            new_root.child(&PathSegment::key("c")).unwrap(),
            root.child(&PathSegment::key("c")).unwrap()
        ));
    }

    #[test]
    fn test_mixed_depths() {
        let root = tree_with_two_unresolved();
        let deep = zipper_at(&root, &["obj", "a"])
            .with_node(ExecutionResultNode::leaf(info("/obj/a", "Int"), json!(1)).into_ref());
        let shallow = zipper_at(&root, &["c"])
            .with_node(ExecutionResultNode::leaf(info("/c", "Int"), json!(2)).into_ref());

        let new_root = NodeMultiZipper::new(Arc::clone(&root), vec![shallow, deep])
            .to_root_node()
            .unwrap();

        let c = new_root.child(&PathSegment::key("c")).unwrap();
        assert_eq!(
            c.as_ref(),
            &ExecutionResultNode::leaf(info("/c", "Int"), json!(2))
        );
        let a = new_root
            .child(&PathSegment::key("obj"))
            .and_then(|o| o.child(&PathSegment::key("a")))
            .unwrap();
        assert_eq!(
            a.as_ref(),
            &ExecutionResultNode::leaf(info("/obj/a", "Int"), json!(1))
        );
    }

    #[test]
    fn test_empty_returns_common_root() {
        let root = tree_with_two_unresolved();
        let multi = NodeMultiZipper::new(Arc::clone(&root), Vec::new());
        assert!(Arc::ptr_eq(&multi.to_root_node().unwrap(), &root));
    }

    #[test]
    fn test_replace_zipper_for_node() {
        let root = tree_with_two_unresolved();
        let za = zipper_at(&root, &["obj", "a"]);
        let target = Arc::clone(za.current_node());
        let multi = NodeMultiZipper::new(Arc::clone(&root), vec![za]);

        assert!(multi.zipper_for_node(&target).is_some());
        let replaced = multi
            .with_replaced_zipper_for_node(
                &target,
                ExecutionResultNode::leaf(info("/obj/a", "Int"), json!(5)).into_ref(),
            )
            .unwrap();
        assert!(replaced.zipper_for_node(&target).is_none());
        assert_eq!(replaced.size(), 1);

        let unknown = ExecutionResultNode::unresolved(info("/x", "Int")).into_ref();
        assert!(multi.with_replaced_zipper_for_node(&unknown, Arc::clone(&unknown)).is_err());
    }
}
