//! Zipper over the result tree
//!
//! A cursor plus the path back to the root, so a single node can be replaced
//! and the tree rebuilt by folding the breadcrumbs instead of re-walking it.

use std::sync::Arc;

use super::node::NodeRef;
use crate::errors::{EngineError, Result};
use crate::shared::models::PathSegment;

/// An ancestor and the position of the next node down inside it
#[derive(Debug, Clone, PartialEq)]
pub struct Breadcrumb {
    pub node: NodeRef,
    pub position: PathSegment,
}

impl Breadcrumb {
    pub fn new(node: NodeRef, position: PathSegment) -> Self {
        Self { node, position }
    }
}

/// Breadcrumbs are ordered nearest ancestor first
#[derive(Debug, Clone, PartialEq)]
pub struct NodeZipper {
    current: NodeRef,
    breadcrumbs: Vec<Breadcrumb>,
}

impl NodeZipper {
    pub fn new(current: NodeRef, breadcrumbs: Vec<Breadcrumb>) -> Self {
        Self {
            current,
            breadcrumbs,
        }
    }

    /// Zipper positioned at the root of `node`
    pub fn root(node: NodeRef) -> Self {
        Self::new(node, Vec::new())
    }

    pub fn current_node(&self) -> &NodeRef {
        &self.current
    }

    pub fn breadcrumbs(&self) -> &[Breadcrumb] {
        &self.breadcrumbs
    }

    pub fn depth(&self) -> usize {
        self.breadcrumbs.len()
    }

    pub fn is_at_root(&self) -> bool {
        self.breadcrumbs.is_empty()
    }

    /// Positions from the root down to the current node
    pub fn location(&self) -> Vec<PathSegment> {
        self.breadcrumbs
            .iter()
            .rev()
            .map(|b| b.position.clone())
            .collect()
    }

    /// Location of the immediate parent, `None` at the root
    pub fn parent_location(&self) -> Option<Vec<PathSegment>> {
        if self.breadcrumbs.is_empty() {
            return None;
        }
        Some(
            self.breadcrumbs[1..]
                .iter()
                .rev()
                .map(|b| b.position.clone())
                .collect(),
        )
    }

    /// Same position, different node
    pub fn with_node(&self, node: NodeRef) -> Self {
        Self::new(node, self.breadcrumbs.clone())
    }

    pub fn move_down(&self, position: &PathSegment) -> Result<Self> {
        let child = self.current.child(position).ok_or_else(|| {
            EngineError::zipper(format!(
                "no child at '{}' in {} node",
                position,
                self.current.kind()
            ))
        })?;
        let mut breadcrumbs = Vec::with_capacity(self.breadcrumbs.len() + 1);
        breadcrumbs.push(Breadcrumb::new(Arc::clone(&self.current), position.clone()));
        breadcrumbs.extend(self.breadcrumbs.iter().cloned());
        Ok(Self::new(Arc::clone(child), breadcrumbs))
    }

    /// Fold the nearest breadcrumb into its ancestor
    pub fn move_up(&self) -> Result<Self> {
        let (nearest, rest) = self
            .breadcrumbs
            .split_first()
            .ok_or_else(|| EngineError::zipper("cannot move up from the root"))?;
        let parent = nearest
            .node
            .with_child(Arc::clone(&self.current), &nearest.position)?;
        Ok(Self::new(Arc::new(parent), rest.to_vec()))
    }

    /// Fold every breadcrumb and return the rebuilt root
    pub fn to_root_node(&self) -> Result<NodeRef> {
        let mut current = Arc::clone(&self.current);
        for crumb in &self.breadcrumbs {
            current = Arc::new(crumb.node.with_child(current, &crumb.position)?);
        }
        Ok(current)
    }
}
