//! Turning a result tree into response data
//!
//! A node carrying a non-null violation materializes as `null` and reports
//! the violation once; its subtree is not visited. Unresolved placeholders
//! materialize as `null` without an error.

use std::sync::Arc;

use serde_json::{Map, Value};

use super::multi_zipper::NodeMultiZipper;
use super::node::{ExecutionResultNode, NodeRef};
use super::zipper::{Breadcrumb, NodeZipper};
use crate::shared::models::{ExecutionResult, GraphQLError};

pub fn to_execution_result(root: &ExecutionResultNode) -> ExecutionResult {
    let mut errors = Vec::new();
    let data = materialize(root, &mut errors);
    ExecutionResult::new(Some(data), errors)
}

/// Data of `node` only, violations reported into `errors`
pub fn materialize(node: &ExecutionResultNode, errors: &mut Vec<GraphQLError>) -> Value {
    if let Some(violation) = node.non_null_violation() {
        errors.push(violation.to_graphql_error());
        return Value::Null;
    }

    match node {
        ExecutionResultNode::Leaf(leaf) => leaf.value().clone(),
        ExecutionResultNode::Unresolved(_) => Value::Null,
        ExecutionResultNode::List(list) => Value::Array(
            list.children()
                .iter()
                .map(|child| materialize(child, errors))
                .collect(),
        ),
        ExecutionResultNode::Object(object) => {
            materialize_fields(object.children().iter(), errors)
        }
        ExecutionResultNode::Root(root) => materialize_fields(root.children().iter(), errors),
    }
}

fn materialize_fields<'a>(
    children: impl Iterator<Item = (&'a String, &'a NodeRef)>,
    errors: &mut Vec<GraphQLError>,
) -> Value {
    let mut map = Map::new();
    for (key, child) in children {
        map.insert(key.clone(), materialize(child, errors));
    }
    Value::Object(map)
}

/// Zippers for every unresolved node under `root`, depth-first
pub fn unresolved_nodes(root: &NodeRef) -> NodeMultiZipper {
    let mut zippers = Vec::new();
    collect_unresolved(root, &mut Vec::new(), &mut zippers);
    NodeMultiZipper::new(Arc::clone(root), zippers)
}

fn collect_unresolved(node: &NodeRef, trail: &mut Vec<Breadcrumb>, out: &mut Vec<NodeZipper>) {
    if node.is_unresolved() {
        let breadcrumbs = trail.iter().rev().cloned().collect();
        out.push(NodeZipper::new(Arc::clone(node), breadcrumbs));
        return;
    }
    for (position, child) in node.children() {
        trail.push(Breadcrumb::new(Arc::clone(node), position));
        collect_unresolved(&child, trail, out);
        trail.pop();
    }
}
