//! Execution result nodes
//!
//! Persistent tree: every `with_*` operation returns a new node and shares the
//! untouched children through `Arc`. Non-null violations are computed when a
//! node is built, so a tree assembled bottom-up already carries the bubbled
//! signal at the right ancestor.

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;

use crate::errors::{EngineError, Result};
use crate::shared::models::{NonNullViolation, PathSegment, ResultPath};

pub type NodeRef = Arc<ExecutionResultNode>;

/// Field-level information of a non-root node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub path: ResultPath,
    /// Output type as written in the schema, e.g. `[Pet!]!`
    pub type_name: String,
}

impl FieldInfo {
    pub fn new(path: ResultPath, type_name: impl Into<String>) -> Self {
        Self {
            path,
            type_name: type_name.into(),
        }
    }

    pub fn is_non_null(&self) -> bool {
        self.type_name.ends_with('!')
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LeafNode {
    info: FieldInfo,
    value: Value,
    violation: Option<NonNullViolation>,
}

impl LeafNode {
    pub fn info(&self) -> &FieldInfo {
        &self.info
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ListNode {
    info: FieldInfo,
    children: Vec<NodeRef>,
    violation: Option<NonNullViolation>,
}

impl ListNode {
    pub fn info(&self) -> &FieldInfo {
        &self.info
    }

    pub fn children(&self) -> &[NodeRef] {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ObjectNode {
    info: FieldInfo,
    children: IndexMap<String, NodeRef>,
    violation: Option<NonNullViolation>,
}

impl ObjectNode {
    pub fn info(&self) -> &FieldInfo {
        &self.info
    }

    pub fn children(&self) -> &IndexMap<String, NodeRef> {
        &self.children
    }
}

/// Placeholder for a subtree that has not been resolved yet
#[derive(Debug, Clone, PartialEq)]
pub struct UnresolvedNode {
    info: FieldInfo,
}

impl UnresolvedNode {
    pub fn info(&self) -> &FieldInfo {
        &self.info
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RootNode {
    children: IndexMap<String, NodeRef>,
    violation: Option<NonNullViolation>,
}

impl RootNode {
    pub fn children(&self) -> &IndexMap<String, NodeRef> {
        &self.children
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionResultNode {
    Leaf(LeafNode),
    List(ListNode),
    Object(ObjectNode),
    Unresolved(UnresolvedNode),
    Root(RootNode),
}

// ═══════════════════════════════════════════════════════════════════════════
// Construction
// ═══════════════════════════════════════════════════════════════════════════

impl ExecutionResultNode {
    /// A resolved scalar/enum value; `null` under a non-null type is a violation
    pub fn leaf(info: FieldInfo, value: Value) -> Self {
        let violation = if value.is_null() && info.is_non_null() {
            Some(NonNullViolation::new(info.path.clone(), info.type_name.clone()))
        } else {
            None
        };
        ExecutionResultNode::Leaf(LeafNode {
            info,
            value,
            violation,
        })
    }

    pub fn list(info: FieldInfo, children: Vec<NodeRef>) -> Self {
        let violation = bubble(&info, children.iter());
        ExecutionResultNode::List(ListNode {
            info,
            children,
            violation,
        })
    }

    pub fn object(info: FieldInfo, children: IndexMap<String, NodeRef>) -> Self {
        let violation = bubble(&info, children.values());
        ExecutionResultNode::Object(ObjectNode {
            info,
            children,
            violation,
        })
    }

    pub fn unresolved(info: FieldInfo) -> Self {
        ExecutionResultNode::Unresolved(UnresolvedNode { info })
    }

    /// The operation root behaves like a non-null object
    pub fn root(children: IndexMap<String, NodeRef>) -> Self {
        let violation = first_violation(children.values())
            .map(|v| v.wrap(ResultPath::root()));
        ExecutionResultNode::Root(RootNode {
            children,
            violation,
        })
    }

    pub fn into_ref(self) -> NodeRef {
        Arc::new(self)
    }
}

fn first_violation<'a>(
    mut children: impl Iterator<Item = &'a NodeRef>,
) -> Option<&'a NonNullViolation> {
    children.find_map(|child| child.non_null_violation())
}

/// A non-null node captures the first child violation; a nullable node
/// absorbs it (the child materializes as null, siblings stay)
fn bubble<'a>(
    info: &FieldInfo,
    children: impl Iterator<Item = &'a NodeRef>,
) -> Option<NonNullViolation> {
    if !info.is_non_null() {
        return None;
    }
    first_violation(children).map(|v| v.wrap(info.path.clone()))
}

// ═══════════════════════════════════════════════════════════════════════════
// Accessors
// ═══════════════════════════════════════════════════════════════════════════

impl ExecutionResultNode {
    pub fn kind(&self) -> &'static str {
        match self {
            ExecutionResultNode::Leaf(_) => "leaf",
            ExecutionResultNode::List(_) => "list",
            ExecutionResultNode::Object(_) => "object",
            ExecutionResultNode::Unresolved(_) => "unresolved",
            ExecutionResultNode::Root(_) => "root",
        }
    }

    /// `None` for the root
    pub fn info(&self) -> Option<&FieldInfo> {
        match self {
            ExecutionResultNode::Leaf(n) => Some(&n.info),
            ExecutionResultNode::List(n) => Some(&n.info),
            ExecutionResultNode::Object(n) => Some(&n.info),
            ExecutionResultNode::Unresolved(n) => Some(&n.info),
            ExecutionResultNode::Root(_) => None,
        }
    }

    pub fn path(&self) -> ResultPath {
        self.info()
            .map(|info| info.path.clone())
            .unwrap_or_else(ResultPath::root)
    }

    pub fn non_null_violation(&self) -> Option<&NonNullViolation> {
        match self {
            ExecutionResultNode::Leaf(n) => n.violation.as_ref(),
            ExecutionResultNode::List(n) => n.violation.as_ref(),
            ExecutionResultNode::Object(n) => n.violation.as_ref(),
            ExecutionResultNode::Unresolved(_) => None,
            ExecutionResultNode::Root(n) => n.violation.as_ref(),
        }
    }

    pub fn is_unresolved(&self) -> bool {
        matches!(self, ExecutionResultNode::Unresolved(_))
    }

    pub fn child(&self, position: &PathSegment) -> Option<&NodeRef> {
        match (self, position) {
            (ExecutionResultNode::Object(n), PathSegment::Key(k)) => n.children.get(k),
            (ExecutionResultNode::Root(n), PathSegment::Key(k)) => n.children.get(k),
            (ExecutionResultNode::List(n), PathSegment::Index(i)) => n.children.get(*i),
            _ => None,
        }
    }

    /// Children with their positions, in order
    pub fn children(&self) -> Vec<(PathSegment, NodeRef)> {
        match self {
            ExecutionResultNode::Object(ObjectNode { children, .. })
            | ExecutionResultNode::Root(RootNode { children, .. }) => children
                .iter()
                .map(|(k, v)| (PathSegment::Key(k.clone()), Arc::clone(v)))
                .collect(),
            ExecutionResultNode::List(n) => n
                .children
                .iter()
                .enumerate()
                .map(|(i, v)| (PathSegment::Index(i), Arc::clone(v)))
                .collect(),
            ExecutionResultNode::Leaf(_) | ExecutionResultNode::Unresolved(_) => Vec::new(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Persistent edits
// ═══════════════════════════════════════════════════════════════════════════

impl ExecutionResultNode {
    /// New node with the child at `position` replaced
    pub fn with_child(&self, child: NodeRef, position: &PathSegment) -> Result<Self> {
        self.with_new_children([(position.clone(), child)])
    }

    /// New node with several children replaced in one step
    ///
    /// Object keys that do not exist yet are appended; list indexes must be in
    /// range. Violations are recomputed for the new node.
    pub fn with_new_children(
        &self,
        replacements: impl IntoIterator<Item = (PathSegment, NodeRef)>,
    ) -> Result<Self> {
        match self {
            ExecutionResultNode::Object(n) => {
                let children = replace_keyed(&n.children, replacements, self.kind())?;
                Ok(Self::object(n.info.clone(), children))
            }
            ExecutionResultNode::Root(n) => {
                let children = replace_keyed(&n.children, replacements, self.kind())?;
                Ok(Self::root(children))
            }
            ExecutionResultNode::List(n) => {
                let mut children = n.children.clone();
                for (position, child) in replacements {
                    match position {
                        PathSegment::Index(i) if i < children.len() => children[i] = child,
                        other => return Err(invalid_position(&other, self.kind())),
                    }
                }
                Ok(Self::list(n.info.clone(), children))
            }
            ExecutionResultNode::Leaf(_) | ExecutionResultNode::Unresolved(_) => {
                match replacements.into_iter().next() {
                    Some((position, _)) => Err(invalid_position(&position, self.kind())),
                    None => Ok(self.clone()),
                }
            }
        }
    }
}

fn replace_keyed(
    children: &IndexMap<String, NodeRef>,
    replacements: impl IntoIterator<Item = (PathSegment, NodeRef)>,
    kind: &'static str,
) -> Result<IndexMap<String, NodeRef>> {
    let mut children = children.clone();
    for (position, child) in replacements {
        match position {
            PathSegment::Key(key) => {
                children.insert(key, child);
            }
            other => return Err(invalid_position(&other, kind)),
        }
    }
    Ok(children)
}

fn invalid_position(position: &PathSegment, node: &'static str) -> EngineError {
    EngineError::InvalidPosition {
        position: position.to_string(),
        node,
    }
}
