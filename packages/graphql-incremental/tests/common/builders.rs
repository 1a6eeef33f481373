//! Result tree and selection set builders

use graphql_incremental::features::result_tree::{ExecutionResultNode, FieldInfo, NodeRef};
use graphql_incremental::shared::models::{
    DeferredExecution, MergedField, MergedSelectionSet, ResultPath,
};
use indexmap::IndexMap;
use serde_json::{json, Value};

pub fn leaf(path: &str, type_name: &str, value: Value) -> NodeRef {
    ExecutionResultNode::leaf(FieldInfo::new(parse(path), type_name), value).into_ref()
}

pub fn unresolved(path: &str, type_name: &str) -> NodeRef {
    ExecutionResultNode::unresolved(FieldInfo::new(parse(path), type_name)).into_ref()
}

pub fn object(path: &str, type_name: &str, children: Vec<(&str, NodeRef)>) -> NodeRef {
    ExecutionResultNode::object(FieldInfo::new(parse(path), type_name), keyed(children)).into_ref()
}

pub fn list(path: &str, type_name: &str, children: Vec<NodeRef>) -> NodeRef {
    ExecutionResultNode::list(FieldInfo::new(parse(path), type_name), children).into_ref()
}

pub fn root(children: Vec<(&str, NodeRef)>) -> NodeRef {
    ExecutionResultNode::root(keyed(children)).into_ref()
}

pub fn parse(path: &str) -> ResultPath {
    ResultPath::parse(path).unwrap_or_else(|e| panic!("bad test path {path}: {e}"))
}

fn keyed(children: Vec<(&str, NodeRef)>) -> IndexMap<String, NodeRef> {
    children
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

/// `{ hero { name friends [ { name } x width ] } }` with every leaf unresolved
pub fn hero_tree(width: usize) -> NodeRef {
    let friends = (0..width)
        .map(|i| {
            let base = format!("/hero/friends[{i}]");
            object(
                &base,
                "Character",
                vec![("name", unresolved(&format!("{base}/name"), "String"))],
            )
        })
        .collect();
    root(vec![(
        "hero",
        object(
            "/hero",
            "Character",
            vec![
                ("name", unresolved("/hero/name", "String!")),
                ("friends", list("/hero/friends", "[Character]", friends)),
            ],
        ),
    )])
}

/// `{ a  ... @defer(label: "x") { b } }`
pub fn deferred_b_selection() -> MergedSelectionSet {
    MergedSelectionSet::new()
        .with_field(MergedField::new("a", "String"))
        .with_field(MergedField::new("b", "Int").deferred(DeferredExecution::labeled("x")))
}

pub fn answer() -> Value {
    json!(42)
}
