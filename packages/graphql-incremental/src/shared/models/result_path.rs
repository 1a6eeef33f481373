//! Result path
//!
//! Position of a value in the response tree: a list of object keys and list
//! indexes from the root. Displayed as `/a/b[1]/c`, serialized as the GraphQL
//! `path` list (`["a", "b", 1, "c"]`).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{EngineError, Result};

/// One step of a result path, also used as a child position in the result tree
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    Index(usize),
    Key(String),
}

impl PathSegment {
    pub fn key(key: impl Into<String>) -> Self {
        PathSegment::Key(key.into())
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            PathSegment::Key(k) => Some(k),
            PathSegment::Index(_) => None,
        }
    }

    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathSegment::Index(i) => Some(*i),
            PathSegment::Key(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            PathSegment::Key(k) => Value::String(k.clone()),
            PathSegment::Index(i) => Value::from(*i),
        }
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(k) => write!(f, "/{}", k),
            PathSegment::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl From<&str> for PathSegment {
    fn from(key: &str) -> Self {
        PathSegment::Key(key.to_string())
    }
}

impl From<String> for PathSegment {
    fn from(key: String) -> Self {
        PathSegment::Key(key)
    }
}

impl From<usize> for PathSegment {
    fn from(index: usize) -> Self {
        PathSegment::Index(index)
    }
}

/// Path from the response root to a value
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultPath {
    segments: Vec<PathSegment>,
}

impl ResultPath {
    /// The empty path (the response root)
    pub fn root() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: impl IntoIterator<Item = PathSegment>) -> Self {
        Self {
            segments: segments.into_iter().collect(),
        }
    }

    /// Child path for an object key
    pub fn segment(&self, key: impl Into<String>) -> Self {
        self.child(PathSegment::Key(key.into()))
    }

    /// Child path for a list index
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    pub fn child(&self, segment: PathSegment) -> Self {
        let mut segments = Vec::with_capacity(self.segments.len() + 1);
        segments.extend(self.segments.iter().cloned());
        segments.push(segment);
        Self { segments }
    }

    /// `None` for the root path
    pub fn parent(&self) -> Option<Self> {
        if self.segments.is_empty() {
            return None;
        }
        Some(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    pub fn last_segment(&self) -> Option<&PathSegment> {
        self.segments.last()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Number of segments; the root is level 0
    pub fn level(&self) -> usize {
        self.segments.len()
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn is_ancestor_of(&self, other: &ResultPath) -> bool {
        self.segments.len() < other.segments.len()
            && other.segments[..self.segments.len()] == self.segments[..]
    }

    /// The GraphQL `path` list
    pub fn to_list(&self) -> Vec<Value> {
        self.segments.iter().map(PathSegment::to_value).collect()
    }

    pub fn from_list(values: &[Value]) -> Result<Self> {
        let mut segments = Vec::with_capacity(values.len());
        for value in values {
            let segment = match value {
                Value::String(s) => PathSegment::Key(s.clone()),
                Value::Number(n) => match n.as_u64() {
                    Some(i) => PathSegment::Index(i as usize),
                    None => {
                        return Err(EngineError::InvalidPath {
                            input: Value::Array(values.to_vec()).to_string(),
                            reason: format!("'{}' is not a list index", n),
                        })
                    }
                },
                other => {
                    return Err(EngineError::InvalidPath {
                        input: Value::Array(values.to_vec()).to_string(),
                        reason: format!("unexpected segment {}", other),
                    })
                }
            };
            segments.push(segment);
        }
        Ok(Self { segments })
    }

    /// Parse the display form, e.g. `/pets[0]/name`
    pub fn parse(input: &str) -> Result<Self> {
        let invalid = |reason: &str| EngineError::InvalidPath {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed == "/" {
            return Ok(Self::root());
        }
        if !trimmed.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let mut segments = Vec::new();
        for part in trimmed[1..].split('/') {
            let (name, mut rest) = match part.find('[') {
                Some(pos) => (&part[..pos], &part[pos..]),
                None => (part, ""),
            };
            if name.is_empty() {
                return Err(invalid("empty field name"));
            }
            segments.push(PathSegment::Key(name.to_string()));

            while !rest.is_empty() {
                let close = rest.find(']').ok_or_else(|| invalid("unclosed '['"))?;
                let index = rest[1..close]
                    .parse::<usize>()
                    .map_err(|_| invalid("list index must be a non-negative integer"))?;
                segments.push(PathSegment::Index(index));
                rest = &rest[close + 1..];
                if !rest.is_empty() && !rest.starts_with('[') {
                    return Err(invalid("unexpected text after ']'"));
                }
            }
        }
        Ok(Self { segments })
    }
}

impl fmt::Display for ResultPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.segments.is_empty() {
            return write!(f, "/");
        }
        for segment in &self.segments {
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_and_parse() {
        let path = ResultPath::root().segment("pets").index(1).segment("name");
        assert_eq!(path.to_string(), "/pets[1]/name");
        assert_eq!(ResultPath::parse("/pets[1]/name").unwrap(), path);
        assert_eq!(ResultPath::parse("/").unwrap(), ResultPath::root());
        assert_eq!(ResultPath::root().to_string(), "/");
    }

    #[test]
    fn test_parse_nested_indexes() {
        let path = ResultPath::parse("/matrix[0][2]").unwrap();
        assert_eq!(path.level(), 3);
        assert_eq!(path.last_segment(), Some(&PathSegment::Index(2)));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(ResultPath::parse("pets").is_err());
        assert!(ResultPath::parse("/pets[x]").is_err());
        assert!(ResultPath::parse("/pets[1").is_err());
        assert!(ResultPath::parse("//a").is_err());
    }

    #[test]
    fn test_list_form() {
        let path = ResultPath::root().segment("a").index(0);
        assert_eq!(path.to_list(), vec![json!("a"), json!(0)]);
        assert_eq!(ResultPath::from_list(&path.to_list()).unwrap(), path);
        assert!(ResultPath::from_list(&[json!(true)]).is_err());
        assert!(ResultPath::from_list(&[json!(-1)]).is_err());
    }

    #[test]
    fn test_serde_as_list() {
        let path = ResultPath::root().segment("a").index(2);
        assert_eq!(serde_json::to_value(&path).unwrap(), json!(["a", 2]));
        let back: ResultPath = serde_json::from_value(json!(["a", 2])).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn test_parent_and_ancestry() {
        let path = ResultPath::root().segment("a").segment("b");
        let parent = path.parent().unwrap();
        assert_eq!(parent, ResultPath::root().segment("a"));
        assert!(parent.is_ancestor_of(&path));
        assert!(!path.is_ancestor_of(&parent));
        assert!(ResultPath::root().parent().is_none());
    }
}
