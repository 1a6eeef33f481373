//! GraphQL error data model
//!
//! The engine treats errors as opaque values that travel inside payloads;
//! this type only knows how to render itself in the GraphQL response format.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::result_path::ResultPath;
use crate::errors::{EngineError, Result};

/// Source location of an error (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }

    /// Locations with a zero line or column are placeholders and are not rendered
    pub fn is_valid(&self) -> bool {
        self.line >= 1 && self.column >= 1
    }
}

/// Well-known error classifications
pub mod classification {
    pub const DATA_FETCHING_EXCEPTION: &str = "DataFetchingException";
    pub const NULL_VALUE_IN_NON_NULLABLE_FIELD: &str = "NullValueInNonNullableField";
    pub const EXECUTION_ABORTED: &str = "ExecutionAborted";
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct GraphQLError {
    pub message: String,
    pub locations: Vec<SourceLocation>,
    pub path: Option<ResultPath>,
    pub classification: Option<String>,
    pub extensions: Option<Map<String, Value>>,
}

impl GraphQLError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }

    /// A data fetching error at `path`
    pub fn data_fetching(path: ResultPath, message: impl Into<String>) -> Self {
        Self::new(message)
            .with_path(path)
            .with_classification(classification::DATA_FETCHING_EXCEPTION)
    }

    pub fn with_path(mut self, path: ResultPath) -> Self {
        self.path = Some(path);
        self
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.locations.push(location);
        self
    }

    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    pub fn with_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Render as a GraphQL response error map
    ///
    /// The classification is reported under `extensions.classification`
    /// unless the extensions already define that key.
    pub fn to_specification(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("message".to_string(), Value::String(self.message.clone()));

        if !self.locations.is_empty() {
            let locations: Vec<Value> = self
                .locations
                .iter()
                .filter(|loc| loc.is_valid())
                .map(|loc| {
                    let mut l = Map::new();
                    l.insert("line".to_string(), Value::from(loc.line));
                    l.insert("column".to_string(), Value::from(loc.column));
                    Value::Object(l)
                })
                .collect();
            map.insert("locations".to_string(), Value::Array(locations));
        }

        if let Some(path) = &self.path {
            map.insert("path".to_string(), Value::Array(path.to_list()));
        }

        let mut extensions = self.extensions.clone();
        if let Some(classification) = &self.classification {
            let ext = extensions.get_or_insert_with(Map::new);
            if !ext.contains_key("classification") {
                ext.insert(
                    "classification".to_string(),
                    Value::String(classification.clone()),
                );
            }
        }
        if let Some(ext) = extensions {
            map.insert("extensions".to_string(), Value::Object(ext));
        }

        map
    }

    /// Parse a GraphQL response error map
    ///
    /// `extensions.classification` becomes the classification again; the
    /// remaining extensions are kept (an empty remainder is dropped).
    pub fn from_specification(map: &Map<String, Value>) -> Result<Self> {
        let message = map
            .get("message")
            .and_then(Value::as_str)
            .ok_or_else(|| EngineError::malformed("error", "missing 'message'"))?
            .to_string();

        let mut locations = Vec::new();
        if let Some(value) = map.get("locations") {
            let list = value
                .as_array()
                .ok_or_else(|| EngineError::malformed("error", "'locations' is not a list"))?;
            for loc in list {
                let line = loc.get("line").and_then(Value::as_u64);
                let column = loc.get("column").and_then(Value::as_u64);
                match (line, column) {
                    (Some(line), Some(column)) => {
                        locations.push(SourceLocation::new(line as u32, column as u32))
                    }
                    _ => return Err(EngineError::malformed("error", "bad location entry")),
                }
            }
        }

        let path = match map.get("path") {
            Some(Value::Array(list)) => Some(ResultPath::from_list(list)?),
            Some(Value::Null) | None => None,
            Some(_) => return Err(EngineError::malformed("error", "'path' is not a list")),
        };

        let mut classification = None;
        let mut extensions = match map.get("extensions") {
            Some(Value::Object(ext)) => Some(ext.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return Err(EngineError::malformed("error", "'extensions' is not a map")),
        };
        if let Some(ext) = extensions.as_mut() {
            if let Some(Value::String(c)) = ext.remove("classification") {
                classification = Some(c);
            }
        }
        if extensions.as_ref().is_some_and(Map::is_empty) {
            extensions = None;
        }

        Ok(Self {
            message,
            locations,
            path,
            classification,
            extensions,
        })
    }
}

impl fmt::Display for GraphQLError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.path {
            Some(path) => write!(f, "{} (at {})", self.message, path),
            None => write!(f, "{}", self.message),
        }
    }
}

impl Serialize for GraphQLError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_specification().serialize(serializer)
    }
}
