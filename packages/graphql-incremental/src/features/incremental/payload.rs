//! Incremental payloads
//!
//! What a deferred or streamed unit of work produces, and the batch shape
//! emitted on the incremental stream:
//!
//! ```text
//! { hasNext, incremental?: [ { path, label?, data? | items?, errors?, extensions? } ], extensions? }
//! ```

use serde::Serialize;
use serde_json::{Map, Value};

use crate::errors::{EngineError, Result};
use crate::shared::models::{GraphQLError, ResultPath};

// ═══════════════════════════════════════════════════════════════════════════
// Payloads
// ═══════════════════════════════════════════════════════════════════════════

/// Result of one `@defer` fragment
#[derive(Debug, Clone, PartialEq)]
pub struct DeferPayload {
    pub path: ResultPath,
    pub label: Option<String>,
    /// `null` for an error-only payload
    pub data: Value,
    pub errors: Vec<GraphQLError>,
    pub extensions: Option<Map<String, Value>>,
}

impl DeferPayload {
    pub fn new(path: ResultPath, label: Option<String>, data: Value) -> Self {
        Self {
            path,
            label,
            data,
            errors: Vec::new(),
            extensions: None,
        }
    }

    /// `data: null` with the errors that nulled it
    pub fn error_only(path: ResultPath, label: Option<String>, errors: Vec<GraphQLError>) -> Self {
        Self::new(path, label, Value::Null).with_errors(errors)
    }

    pub fn with_errors(mut self, errors: Vec<GraphQLError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn add_error(mut self, error: GraphQLError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn add_extension(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extensions
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    pub fn to_specification(&self) -> Map<String, Value> {
        let mut map = common_to_specification(&self.path, &self.label);
        map.insert("data".to_string(), self.data.clone());
        append_errors_and_extensions(&mut map, &self.errors, &self.extensions);
        map
    }

    pub fn from_specification(map: &Map<String, Value>) -> Result<Self> {
        let common = CommonFields::parse(map, "defer payload")?;
        Ok(Self {
            path: common.path,
            label: common.label,
            data: map.get("data").cloned().unwrap_or(Value::Null),
            errors: common.errors,
            extensions: common.extensions,
        })
    }
}

/// Items of one `@stream` chunk
#[derive(Debug, Clone, PartialEq)]
pub struct StreamPayload {
    pub path: ResultPath,
    pub label: Option<String>,
    pub items: Option<Vec<Value>>,
    pub errors: Vec<GraphQLError>,
    pub extensions: Option<Map<String, Value>>,
}

impl StreamPayload {
    pub fn new(path: ResultPath, label: Option<String>, items: Option<Vec<Value>>) -> Self {
        Self {
            path,
            label,
            items,
            errors: Vec::new(),
            extensions: None,
        }
    }

    pub fn with_errors(mut self, errors: Vec<GraphQLError>) -> Self {
        self.errors = errors;
        self
    }

    pub fn add_error(mut self, error: GraphQLError) -> Self {
        self.errors.push(error);
        self
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn to_specification(&self) -> Map<String, Value> {
        let mut map = common_to_specification(&self.path, &self.label);
        if let Some(items) = &self.items {
            map.insert("items".to_string(), Value::Array(items.clone()));
        }
        append_errors_and_extensions(&mut map, &self.errors, &self.extensions);
        map
    }

    pub fn from_specification(map: &Map<String, Value>) -> Result<Self> {
        let common = CommonFields::parse(map, "stream payload")?;
        let items = match map.get("items") {
            Some(Value::Array(items)) => Some(items.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return Err(EngineError::malformed("stream payload", "'items' is not a list")),
        };
        Ok(Self {
            path: common.path,
            label: common.label,
            items,
            errors: common.errors,
            extensions: common.extensions,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum IncrementalPayload {
    Defer(DeferPayload),
    Stream(StreamPayload),
}

impl IncrementalPayload {
    pub fn path(&self) -> &ResultPath {
        match self {
            IncrementalPayload::Defer(p) => &p.path,
            IncrementalPayload::Stream(p) => &p.path,
        }
    }

    pub fn label(&self) -> Option<&str> {
        match self {
            IncrementalPayload::Defer(p) => p.label.as_deref(),
            IncrementalPayload::Stream(p) => p.label.as_deref(),
        }
    }

    pub fn errors(&self) -> &[GraphQLError] {
        match self {
            IncrementalPayload::Defer(p) => &p.errors,
            IncrementalPayload::Stream(p) => &p.errors,
        }
    }

    pub fn to_specification(&self) -> Map<String, Value> {
        match self {
            IncrementalPayload::Defer(p) => p.to_specification(),
            IncrementalPayload::Stream(p) => p.to_specification(),
        }
    }

    /// A map with `items` is a stream payload, anything else a defer payload
    pub fn from_specification(map: &Map<String, Value>) -> Result<Self> {
        if map.contains_key("items") {
            StreamPayload::from_specification(map).map(IncrementalPayload::Stream)
        } else {
            DeferPayload::from_specification(map).map(IncrementalPayload::Defer)
        }
    }
}

impl From<DeferPayload> for IncrementalPayload {
    fn from(payload: DeferPayload) -> Self {
        IncrementalPayload::Defer(payload)
    }
}

impl From<StreamPayload> for IncrementalPayload {
    fn from(payload: StreamPayload) -> Self {
        IncrementalPayload::Stream(payload)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Emitted batch
// ═══════════════════════════════════════════════════════════════════════════

/// One batch on the incremental stream
#[derive(Debug, Clone, PartialEq)]
pub struct DelayedIncrementalPartialResult {
    pub incremental: Vec<IncrementalPayload>,
    pub has_next: bool,
    pub extensions: Option<Map<String, Value>>,
}

impl DelayedIncrementalPartialResult {
    pub fn new(incremental: Vec<IncrementalPayload>, has_next: bool) -> Self {
        Self {
            incremental,
            has_next,
            extensions: None,
        }
    }

    pub fn with_extensions(mut self, extensions: Map<String, Value>) -> Self {
        self.extensions = Some(extensions);
        self
    }

    pub fn to_specification(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("hasNext".to_string(), Value::Bool(self.has_next));
        if !self.incremental.is_empty() {
            map.insert(
                "incremental".to_string(),
                Value::Array(
                    self.incremental
                        .iter()
                        .map(|p| Value::Object(p.to_specification()))
                        .collect(),
                ),
            );
        }
        if let Some(extensions) = &self.extensions {
            map.insert("extensions".to_string(), Value::Object(extensions.clone()));
        }
        map
    }

    pub fn from_specification(map: &Map<String, Value>) -> Result<Self> {
        let has_next = map
            .get("hasNext")
            .and_then(Value::as_bool)
            .ok_or_else(|| EngineError::malformed("incremental result", "missing 'hasNext'"))?;

        let mut incremental = Vec::new();
        match map.get("incremental") {
            Some(Value::Array(list)) => {
                for entry in list {
                    let entry = entry.as_object().ok_or_else(|| {
                        EngineError::malformed("incremental result", "payload is not a map")
                    })?;
                    incremental.push(IncrementalPayload::from_specification(entry)?);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => {
                return Err(EngineError::malformed(
                    "incremental result",
                    "'incremental' is not a list",
                ))
            }
        }

        Ok(Self {
            incremental,
            has_next,
            extensions: parse_extensions(map, "incremental result")?,
        })
    }
}

macro_rules! serialize_via_specification {
    ($($ty:ty),*) => {
        $(
            impl Serialize for $ty {
                fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
                    self.to_specification().serialize(serializer)
                }
            }
        )*
    };
}

serialize_via_specification!(
    DeferPayload,
    StreamPayload,
    IncrementalPayload,
    DelayedIncrementalPartialResult
);

// ═══════════════════════════════════════════════════════════════════════════
// Shared field handling
// ═══════════════════════════════════════════════════════════════════════════

fn common_to_specification(path: &ResultPath, label: &Option<String>) -> Map<String, Value> {
    let mut map = Map::new();
    map.insert("path".to_string(), Value::Array(path.to_list()));
    if let Some(label) = label {
        map.insert("label".to_string(), Value::String(label.clone()));
    }
    map
}

fn append_errors_and_extensions(
    map: &mut Map<String, Value>,
    errors: &[GraphQLError],
    extensions: &Option<Map<String, Value>>,
) {
    if !errors.is_empty() {
        map.insert(
            "errors".to_string(),
            Value::Array(
                errors
                    .iter()
                    .map(|e| Value::Object(e.to_specification()))
                    .collect(),
            ),
        );
    }
    if let Some(extensions) = extensions {
        map.insert("extensions".to_string(), Value::Object(extensions.clone()));
    }
}

fn parse_extensions(map: &Map<String, Value>, kind: &'static str) -> Result<Option<Map<String, Value>>> {
    match map.get("extensions") {
        Some(Value::Object(ext)) => Ok(Some(ext.clone())),
        Some(Value::Null) | None => Ok(None),
        Some(_) => Err(EngineError::malformed(kind, "'extensions' is not a map")),
    }
}

struct CommonFields {
    path: ResultPath,
    label: Option<String>,
    errors: Vec<GraphQLError>,
    extensions: Option<Map<String, Value>>,
}

impl CommonFields {
    fn parse(map: &Map<String, Value>, kind: &'static str) -> Result<Self> {
        let path = match map.get("path") {
            Some(Value::Array(list)) => ResultPath::from_list(list)?,
            _ => return Err(EngineError::malformed(kind, "missing 'path'")),
        };
        let label = match map.get("label") {
            Some(Value::String(label)) => Some(label.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return Err(EngineError::malformed(kind, "'label' is not a string")),
        };
        let mut errors = Vec::new();
        match map.get("errors") {
            Some(Value::Array(list)) => {
                for error in list {
                    let error = error
                        .as_object()
                        .ok_or_else(|| EngineError::malformed(kind, "error is not a map"))?;
                    errors.push(GraphQLError::from_specification(error)?);
                }
            }
            Some(Value::Null) | None => {}
            Some(_) => return Err(EngineError::malformed(kind, "'errors' is not a list")),
        }
        Ok(Self {
            path,
            label,
            errors,
            extensions: parse_extensions(map, kind)?,
        })
    }
}
