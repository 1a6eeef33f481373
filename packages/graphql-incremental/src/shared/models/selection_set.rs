//! Merged selection set as handed over by the (external) field-merging step
//!
//! Each field carries the defer identities it was collected under. Directive
//! arguments and variables are already resolved into `DeferredExecution::enabled`.

use std::hash::{Hash, Hasher};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// One `@defer` occurrence; identity is the label
#[derive(Debug, Clone, Eq, Serialize, Deserialize)]
pub struct DeferredExecution {
    pub label: Option<String>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn enabled_default() -> bool {
    true
}

impl DeferredExecution {
    pub fn new(label: Option<String>) -> Self {
        Self {
            label,
            enabled: true,
        }
    }

    pub fn labeled(label: impl Into<String>) -> Self {
        Self::new(Some(label.into()))
    }

    pub fn unlabeled() -> Self {
        Self::new(None)
    }

    /// `@defer(if: false)`
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

impl PartialEq for DeferredExecution {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label
    }
}

impl Hash for DeferredExecution {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.label.hash(state);
    }
}

/// All occurrences of one response key, merged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergedField {
    pub name: String,
    pub alias: Option<String>,
    /// Output type as written in the schema, e.g. `String!`
    pub type_name: String,
    #[serde(default)]
    pub deferred_executions: Vec<DeferredExecution>,
}

impl MergedField {
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alias: None,
            type_name: type_name.into(),
            deferred_executions: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn deferred(mut self, execution: DeferredExecution) -> Self {
        self.deferred_executions.push(execution);
        self
    }

    /// Key under which the field appears in the response
    pub fn result_key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.name)
    }

    pub fn is_non_null(&self) -> bool {
        self.type_name.ends_with('!')
    }

    /// Deferred executions that are switched on, deduplicated by label
    pub fn enabled_deferred_executions(&self) -> Vec<&DeferredExecution> {
        let mut seen: Vec<&DeferredExecution> = Vec::new();
        for execution in self.deferred_executions.iter().filter(|e| e.enabled) {
            if !seen.contains(&execution) {
                seen.push(execution);
            }
        }
        seen
    }
}

/// Result keys mapped to merged fields, in selection order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergedSelectionSet {
    fields: IndexMap<String, MergedField>,
}

impl MergedSelectionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_field(mut self, field: MergedField) -> Self {
        self.add_field(field);
        self
    }

    pub fn add_field(&mut self, field: MergedField) {
        self.fields.insert(field.result_key().to_string(), field);
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn get(&self, result_key: &str) -> Option<&MergedField> {
        self.fields.get(result_key)
    }

    pub fn fields(&self) -> impl Iterator<Item = &MergedField> {
        self.fields.values()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<MergedField> for MergedSelectionSet {
    fn from_iter<I: IntoIterator<Item = MergedField>>(iter: I) -> Self {
        let mut set = Self::new();
        for field in iter {
            set.add_field(field);
        }
        set
    }
}
