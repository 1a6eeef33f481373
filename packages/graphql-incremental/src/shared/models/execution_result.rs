//! Materialized execution result (`{data, errors}`)

use serde::Serialize;
use serde_json::{Map, Value};

use super::graphql_error::GraphQLError;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResult {
    pub data: Option<Value>,
    pub errors: Vec<GraphQLError>,
}

impl ExecutionResult {
    pub fn new(data: Option<Value>, errors: Vec<GraphQLError>) -> Self {
        Self { data, errors }
    }

    pub fn is_data_present(&self) -> bool {
        self.data.is_some()
    }

    pub fn to_specification(&self) -> Map<String, Value> {
        let mut map = Map::new();
        if !self.errors.is_empty() {
            map.insert(
                "errors".to_string(),
                Value::Array(
                    self.errors
                        .iter()
                        .map(|e| Value::Object(e.to_specification()))
                        .collect(),
                ),
            );
        }
        if let Some(data) = &self.data {
            map.insert("data".to_string(), data.clone());
        }
        map
    }
}

impl Serialize for ExecutionResult {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_specification().serialize(serializer)
    }
}
