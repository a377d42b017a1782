//! Store documents.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A schema-free document: a store-assigned ID plus a JSON object.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Field value, if present.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }
}
