//! List filters in the service's JSON query syntax.

use serde::Serialize;
use serde_json::Value;

/// A single list filter or ordering clause.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Query {
    method: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    attribute: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    values: Vec<Value>,
}

impl Query {
    /// Documents whose `attribute` equals `value`.
    pub fn equal(attribute: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            method: "equal",
            attribute: Some(attribute.into()),
            values: vec![value.into()],
        }
    }

    pub fn order_desc(attribute: impl Into<String>) -> Self {
        Self {
            method: "orderDesc",
            attribute: Some(attribute.into()),
            values: Vec::new(),
        }
    }

    pub fn order_asc(attribute: impl Into<String>) -> Self {
        Self {
            method: "orderAsc",
            attribute: Some(attribute.into()),
            values: Vec::new(),
        }
    }

    /// Page size for list calls.
    pub fn limit(n: u32) -> Self {
        Self {
            method: "limit",
            attribute: None,
            values: vec![n.into()],
        }
    }

    /// Encoded form sent as one `queries[]` parameter.
    pub fn encode(&self) -> String {
        // Serializing a struct of strings and JSON values cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }
}
