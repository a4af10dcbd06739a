use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static NULL: Value = Value::Null;

/// Opaque, globally unique row identifier.
///
/// Server-issued ids and client-side phantom ids share this type; phantom ids
/// carry the configured temporary prefix (`tmp-` by default).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(String);

impl RowId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// True if this id was minted client-side with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.0.starts_with(prefix)
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RowId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for RowId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A Lead or Listing as the grid sees it: an id plus loosely typed fields.
///
/// `recommendations` is a transient annotation attached after creation by the
/// background enrichment call. It is never sent back to the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub id: RowId,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendations: Option<Value>,
}

impl Row {
    pub fn new(id: impl Into<RowId>) -> Self {
        Self {
            id: id.into(),
            fields: Map::new(),
            recommendations: None,
        }
    }

    /// Builder-style field setter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    /// Field value, or `Null` when absent.
    pub fn get(&self, key: &str) -> &Value {
        self.fields.get(key).unwrap_or(&NULL)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Merge `patch` into this row's fields, returning the previous value of
    /// every touched field (`None` if the field was absent).
    pub fn merge(&mut self, patch: &Map<String, Value>) -> Vec<(String, Option<Value>)> {
        patch
            .iter()
            .map(|(key, value)| {
                let prior = self.fields.insert(key.clone(), value.clone());
                (key.clone(), prior)
            })
            .collect()
    }

    /// Restore fields captured by [`Row::merge`].
    pub fn restore(&mut self, prior: &[(String, Option<Value>)]) {
        for (key, value) in prior {
            match value {
                Some(v) => {
                    self.fields.insert(key.clone(), v.clone());
                }
                None => {
                    self.fields.remove(key);
                }
            }
        }
    }

    /// Raw string form of a field, used for filter and search matching.
    pub fn raw_text(&self, key: &str) -> Option<String> {
        raw_text(self.get(key))
    }
}

/// String form of a scalar JSON value; `None` for `Null`.
pub fn raw_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// Drop later duplicates of any row id, keeping first occurrence order.
///
/// Overlapping pages can return the same row twice under concurrent writes.
pub fn dedup_rows<I>(rows: I) -> Vec<Row>
where
    I: IntoIterator<Item = Row>,
{
    let mut seen = std::collections::HashSet::new();
    rows.into_iter()
        .filter(|row| seen.insert(row.id.clone()))
        .collect()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_row_roundtrips_flattened_fields() {
        let row: Row = serde_json::from_value(json!({
            "id": "L-1",
            "name": "김철수",
            "stage": "NEW"
        }))
        .unwrap();
        assert_eq!(row.id.as_str(), "L-1");
        assert_eq!(row.get("name"), &json!("김철수"));
        assert_eq!(row.get("missing"), &Value::Null);
        assert!(row.recommendations.is_none());
    }

    #[test]
    fn test_merge_then_restore_is_exact() {
        let mut row = Row::new("L-1").with("price", 100);
        let mut patch = Map::new();
        patch.insert("price".into(), json!(200));
        patch.insert("memo".into(), json!("new"));

        let prior = row.merge(&patch);
        assert_eq!(row.get("price"), &json!(200));
        row.restore(&prior);

        assert_eq!(row.get("price"), &json!(100));
        assert!(!row.fields.contains_key("memo"));
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let rows = vec![
            Row::new("a").with("v", 1),
            Row::new("b"),
            Row::new("a").with("v", 2),
        ];
        let out = dedup_rows(rows);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].get("v"), &json!(1));
    }

    #[test]
    fn test_raw_text_of_scalars() {
        assert_eq!(raw_text(&json!(12)), Some("12".into()));
        assert_eq!(raw_text(&json!("NEW")), Some("NEW".into()));
        assert_eq!(raw_text(&Value::Null), None);
    }
}
