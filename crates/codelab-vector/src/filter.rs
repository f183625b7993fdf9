//! Metadata equality filters.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Conjunction of `key == value` clauses over vector metadata.
///
/// Keys are kept sorted so the rendered filter is stable across calls.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataFilter(BTreeMap<String, Value>);

impl MetadataFilter {
    /// Creates an empty filter that matches every vector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an equality clause, replacing any previous clause on the same key.
    pub fn eq(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Adds an equality clause in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Returns true if no clauses are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the number of clauses.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates over the clauses in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Parses a JSON filter object.
    ///
    /// Accepts both literal values (`{"type": "method"}`) and explicit
    /// equality operators (`{"type": {"$eq": "method"}}`). Returns `None`
    /// for any other shape.
    pub fn from_json(value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let mut filter = Self::new();
        for (key, clause) in object {
            let literal = match clause {
                Value::Object(op) if op.len() == 1 => op.get("$eq")?.clone(),
                Value::Object(_) | Value::Array(_) => return None,
                other => other.clone(),
            };
            filter.insert(key.clone(), literal);
        }
        Some(filter)
    }

    /// Renders the filter in Pinecone's query syntax.
    pub fn to_pinecone(&self) -> Value {
        let clauses: Map<String, Value> = self
            .0
            .iter()
            .map(|(key, value)| (key.clone(), json!({ "$eq": value })))
            .collect();
        Value::Object(clauses)
    }

    /// Returns true if every clause matches the given metadata.
    pub fn matches(&self, metadata: &HashMap<String, Value>) -> bool {
        self.0
            .iter()
            .all(|(key, expected)| metadata.get(key).is_some_and(|actual| actual == expected))
    }
}

impl<K, V> FromIterator<(K, V)> for MetadataFilter
where
    K: Into<String>,
    V: Into<Value>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_eq_clauses_for_pinecone() {
        let filter = MetadataFilter::new()
            .eq("sessionId", "s-1")
            .eq("type", "method");

        assert_eq!(
            filter.to_pinecone(),
            json!({
                "sessionId": { "$eq": "s-1" },
                "type": { "$eq": "method" },
            })
        );
    }

    #[test]
    fn parses_literal_and_operator_forms() {
        let literal = MetadataFilter::from_json(&json!({ "type": "intent" })).unwrap();
        let operator = MetadataFilter::from_json(&json!({ "type": { "$eq": "intent" } })).unwrap();

        assert_eq!(literal, operator);
        assert!(MetadataFilter::from_json(&json!({ "type": { "$in": ["a"] } })).is_none());
        assert!(MetadataFilter::from_json(&json!(["type"])).is_none());
    }

    #[test]
    fn matches_requires_every_clause() {
        let metadata = HashMap::from([
            ("sessionId".to_string(), json!("s-1")),
            ("type".to_string(), json!("class")),
        ]);

        assert!(MetadataFilter::new().matches(&metadata));
        assert!(MetadataFilter::new().eq("sessionId", "s-1").matches(&metadata));
        assert!(
            !MetadataFilter::new()
                .eq("sessionId", "s-1")
                .eq("type", "method")
                .matches(&metadata)
        );
        assert!(!MetadataFilter::new().eq("missing", "x").matches(&metadata));
    }
}
