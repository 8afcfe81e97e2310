//! Remote object model: attribute snapshots, lookup criteria and filters

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};

/// Attribute mapping shared by remote snapshots, declared configuration
/// and partial update payloads.
pub type AttrMap = HashMap<String, Value>;

/// Snapshot of a remote object as observed through the platform API.
///
/// The platform owns the object; the engine only ever sees point-in-time
/// snapshots of its identity and attribute set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteObject {
    /// Platform-assigned identity.
    pub id: String,

    /// Attribute name to value. Values may be strings, integers or
    /// nested collections.
    pub attributes: AttrMap,
}

impl RemoteObject {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            attributes: AttrMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: Value) -> Self {
        self.attributes.insert(key.into(), value);
        self
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    pub fn attr_str(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn attr_i64(&self, key: &str) -> Option<i64> {
        self.attributes.get(key).and_then(Value::as_i64)
    }

    pub fn attr_bool(&self, key: &str) -> Option<bool> {
        self.attributes.get(key).and_then(Value::as_bool)
    }

    pub fn attr_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.attributes.get(key).and_then(Value::as_array)
    }

    /// Conjunctive filter match, the same semantics the platform applies
    /// server-side. The reserved key `id` matches the object identity;
    /// every other key must equal the string form of the attribute.
    pub fn matches(&self, filter: &Filter) -> bool {
        filter.iter().all(|(key, expected)| {
            if key == "id" {
                return self.id == *expected;
            }
            match self.attributes.get(key) {
                Some(Value::String(s)) => s == expected,
                Some(Value::Number(n)) => n.to_string() == *expected,
                Some(Value::Bool(b)) => b.to_string() == *expected,
                _ => false,
            }
        })
    }
}

/// Locally-known match criteria for a lookup.
///
/// Each entry maps an attribute name to an optional scalar value. `None`
/// and empty strings are wildcards: the platform client omits zero-value
/// filter fields from the query, so an unset criterion imposes no
/// constraint. Criteria are immutable during a lookup and combine
/// conjunctively.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Criteria {
    entries: BTreeMap<String, Option<String>>,
}

impl Criteria {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style entry. `None` records an explicit wildcard.
    pub fn with(mut self, field: impl Into<String>, value: Option<String>) -> Self {
        self.entries.insert(field.into(), value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: Option<String>) {
        self.entries.insert(field.into(), value);
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.entries.get(field).and_then(|v| v.as_deref())
    }

    /// Build the provider-side filter: every concrete, non-empty
    /// criterion is kept, wildcards are dropped.
    pub fn to_filter(&self) -> Filter {
        let mut filter = Filter::new();
        for (field, value) in &self.entries {
            if let Some(value) = value {
                if !value.is_empty() {
                    filter.insert(field.clone(), value.clone());
                }
            }
        }
        filter
    }
}

/// Concrete conjunctive filter passed to the platform list call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter(BTreeMap<String, String>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<String>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wildcard_criteria_are_dropped_from_the_filter() {
        let criteria = Criteria::new()
            .with("name", Some("security_group".to_string()))
            .with("status", Some(String::new()))
            .with("volume_id", None);

        let filter = criteria.to_filter();
        assert_eq!(filter.len(), 1);
        assert_eq!(filter.get("name"), Some("security_group"));
    }

    #[test]
    fn filter_matching_is_conjunctive() {
        let object = RemoteObject::new("b-1")
            .with_attribute("name", json!("nightly"))
            .with_attribute("status", json!("available"))
            .with_attribute("size", json!(40));

        let mut filter = Filter::new();
        filter.insert("name", "nightly");
        filter.insert("size", "40");
        assert!(object.matches(&filter));

        filter.insert("status", "error");
        assert!(!object.matches(&filter));
    }

    #[test]
    fn id_filter_matches_object_identity() {
        let object = RemoteObject::new("b-1");

        let mut filter = Filter::new();
        filter.insert("id", "b-1");
        assert!(object.matches(&filter));

        let mut other = Filter::new();
        other.insert("id", "b-2");
        assert!(!object.matches(&other));
    }

    #[test]
    fn missing_attributes_never_match() {
        let object = RemoteObject::new("b-1");
        let mut filter = Filter::new();
        filter.insert("name", "nightly");
        assert!(!object.matches(&filter));
    }
}
