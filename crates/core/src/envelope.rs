//! Uniform response wrapper for read endpoints.

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::{uri::Scope, KmcpResult};

pub fn scope_description(namespace: Option<&str>) -> String {
    match namespace {
        Some(ns) if !ns.is_empty() => format!("Namespace: {}", ns),
        _ => "All namespaces".to_string(),
    }
}

/// `{scope, namespace?, <total_key>, <collection>: [...]}`.
///
/// The total is derived from the item list at serialization time, so it
/// cannot drift from the number of items. `namespace` is only emitted for
/// namespaced reads.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseEnvelope<T> {
    scope: String,
    namespace: Option<String>,
    total_key: &'static str,
    collection: String,
    items: Vec<T>,
}

impl<T> ResponseEnvelope<T> {
    pub fn new(collection: &str, total_key: &'static str, scope: &Scope, items: Vec<T>) -> Self {
        Self {
            scope: scope.describe(),
            namespace: scope.namespace().map(|s| s.to_string()),
            total_key,
            collection: collection.to_string(),
            items,
        }
    }

    pub fn namespace(&self) -> Option<&str> { self.namespace.as_deref() }
    pub fn total_items(&self) -> usize { self.items.len() }
}

impl<T: Serialize> ResponseEnvelope<T> {
    pub fn to_json_pretty(&self) -> KmcpResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl<T: Serialize> Serialize for ResponseEnvelope<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let len = if self.namespace.is_some() { 4 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("scope", &self.scope)?;
        if let Some(ns) = &self.namespace {
            map.serialize_entry("namespace", ns)?;
        }
        map.serialize_entry(self.total_key, &self.items.len())?;
        map.serialize_entry(&self.collection, &self.items)?;
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn total_tracks_items_for_zero_one_many() {
        for n in [0usize, 1, 7] {
            let items: Vec<u32> = (0..n as u32).collect();
            let env = ResponseEnvelope::new("deployments", "total_items", &Scope::All, items);
            let v: serde_json::Value = serde_json::from_str(&env.to_json_pretty().expect("encode")).expect("decode");
            assert_eq!(v["total_items"], json!(n));
            assert_eq!(v["deployments"].as_array().map(|a| a.len()), Some(n));
            assert_eq!(env.total_items(), n);
        }
    }

    #[test]
    fn empty_list_is_array_not_null() {
        let env: ResponseEnvelope<u8> = ResponseEnvelope::new("pods", "total_pods", &Scope::All, vec![]);
        let v = serde_json::to_value(&env).expect("encode");
        assert_eq!(v, json!({"scope": "All namespaces", "total_pods": 0, "pods": []}));
    }

    #[test]
    fn namespaced_form_echoes_namespace() {
        let env = ResponseEnvelope::new("services", "total_items", &Scope::Namespace("prod".into()), vec!["a"]);
        let v = serde_json::to_value(&env).expect("encode");
        assert_eq!(v, json!({"scope": "Namespace: prod", "namespace": "prod", "total_items": 1, "services": ["a"]}));
    }

    #[test]
    fn pretty_output_uses_two_space_indent() {
        let env: ResponseEnvelope<u8> = ResponseEnvelope::new("pods", "total_pods", &Scope::All, vec![]);
        let text = env.to_json_pretty().expect("encode");
        assert!(text.starts_with("{\n  \"scope\": \"All namespaces\""));
    }
}
