// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Deterministic cache keys and namespace version counters
//!
//! A key is `{namespace}:{hash}:v{version}`. The hash covers the request
//! parameters serialized with object keys sorted, so parameter order never
//! matters. Bumping a namespace's version makes every previously built key
//! for that namespace unreachable without enumerating it.
//!
//! Entity lookups use the readable form `entity:{id}:v{version}` so a single
//! entity can be deleted directly.

use parking_lot::RwLock;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::cache_config::ContentTier;
use super::errors::{CacheError, CacheResult};

/// Version every namespace starts at
pub const INITIAL_VERSION: u64 = 1;

/// Monotonic per-namespace version counters
#[derive(Debug, Default)]
pub struct VersionCounters {
    counters: RwLock<HashMap<String, Arc<AtomicU64>>>,
}

impl VersionCounters {
    pub fn new() -> Self {
        Self::default()
    }

    fn counter(&self, namespace: &str) -> Arc<AtomicU64> {
        if let Some(counter) = self.counters.read().get(namespace) {
            return counter.clone();
        }
        self.counters
            .write()
            .entry(namespace.to_string())
            .or_insert_with(|| Arc::new(AtomicU64::new(INITIAL_VERSION)))
            .clone()
    }

    pub fn current(&self, namespace: &str) -> u64 {
        self.counter(namespace).load(Ordering::SeqCst)
    }

    /// Increment and return the new version
    pub fn bump(&self, namespace: &str) -> u64 {
        self.counter(namespace).fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Raise the counter to at least `version`; returns the resulting value
    pub fn observe(&self, namespace: &str, version: u64) -> u64 {
        let previous = self.counter(namespace).fetch_max(version, Ordering::SeqCst);
        previous.max(version)
    }

    /// Namespaces that have been read or bumped, sorted
    pub fn namespaces(&self) -> Vec<String> {
        let mut names: Vec<String> = self.counters.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn snapshot(&self) -> HashMap<String, u64> {
        self.counters
            .read()
            .iter()
            .map(|(ns, c)| (ns.clone(), c.load(Ordering::SeqCst)))
            .collect()
    }
}

/// Builds namespaced, versioned cache keys
#[derive(Debug, Clone)]
pub struct CacheKeyBuilder {
    versions: Arc<VersionCounters>,
}

impl CacheKeyBuilder {
    pub fn new(versions: Arc<VersionCounters>) -> Self {
        Self { versions }
    }

    pub fn versions(&self) -> &Arc<VersionCounters> {
        &self.versions
    }

    /// Key for a JSON parameter object
    pub fn build(&self, namespace: &str, params: &Value) -> String {
        let version = self.versions.current(namespace);
        format!("{}:{}:v{}", namespace, params_hash(params), version)
    }

    /// Key for any serializable parameter struct
    pub fn build_for<T: Serialize>(&self, namespace: &str, params: &T) -> CacheResult<String> {
        let value =
            serde_json::to_value(params).map_err(|e| CacheError::Serialization(e.to_string()))?;
        Ok(self.build(namespace, &value))
    }

    /// Direct key for one entity
    pub fn entity_key(&self, id: &str) -> String {
        let namespace = ContentTier::Entity.namespace();
        format!("{}:{}:v{}", namespace, id, self.versions.current(namespace))
    }
}

/// Fixed-width base36 crc32 of the canonical serialization
pub fn params_hash(params: &Value) -> String {
    let mut canonical = String::new();
    write_canonical(params, &mut canonical);
    base36(crc32fast::hash(canonical.as_bytes()) as u64, 7)
}

/// JSON with object keys sorted at every depth
pub fn canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_canonical(value, &mut out);
    out
}

fn write_canonical(value: &Value, out: &mut String) {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            out.push('{');
            for (i, (key, value)) in entries.into_iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(&Value::String(key.clone()).to_string());
                out.push(':');
                write_canonical(value, out);
            }
            out.push('}');
        }
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                write_canonical(item, out);
            }
            out.push(']');
        }
        scalar => out.push_str(&scalar.to_string()),
    }
}

fn base36(mut n: u64, width: usize) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut buf = Vec::with_capacity(width);
    while n > 0 {
        buf.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    while buf.len() < width {
        buf.push(b'0');
    }
    buf.reverse();
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn builder() -> CacheKeyBuilder {
        CacheKeyBuilder::new(Arc::new(VersionCounters::new()))
    }

    #[test]
    fn test_key_is_order_independent() {
        let b = builder();
        let a = b.build("search", &json!({"q": "shoe", "page": 1}));
        let c = b.build("search", &json!({"page": 1, "q": "shoe"}));
        assert_eq!(a, c);
        assert!(a.starts_with("search:"));
        assert!(a.ends_with(":v1"));
    }

    #[test]
    fn test_any_parameter_change_changes_key() {
        let b = builder();
        let base = b.build("search", &json!({"q": "shoe", "page": 1}));
        assert_ne!(base, b.build("search", &json!({"q": "shoe", "page": 2})));
        assert_ne!(base, b.build("search", &json!({"q": "shoes", "page": 1})));
        assert_ne!(base, b.build("listing", &json!({"q": "shoe", "page": 1})));
    }

    #[test]
    fn test_version_bump_changes_key() {
        let b = builder();
        let params = json!({"q": "shoe"});
        let before = b.build("search", &params);
        assert_eq!(b.versions().bump("search"), 2);
        let after = b.build("search", &params);
        assert_ne!(before, after);
        assert!(after.ends_with(":v2"));
        assert_eq!(before.split(':').nth(1), after.split(':').nth(1));
    }

    #[test]
    fn test_nested_objects_are_canonicalized() {
        let a = json!({"f": {"b": 1, "a": [{"y": 1, "x": 2}]}, "z": null});
        let c = json!({"z": null, "f": {"a": [{"x": 2, "y": 1}], "b": 1}});
        assert_eq!(canonical_json(&a), canonical_json(&c));
        assert_eq!(canonical_json(&json!({"b": 1, "a": "x"})), r#"{"a":"x","b":1}"#);
    }

    #[test]
    fn test_hash_is_fixed_width() {
        assert_eq!(params_hash(&json!({})).len(), 7);
        assert_eq!(base36(0, 7), "0000000");
        assert_eq!(base36(35, 2), "0z");
        assert_eq!(base36(u32::MAX as u64, 7), "1z141z3");
    }

    #[test]
    fn test_entity_key_and_observe() {
        let b = builder();
        assert_eq!(b.entity_key("p1"), "entity:p1:v1");
        assert_eq!(b.versions().observe("entity", 5), 5);
        assert_eq!(b.versions().observe("entity", 3), 5);
        assert_eq!(b.entity_key("p1"), "entity:p1:v5");
        assert_eq!(b.versions().namespaces(), vec!["entity".to_string()]);
    }
}
