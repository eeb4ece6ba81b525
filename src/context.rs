//! Dynamic data source - host-supplied ambient values (v0.1)
//!
//! The host pipeline exposes ambient names (workflow variables, execution
//! metadata) to scripts through a per-record-index lookup. The engine does
//! not own this data; it obtains a fresh proxy per iteration and reads it
//! through the scope resolver, after the binding set.

use rustc_hash::FxHashMap;
use serde_json::Value;

/// Read-only ambient lookup scoped to one record index
#[derive(Debug, Clone, Default)]
pub struct DataProxy {
    entries: FxHashMap<String, Value>,
}

impl DataProxy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: FxHashMap<String, Value>) -> Self {
        Self { entries }
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Capability for obtaining ambient values scoped to a record index.
///
/// Owned by the host, not the engine; the engine calls it once per
/// iteration and never caches the result across iterations.
pub trait DataProxySource {
    fn data_proxy(&self, index: usize) -> DataProxy;
}

/// Source with no ambient names (standalone runs)
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyProxySource;

impl DataProxySource for EmptyProxySource {
    fn data_proxy(&self, _index: usize) -> DataProxy {
        DataProxy::new()
    }
}

/// Same ambient names for every record index
#[derive(Debug, Clone, Default)]
pub struct StaticProxySource {
    entries: FxHashMap<String, Value>,
}

impl StaticProxySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.entries.insert(name.into(), value);
    }
}

impl DataProxySource for StaticProxySource {
    fn data_proxy(&self, _index: usize) -> DataProxy {
        DataProxy::from_entries(self.entries.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn set_and_get() {
        let mut proxy = DataProxy::new();
        assert!(proxy.is_empty());

        proxy.set("greeting", json!("hello"));
        assert_eq!(proxy.get("greeting"), Some(&json!("hello")));
        assert_eq!(proxy.get("unknown"), None);
    }

    #[test]
    fn empty_source_yields_empty_proxies() {
        let source = EmptyProxySource;
        assert!(source.data_proxy(0).is_empty());
        assert!(source.data_proxy(42).is_empty());
    }

    #[test]
    fn static_source_is_index_independent() {
        let mut source = StaticProxySource::new();
        source.set("env", json!({"stage": "test"}));

        for index in [0, 1, 7] {
            let proxy = source.data_proxy(index);
            assert_eq!(proxy.get("env"), Some(&json!({"stage": "test"})));
        }
    }
}
