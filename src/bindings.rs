//! Binding set - names made directly visible to user script code (v0.1)
//!
//! Built fresh for every invocation of the compiled script and discarded
//! afterwards, so no record data leaks across iterations. Entries shadow
//! both the host's ambient data and the interpreter's own environment.
//!
//! Uses FxHashMap for faster hashing on small string keys.

use rhai::Dynamic;
use rustc_hash::FxHashMap;

use crate::error::{ItemTag, ScriptError};
use crate::modules::{ConsoleModule, JsonCodec};
use crate::openai::ScriptClient;
use crate::record::Record;

/// Name → value map for one script invocation
#[derive(Clone)]
pub struct BindingSet {
    entries: FxHashMap<String, Dynamic>,
}

impl BindingSet {
    /// Bindings for a batch invocation: `input` and `item` are both the
    /// full record sequence.
    pub fn for_batch(client: &ScriptClient, records: &[Record]) -> Result<Self, ScriptError> {
        Self::assemble(client, records, None, ItemTag::batch())
    }

    /// Bindings for one per-record iteration: `input` is the full sequence,
    /// `item` is the record at `index`.
    pub fn for_record(
        client: &ScriptClient,
        records: &[Record],
        index: usize,
    ) -> Result<Self, ScriptError> {
        Self::assemble(client, records, Some(index), ItemTag::item(index))
    }

    fn assemble(
        client: &ScriptClient,
        records: &[Record],
        current: Option<usize>,
        tag: ItemTag,
    ) -> Result<Self, ScriptError> {
        let expose = |e: Box<rhai::EvalAltResult>| ScriptError::Runtime {
            message: format!("Failed to expose records to the script: {}", e),
            tag,
        };

        let input = rhai::serde::to_dynamic(records).map_err(expose)?;
        let item = match current {
            Some(index) => rhai::serde::to_dynamic(&records[index]).map_err(expose)?,
            None => input.clone(),
        };

        let mut entries = FxHashMap::default();
        // The client under both its ergonomic aliases
        entries.insert("openai".to_string(), Dynamic::from(client.clone()));
        entries.insert("client".to_string(), Dynamic::from(client.clone()));
        entries.insert("input".to_string(), input);
        entries.insert("item".to_string(), item);
        entries.insert("console".to_string(), Dynamic::from(ConsoleModule));
        entries.insert("JSON".to_string(), Dynamic::from(JsonCodec));

        Ok(Self { entries })
    }

    pub fn get(&self, name: &str) -> Option<&Dynamic> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Host extension point: expose an extra name to the script
    pub fn set(&mut self, name: impl Into<String>, value: Dynamic) {
        self.entries.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openai::MockChatBackend;
    use serde_json::json;
    use std::sync::Arc;
    use tokio::runtime::Handle;

    fn client() -> ScriptClient {
        ScriptClient::new(Arc::new(MockChatBackend::new("ok")), Handle::current())
    }

    fn records() -> Vec<Record> {
        vec![
            Record::new(json!({"index": 0})),
            Record::new(json!({"index": 1})),
        ]
    }

    #[tokio::test]
    async fn batch_bindings_expose_documented_surface() {
        let bindings = BindingSet::for_batch(&client(), &records()).unwrap();

        for name in ["openai", "client", "input", "item", "console", "JSON"] {
            assert!(bindings.contains(name), "missing binding {}", name);
        }
        assert!(!bindings.contains("require")); // function namespace, not a value
    }

    #[tokio::test]
    async fn batch_input_and_item_are_the_full_sequence() {
        let bindings = BindingSet::for_batch(&client(), &records()).unwrap();

        let input = bindings.get("input").unwrap().clone().into_array().unwrap();
        let item = bindings.get("item").unwrap().clone().into_array().unwrap();
        assert_eq!(input.len(), 2);
        assert_eq!(item.len(), 2);
    }

    #[tokio::test]
    async fn per_record_item_is_the_current_record() {
        let bindings = BindingSet::for_record(&client(), &records(), 1).unwrap();

        let input = bindings.get("input").unwrap().clone().into_array().unwrap();
        assert_eq!(input.len(), 2);

        let item: serde_json::Value =
            rhai::serde::from_dynamic(bindings.get("item").unwrap()).unwrap();
        assert_eq!(item, json!({"json": {"index": 1}}));
    }

    #[tokio::test]
    async fn host_can_extend_the_set() {
        let mut bindings = BindingSet::for_batch(&client(), &[]).unwrap();
        bindings.set("extra", Dynamic::from(7_i64));
        assert!(bindings.contains("extra"));
    }
}
