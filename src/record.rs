//! Pipeline records

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One structured unit of pipeline data.
///
/// Records arrive and leave as ordered sequences; order is significant and
/// is preserved by every stage of the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub json: Value,
}

impl Record {
    pub fn new(json: Value) -> Self {
        Self { json }
    }
}

impl From<Value> for Record {
    fn from(json: Value) -> Self {
        Self::new(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_json_envelope() {
        let record = Record::new(json!({"index": 0}));
        let text = serde_json::to_string(&record).unwrap();
        assert_eq!(text, r#"{"json":{"index":0}}"#);
    }

    #[test]
    fn round_trips_through_serde() {
        let record = Record::new(json!({"name": "a", "n": 1}));
        let text = serde_json::to_string(&record).unwrap();
        let back: Record = serde_json::from_str(&text).unwrap();
        assert_eq!(back, record);
    }
}
