//! Output normalizer - coerce script return values into records (v0.1)
//!
//! A successful iteration may return a single object or a sequence of
//! objects; both coerce into an ordered record sequence. Values with no
//! record shape fail with a fixed message so script internals never leak
//! into pipeline errors.

use serde_json::Value;

use crate::error::{ItemTag, ScriptError};
use crate::record::Record;

/// Coerce one iteration's return value into records, in order
pub fn normalize(value: Value, tag: ItemTag) -> Result<Vec<Record>, ScriptError> {
    match value {
        Value::Array(elements) => elements
            .into_iter()
            .map(|element| wrap(element, tag))
            .collect(),
        other => Ok(vec![wrap(other, tag)?]),
    }
}

fn wrap(value: Value, tag: ItemTag) -> Result<Record, ScriptError> {
    let Value::Object(mut fields) = value else {
        return Err(ScriptError::Normalize { tag });
    };

    // A value already in record shape passes through unwrapped
    if fields.get("json").is_some_and(Value::is_object) {
        return Ok(Record::new(fields.remove("json").unwrap_or(Value::Null)));
    }

    Ok(Record::new(Value::Object(fields)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_becomes_one_record() {
        let records = normalize(json!({"ok": true}), ItemTag::batch()).unwrap();
        assert_eq!(records, vec![Record::new(json!({"ok": true}))]);
    }

    #[test]
    fn array_becomes_n_records_in_order() {
        let records = normalize(json!([{"i": 0}, {"i": 1}, {"i": 2}]), ItemTag::batch()).unwrap();
        assert_eq!(records.len(), 3);
        for (i, record) in records.iter().enumerate() {
            assert_eq!(record.json, json!({"i": i}));
        }
    }

    #[test]
    fn empty_array_yields_no_records() {
        let records = normalize(json!([]), ItemTag::batch()).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn record_shaped_values_pass_through() {
        let records = normalize(json!([{"json": {"a": 1}}]), ItemTag::batch()).unwrap();
        assert_eq!(records, vec![Record::new(json!({"a": 1}))]);
    }

    #[test]
    fn json_field_that_is_not_an_object_is_plain_data() {
        let records = normalize(json!({"json": 5}), ItemTag::batch()).unwrap();
        assert_eq!(records, vec![Record::new(json!({"json": 5}))]);
    }

    #[test]
    fn primitives_are_not_convertible() {
        for value in [json!(42), json!("text"), json!(true), json!(null)] {
            let err = normalize(value, ItemTag::item(2)).unwrap_err();
            assert!(matches!(err, ScriptError::Normalize { .. }));
            assert_eq!(err.item_index(), Some(2));
            assert!(err.to_string().contains("could not be converted"));
        }
    }

    #[test]
    fn primitive_array_elements_are_not_convertible() {
        let err = normalize(json!([{"a": 1}, 2]), ItemTag::batch()).unwrap_err();
        assert!(matches!(err, ScriptError::Normalize { .. }));
    }
}
