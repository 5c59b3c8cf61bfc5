//! JSON text codec for persisted record values.
//!
//! `serde_json::Map` keeps keys sorted, so equal values always encode to
//! identical text and repeated upserts write byte-identical rows.

use serde_json::Value;

use crate::error::{StoreError, StoreResult};

/// Encode a record value as JSON text.
pub fn encode(value: &Value) -> StoreResult<String> {
    serde_json::to_string(value).map_err(StoreError::Encode)
}

/// Decode the stored text of record `key`.
///
/// Failures keep both the key and the raw text.
pub fn decode(key: &str, raw: &str) -> StoreResult<Value> {
    serde_json::from_str(raw).map_err(|source| StoreError::Serialization {
        key: key.to_string(),
        raw: raw.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn encoding_is_deterministic() {
        let a = json!({"b": 1, "a": [1, 2], "c": {"z": null, "y": "s"}});
        let b = json!({"c": {"y": "s", "z": null}, "a": [1, 2], "b": 1});
        assert_eq!(encode(&a).unwrap(), encode(&b).unwrap());
    }

    #[test]
    fn decode_scalar_text() {
        assert_eq!(decode("k", "\"\"").unwrap(), json!(""));
        assert_eq!(decode("k", "33").unwrap(), json!(33));
    }

    #[test]
    fn decode_failure_keeps_key_and_raw() {
        let err = decode("user", "{not json").unwrap_err();
        match err {
            StoreError::Serialization { key, raw, .. } => {
                assert_eq!(key, "user");
                assert_eq!(raw, "{not json");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
