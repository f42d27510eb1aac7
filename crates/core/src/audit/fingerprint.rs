//! Content fingerprinting for audit records.

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::audit::types::AuditRecordContent;

/// Serializes a JSON value with all object keys sorted recursively.
///
/// Fingerprints must survive a round-trip through storage that does not
/// preserve object key order, so the canonical form is order-free.
#[must_use]
pub fn canonical_json(value: &Value) -> String {
    fn sort(value: &Value) -> Value {
        match value {
            Value::Object(map) => {
                let mut sorted = Map::new();
                let mut keys: Vec<&String> = map.keys().collect();
                keys.sort();
                for key in keys {
                    if let Some(v) = map.get(key) {
                        sorted.insert(key.clone(), sort(v));
                    }
                }
                Value::Object(sorted)
            }
            Value::Array(items) => Value::Array(items.iter().map(sort).collect()),
            other => other.clone(),
        }
    }
    sort(value).to_string()
}

/// Computes the hex-encoded SHA-256 fingerprint of an audit record's
/// content.
#[must_use]
pub fn compute_fingerprint(content: &AuditRecordContent) -> String {
    let value = serde_json::to_value(content).unwrap_or(Value::Null);
    let canonical = canonical_json(&value);
    let digest = Sha256::digest(canonical.as_bytes());
    format!("{digest:x}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::types::AuditAction;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn test_canonical_json_sorts_keys_recursively() {
        let a = json!({"b": 1, "a": {"z": true, "y": [{"n": 2, "m": 3}]}});
        let b = json!({"a": {"y": [{"m": 3, "n": 2}], "z": true}, "b": 1});
        assert_eq!(canonical_json(&a), canonical_json(&b));
        assert_eq!(
            canonical_json(&a),
            r#"{"a":{"y":[{"m":3,"n":2}],"z":true},"b":1}"#
        );
    }

    #[test]
    fn test_canonical_json_preserves_array_order() {
        let a = json!([1, 2, 3]);
        let b = json!([3, 2, 1]);
        assert_ne!(canonical_json(&a), canonical_json(&b));
    }

    #[test]
    fn test_fingerprint_is_stable_and_hex() {
        let content = AuditRecordContent {
            entity_type: "voucher".to_string(),
            entity_id: "x".to_string(),
            action: AuditAction::Create,
            actor: "a".to_string(),
            reason: None,
            before: None,
            after: Some(json!({"k": "v"})),
            changed_fields: vec![],
            occurred_at: Utc::now(),
        };
        let f1 = compute_fingerprint(&content);
        let f2 = compute_fingerprint(&content);
        assert_eq!(f1, f2);
        assert_eq!(f1.len(), 64);
        assert!(f1.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_fingerprint_changes_with_content() {
        let mut content = AuditRecordContent {
            entity_type: "voucher".to_string(),
            entity_id: "x".to_string(),
            action: AuditAction::Create,
            actor: "a".to_string(),
            reason: None,
            before: None,
            after: Some(json!({"k": "v"})),
            changed_fields: vec![],
            occurred_at: Utc::now(),
        };
        let original = compute_fingerprint(&content);
        content.actor = "b".to_string();
        assert_ne!(compute_fingerprint(&content), original);
    }
}
