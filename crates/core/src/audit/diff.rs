//! Field-level diffing of entity snapshots.

use serde_json::Value;
use std::collections::BTreeSet;

/// Returns the sorted list of top-level fields that differ between two
/// entity snapshots.
///
/// A field present in only one snapshot counts as changed. Non-object
/// snapshots compare as a single unnamed field.
#[must_use]
pub fn changed_fields(before: &Value, after: &Value) -> Vec<String> {
    match (before, after) {
        (Value::Object(b), Value::Object(a)) => {
            let keys: BTreeSet<&String> = b.keys().chain(a.keys()).collect();
            keys.into_iter()
                .filter(|key| b.get(*key) != a.get(*key))
                .cloned()
                .collect()
        }
        (b, a) if b == a => vec![],
        _ => vec!["value".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_identical_snapshots_have_no_changes() {
        let snap = json!({"doc_no": "GL-001", "amount": "100"});
        assert!(changed_fields(&snap, &snap).is_empty());
    }

    #[test]
    fn test_changed_value_reported() {
        let before = json!({"doc_no": "GL-001", "amount": "100"});
        let after = json!({"doc_no": "GL-001", "amount": "250"});
        assert_eq!(changed_fields(&before, &after), vec!["amount"]);
    }

    #[test]
    fn test_added_and_removed_fields_reported_sorted() {
        let before = json!({"doc_no": "GL-001", "zone": "north"});
        let after = json!({"doc_no": "GL-001", "amount": "250"});
        assert_eq!(changed_fields(&before, &after), vec!["amount", "zone"]);
    }

    #[test]
    fn test_nested_change_reported_at_top_level() {
        let before = json!({"lines": [{"amount": "1"}]});
        let after = json!({"lines": [{"amount": "2"}]});
        assert_eq!(changed_fields(&before, &after), vec!["lines"]);
    }
}
