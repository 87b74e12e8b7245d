//! Record snapshots.

use crate::op::{OpError, Operation};
use crate::RecordId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The full field state of a record at some version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordSnapshot {
    #[serde(rename = "_id")]
    pub id: RecordId,
    /// Incremented once per applied operation list.
    #[serde(default)]
    pub version: u64,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl RecordSnapshot {
    pub fn new(id: RecordId, fields: Map<String, Value>) -> Self {
        Self {
            id,
            version: 0,
            fields,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }

    /// Apply an operation list, returning the changed keys in order.
    ///
    /// The list is applied atomically: on error the snapshot is unchanged.
    pub fn apply(&mut self, ops: &[Operation]) -> Result<Vec<String>, OpError> {
        let mut fields = self.fields.clone();
        let mut keys = Vec::with_capacity(ops.len());
        for op in ops {
            let key = op.apply(&mut fields)?;
            if !keys.contains(&key) {
                keys.push(key);
            }
        }
        self.fields = fields;
        self.version += 1;
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn snapshot() -> RecordSnapshot {
        let mut fields = Map::new();
        fields.insert("name".into(), json!("Acme"));
        fields.insert("visible".into(), json!(true));
        RecordSnapshot::new(RecordId::from("c1"), fields)
    }

    #[test]
    fn typed_accessors() {
        let s = snapshot();
        assert_eq!(s.str_field("name"), Some("Acme"));
        assert_eq!(s.bool_field("visible"), Some(true));
        assert_eq!(s.str_field("visible"), None);
        assert!(s.get("missing").is_none());
    }

    #[test]
    fn apply_is_atomic() {
        let mut s = snapshot();
        let ops = vec![
            Operation::replace_field("name", json!("Bravo")),
            Operation {
                path: vec!["a".into(), "b".into()],
                old_value: Value::Null,
                new_value: json!(1),
            },
        ];
        assert!(s.apply(&ops).is_err());
        assert_eq!(s.str_field("name"), Some("Acme"));
        assert_eq!(s.version, 0);
    }

    #[test]
    fn apply_reports_distinct_keys_and_bumps_version() {
        let mut s = snapshot();
        let keys = s
            .apply(&[
                Operation::replace_field("name", json!("B")),
                Operation::replace_field("name", json!("C")),
                Operation::replace_field("visible", json!(false)),
            ])
            .unwrap();
        assert_eq!(keys, vec!["name".to_string(), "visible".to_string()]);
        assert_eq!(s.str_field("name"), Some("C"));
        assert_eq!(s.version, 1);
    }

    #[test]
    fn serializes_with_flattened_fields() {
        let encoded = serde_json::to_value(snapshot()).unwrap();
        assert_eq!(encoded["_id"], json!("c1"));
        assert_eq!(encoded["name"], json!("Acme"));
    }
}
