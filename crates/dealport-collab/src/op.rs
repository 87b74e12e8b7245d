//! Field-level operations.
//!
//! An [`Operation`] replaces one top-level field of a record. Lists of
//! operations are submitted atomically per record.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while applying an operation to a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("operation path is empty")]
    EmptyPath,

    #[error("nested operation paths are not supported: {0}")]
    NestedPath(String),
}

/// A single-field change descriptor in json0 shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Path to the changed field. Only single-segment paths are produced.
    #[serde(rename = "p")]
    pub path: Vec<String>,

    /// Value the field is claimed to have had before the change.
    #[serde(rename = "od")]
    pub old_value: Value,

    /// Value the field has after the change.
    #[serde(rename = "oi")]
    pub new_value: Value,
}

impl Operation {
    /// Build a replacement of `field` with `new_value`.
    ///
    /// The true previous value is not known to the caller, so `old_value` is
    /// the empty value of the new value's JSON type (see
    /// [`placeholder_old_value`]). This is an approximation: the merge layer
    /// sees a misleading `od` whenever the field was not empty before.
    pub fn replace_field(field: impl Into<String>, new_value: Value) -> Self {
        Self {
            path: vec![field.into()],
            old_value: placeholder_old_value(&new_value),
            new_value,
        }
    }

    /// Build a replacement carrying the real previous value.
    pub fn replace_field_from(field: impl Into<String>, old_value: Value, new_value: Value) -> Self {
        Self {
            path: vec![field.into()],
            old_value,
            new_value,
        }
    }

    /// The top-level field this operation touches.
    pub fn field(&self) -> Option<&str> {
        self.path.first().map(String::as_str)
    }

    /// Apply this operation to a field map, returning the changed key.
    pub fn apply(&self, fields: &mut Map<String, Value>) -> Result<String, OpError> {
        match self.path.as_slice() {
            [] => Err(OpError::EmptyPath),
            [key] => {
                fields.insert(key.clone(), self.new_value.clone());
                Ok(key.clone())
            }
            _ => Err(OpError::NestedPath(self.path.join("."))),
        }
    }
}

/// The "empty" value of the same JSON type as `value`.
///
/// boolean → `false`, string → `""`, number → `0`, array → `[]`,
/// null → `null`, object → `{}`.
pub fn placeholder_old_value(value: &Value) -> Value {
    match value {
        Value::Bool(_) => Value::Bool(false),
        Value::String(_) => Value::String(String::new()),
        Value::Number(_) => Value::from(0),
        Value::Array(_) => Value::Array(Vec::new()),
        Value::Null => Value::Null,
        Value::Object(_) => Value::Object(Map::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn placeholder_matches_type_tag() {
        assert_eq!(placeholder_old_value(&json!(true)), json!(false));
        assert_eq!(placeholder_old_value(&json!("Acme")), json!(""));
        assert_eq!(placeholder_old_value(&json!(42.5)), json!(0));
        assert_eq!(placeholder_old_value(&json!([1, 2])), json!([]));
        assert_eq!(placeholder_old_value(&Value::Null), Value::Null);
        assert_eq!(placeholder_old_value(&json!({"a": 1})), json!({}));
    }

    #[test]
    fn replace_field_uses_placeholder_even_when_previous_value_differs() {
        let op = Operation::replace_field("visible", json!(false));
        // The previous value may well have been `true`; the placeholder is still `false`.
        assert_eq!(op.old_value, json!(false));
        assert_eq!(op.new_value, json!(false));
        assert_eq!(op.field(), Some("visible"));
    }

    #[test]
    fn serializes_in_json0_shape() {
        let op = Operation::replace_field("name", json!("Acme"));
        let encoded = serde_json::to_value(&op).unwrap();
        assert_eq!(encoded, json!({"p": ["name"], "od": "", "oi": "Acme"}));
    }

    #[test]
    fn apply_replaces_top_level_field() {
        let mut fields = Map::new();
        fields.insert("name".into(), json!("Old"));
        let key = Operation::replace_field("name", json!("New"))
            .apply(&mut fields)
            .unwrap();
        assert_eq!(key, "name");
        assert_eq!(fields["name"], json!("New"));
    }

    #[test]
    fn apply_rejects_nested_and_empty_paths() {
        let mut fields = Map::new();
        let nested = Operation {
            path: vec!["a".into(), "b".into()],
            old_value: Value::Null,
            new_value: json!(1),
        };
        assert_eq!(nested.apply(&mut fields), Err(OpError::NestedPath("a.b".into())));

        let empty = Operation {
            path: vec![],
            old_value: Value::Null,
            new_value: json!(1),
        };
        assert_eq!(empty.apply(&mut fields), Err(OpError::EmptyPath));
        assert!(fields.is_empty());
    }
}
