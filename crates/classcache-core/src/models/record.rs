//! The `Record` abstraction shared by every table.
//!
//! The engine stores records as JSON values and only ever looks at the `id`
//! field. Typed models implement [`Record`] so callers get structs back, while
//! `serde_json::Value` implements it for fully dynamic use.

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;

/// A row in one of the cached tables.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Primary key, if the record carries a non-empty one.
    fn id(&self) -> Option<String>;
}

impl Record for Value {
    fn id(&self) -> Option<String> {
        record_id(self)
    }
}

/// Extract the primary key of a JSON record.
///
/// Spreadsheet backends hand numeric ids back as numbers, so those are
/// accepted and compared by their decimal form. Empty strings count as absent.
pub fn record_id(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Set the `id` field of a JSON record. Returns false for non-object values.
pub fn assign_id(value: &mut Value, id: &str) -> bool {
    match value.as_object_mut() {
        Some(map) => {
            map.insert("id".to_string(), Value::String(id.to_string()));
            true
        }
        None => false,
    }
}

/// Deserialize an id that may arrive as a string, a number, or blank.
/// Anything else reads as no id, the same way [`record_id`] sees it.
pub(crate) fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Deserialize a free-text field that a sheet may have turned into a number
/// or boolean. Nested values are kept as their JSON text.
pub(crate) fn deserialize_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    Ok(match Value::deserialize(deserializer)? {
        Value::Null => None,
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    })
}

/// Like [`deserialize_text`] for fields that default to an empty string.
pub(crate) fn deserialize_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(deserialize_text(deserializer)?.unwrap_or_default())
}

/// Deserialize a numeric field that may arrive as a number or as text.
/// Blank or non-numeric text reads as no value.
pub(crate) fn deserialize_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', ".").parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_id_variants() {
        assert_eq!(record_id(&json!({"id": "std_1"})), Some("std_1".to_string()));
        assert_eq!(record_id(&json!({"id": 42})), Some("42".to_string()));
        assert_eq!(record_id(&json!({"id": ""})), None);
        assert_eq!(record_id(&json!({"id": null})), None);
        assert_eq!(record_id(&json!({"name": "Ana"})), None);
        assert_eq!(record_id(&json!("not an object")), None);
    }

    #[test]
    fn test_assign_id() {
        let mut value = json!({"name": "Ana"});
        assert!(assign_id(&mut value, "std_x"));
        assert_eq!(value["id"], "std_x");

        let mut scalar = json!(3);
        assert!(!assign_id(&mut scalar, "std_y"));
    }

    #[derive(serde::Deserialize)]
    struct Row {
        #[serde(default, deserialize_with = "deserialize_name")]
        name: String,
        #[serde(default, deserialize_with = "deserialize_text")]
        code: Option<String>,
        #[serde(default, deserialize_with = "deserialize_number")]
        score: Option<f64>,
    }

    #[test]
    fn test_lenient_fields_accept_sheet_values() {
        let row: Row = serde_json::from_value(json!({"name": 42, "code": 1234, "score": "9,5"})).unwrap();
        assert_eq!(row.name, "42");
        assert_eq!(row.code.as_deref(), Some("1234"));
        assert_eq!(row.score, Some(9.5));

        let row: Row = serde_json::from_value(json!({"name": null, "code": true, "score": "n/a"})).unwrap();
        assert_eq!(row.name, "");
        assert_eq!(row.code.as_deref(), Some("true"));
        assert_eq!(row.score, None);

        let row: Row = serde_json::from_value(json!({"score": ""})).unwrap();
        assert_eq!(row.code, None);
        assert_eq!(row.score, None);
    }
}
