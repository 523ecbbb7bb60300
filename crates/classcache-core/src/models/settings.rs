use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::{deserialize_id, deserialize_text, Record};

/// Fixed id every settings write is coerced to.
pub const SETTINGS_ID: &str = "settings";

/// School-wide preferences. Only one logical row ever exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "schoolName",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub school_name: Option<String>,
    #[serde(
        rename = "academicYear",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub academic_year: Option<String>,
    /// Name printed on certificates.
    #[serde(
        rename = "principalName",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub principal_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Settings {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }
}
