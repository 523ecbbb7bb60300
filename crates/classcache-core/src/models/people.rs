use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::{deserialize_id, deserialize_name, deserialize_text, Record};

/// Staff account (teacher, coordinator, administrator).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_name")]
    pub name: String,
    #[serde(default, deserialize_with = "deserialize_text", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text", skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for User {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Student {
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_name")]
    pub name: String,
    // Sheets return grades as either "3" or 3
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(
        rename = "accessCode",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub access_code: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Student {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }
}

impl Student {
    pub fn new(name: impl Into<String>, grade: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            grade: Some(grade.into()),
            ..Default::default()
        }
    }
}

/// The identity currently signed in on this device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "identity", rename_all = "lowercase")]
pub enum Session {
    Staff(User),
    Student(Student),
}

impl Session {
    pub fn display_name(&self) -> &str {
        match self {
            Session::Staff(user) => &user.name,
            Session::Student(student) => &student.name,
        }
    }
}
