use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::{deserialize_id, deserialize_name, deserialize_number, deserialize_text, Record};

/// A learning material published to students (worksheet, reading, video link).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Material {
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_name")]
    pub title: String,
    #[serde(default, deserialize_with = "deserialize_text", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub grade: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attachment encoded by the front end as a data URL.
    #[serde(
        rename = "fileData",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub file_data: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Material {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }
}

/// A student's answer to a material.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    #[serde(default, deserialize_with = "deserialize_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(
        rename = "studentId",
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub student_id: Option<String>,
    #[serde(
        rename = "materialId",
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub material_id: Option<String>,
    #[serde(default, deserialize_with = "deserialize_text", skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, deserialize_with = "deserialize_number", skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "deserialize_text", skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(
        rename = "submittedAt",
        default,
        deserialize_with = "deserialize_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub submitted_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Submission {
    fn id(&self) -> Option<String> {
        self.id.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_submission_sheet_values() {
        let raw = json!({"id": "sub_1", "studentId": 12, "materialId": "mat_a", "score": "9.5"});
        let submission: Submission = serde_json::from_value(raw).unwrap();
        assert_eq!(submission.student_id.as_deref(), Some("12"));
        assert_eq!(submission.material_id.as_deref(), Some("mat_a"));
        assert_eq!(submission.score, Some(9.5));
    }

    #[test]
    fn test_ungraded_submission_round_trip_adds_no_keys() {
        let raw = json!({"id": "sub_2", "answer": "42"});
        let submission: Submission = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&submission).unwrap(), raw);
    }

    #[test]
    fn test_material_numeric_title() {
        let material: Material = serde_json::from_value(json!({"id": "mat_1", "title": 1984})).unwrap();
        assert_eq!(material.title, "1984");
        assert_eq!(material.file_data, None);
    }
}
