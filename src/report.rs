//! Redaction report: which fields were kept and which were removed.
//!
//! The report records intent. It is built from the selection, not from what
//! the output format could actually carry.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::fields::{FieldKey, SelectionMap};

/// Provenance document written next to a cleaned image.
///
/// Serializes as:
///
/// ```json
/// {
///   "sourceFile": "photo.jpg",
///   "keptFields": ["primary:Make"],
///   "removedFields": ["location:GPSLatitude"],
///   "time": "2024-05-01T12:00:00.000Z"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedactionReport {
    pub source_file: Option<String>,
    pub kept_fields: Vec<String>,
    pub removed_fields: Vec<String>,
    pub time: String,
}

impl RedactionReport {
    /// Report for `selection`, stamped with the current time.
    pub fn new(source_file: Option<&str>, selection: &SelectionMap) -> Self {
        Self::at(source_file, selection, Utc::now())
    }

    pub fn at(source_file: Option<&str>, selection: &SelectionMap, time: DateTime<Utc>) -> Self {
        let keys = |list: Vec<&FieldKey>| -> Vec<String> { list.iter().map(|k| k.to_string()).collect() };
        Self {
            source_file: source_file.map(str::to_string),
            kept_fields: keys(selection.kept_keys()),
            removed_fields: keys(selection.removed_keys()),
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    /// Build from explicit key lists, preserving their order.
    pub fn from_lists(
        source_file: Option<&str>,
        kept_fields: Vec<String>,
        removed_fields: Vec<String>,
        time: DateTime<Utc>,
    ) -> Self {
        Self {
            source_file: source_file.map(str::to_string),
            kept_fields,
            removed_fields,
            time: time.to_rfc3339_opts(SecondsFormat::Millis, true),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn selection() -> SelectionMap {
        [
            ("primary:Make".parse().unwrap(), false),
            ("location:GPSLatitude".parse().unwrap(), true),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn lists_follow_selection() {
        let report = RedactionReport::at(Some("photo.jpg"), &selection(), noon());
        assert_eq!(report.source_file.as_deref(), Some("photo.jpg"));
        assert_eq!(report.kept_fields, vec!["primary:Make"]);
        assert_eq!(report.removed_fields, vec!["location:GPSLatitude"]);
        assert_eq!(report.time, "2024-05-01T12:00:00.000Z");
    }

    #[test]
    fn document_shape() {
        let report = RedactionReport::from_lists(
            Some("photo.jpg"),
            vec!["primary:Make".into()],
            vec!["location:GPSLatitude".into()],
            noon(),
        );
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        let obj = value.as_object().unwrap();

        assert_eq!(obj.len(), 4);
        assert_eq!(obj["sourceFile"], "photo.jpg");
        assert_eq!(obj["keptFields"], serde_json::json!(["primary:Make"]));
        assert_eq!(obj["removedFields"], serde_json::json!(["location:GPSLatitude"]));
        let time = obj["time"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(time).is_ok());
    }

    #[test]
    fn unnamed_source_is_null() {
        let report = RedactionReport::new(None, &SelectionMap::new());
        let value = serde_json::to_value(&report).unwrap();
        assert!(value["sourceFile"].is_null());
        assert!(report.kept_fields.is_empty());
        assert!(report.time.ends_with('Z'));
    }
}
