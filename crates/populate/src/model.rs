use serde::{Deserialize, Deserializer, Serialize};

use crate::error::PopulateError;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Currency,
    Percentage,
    Number,
    /// Also the reading of any data type this crate does not know.
    #[default]
    #[serde(other)]
    String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingStatus {
    Matched,
    Suggested,
    PendingReview,
    Confirmed,
    Unmatched,
    /// Missing or not one of the statuses above. Never eligible.
    #[default]
    #[serde(other)]
    Unrecognized,
}

impl MappingStatus {
    /// Only matched and confirmed items are written into a template.
    pub fn is_eligible(self) -> bool {
        matches!(self, Self::Matched | Self::Confirmed)
    }
}

impl std::fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::Suggested => write!(f, "suggested"),
            Self::PendingReview => write!(f, "pending_review"),
            Self::Confirmed => write!(f, "confirmed"),
            Self::Unmatched => write!(f, "unmatched"),
            Self::Unrecognized => write!(f, "unrecognized"),
        }
    }
}

/// A categorized value produced upstream, ready to be placed in a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub original_name: String,
    #[serde(default)]
    pub item_code: Option<String>,
    #[serde(default)]
    pub value: serde_json::Value,
    #[serde(default)]
    pub data_type: DataType,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub mapping_status: MappingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl DataItem {
    pub fn is_eligible(&self) -> bool {
        self.mapping_status.is_eligible()
    }

    /// The item code, if present and not blank.
    pub fn code(&self) -> Option<&str> {
        self.item_code.as_deref().filter(|c| !c.trim().is_empty())
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Int(i64),
    }
    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Int(n) => n.to_string(),
    })
}

#[derive(Deserialize)]
struct ItemsDocument {
    items: Vec<DataItem>,
}

/// Parse data items from JSON: either a bare array or `{"items": [...]}`.
pub fn items_from_json(json: &str) -> Result<Vec<DataItem>, PopulateError> {
    if json.trim_start().starts_with('[') {
        return serde_json::from_str::<Vec<DataItem>>(json)
            .map_err(|e| PopulateError::ItemsParse(e.to_string()));
    }
    serde_json::from_str::<ItemsDocument>(json)
        .map(|doc| doc.items)
        .map_err(|e| {
            PopulateError::ItemsParse(format!(
                "expected an array of data items or an object with an \"items\" array: {e}"
            ))
        })
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationStats {
    pub total_placeholders: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub fallbacks_inserted: usize,
    pub placeholders_cleared: usize,
}

/// Statistics plus the distinct tokens resolved and left unresolved by code.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PopulationReport {
    pub stats: PopulationStats,
    pub matched_placeholders: Vec<String>,
    pub unmatched_placeholders: Vec<String>,
}

/// Result of a full load, populate and serialize call.
#[derive(Debug, Clone)]
pub struct PopulationOutput {
    pub output_bytes: Vec<u8>,
    pub report: PopulationReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_bare_array() {
        let json = r#"[
            {"id": "a1", "originalName": "Purchase price", "itemCode": "<site.purchase.price>",
             "value": 500000, "dataType": "currency", "category": "Acquisition",
             "mappingStatus": "confirmed", "confidence": 0.97}
        ]"#;
        let items = items_from_json(json).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].data_type, DataType::Currency);
        assert_eq!(items[0].code(), Some("<site.purchase.price>"));
        assert!(items[0].is_eligible());
    }

    #[test]
    fn parse_wrapped_and_defaults() {
        let json = r#"{"items": [
            {"id": 7, "originalName": "Architect", "value": "12,000",
             "category": "Profesional Fees", "mappingStatus": "pending_review"}
        ]}"#;
        let items = items_from_json(json).unwrap();
        assert_eq!(items[0].id, "7");
        assert_eq!(items[0].data_type, DataType::String);
        assert_eq!(items[0].item_code, None);
        assert!(!items[0].is_eligible());
    }

    #[test]
    fn blank_code_is_absent() {
        let json = r#"[{"id": "x", "originalName": "n", "itemCode": "  ", "mappingStatus": "matched"}]"#;
        let items = items_from_json(json).unwrap();
        assert_eq!(items[0].code(), None);
    }

    #[test]
    fn unknown_data_type_reads_as_string() {
        let json = r#"[
            {"id": "x", "originalName": "Completion", "value": "2025-03-01", "dataType": "date", "mappingStatus": "matched"},
            {"id": "y", "originalName": "Fee", "value": 10, "dataType": "number", "mappingStatus": "matched"}
        ]"#;
        let items = items_from_json(json).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].data_type, DataType::String);
        assert!(items[0].is_eligible());
        assert_eq!(items[1].data_type, DataType::Number);
    }

    #[test]
    fn unknown_or_missing_status_is_ineligible() {
        let json = r#"[
            {"id": "x", "originalName": "n", "mappingStatus": "rejected"},
            {"id": "y", "originalName": "n"},
            {"id": "z", "originalName": "n", "mappingStatus": "confirmed"}
        ]"#;
        let items = items_from_json(json).unwrap();
        assert_eq!(items[0].mapping_status, MappingStatus::Unrecognized);
        assert_eq!(items[1].mapping_status, MappingStatus::Unrecognized);
        assert!(!items[0].is_eligible());
        assert!(!items[1].is_eligible());
        assert!(items[2].is_eligible());
    }

    #[test]
    fn malformed_item_is_an_error() {
        let json = r#"[{"id": "x", "originalName": 5, "mappingStatus": "matched"}]"#;
        let err = items_from_json(json).unwrap_err();
        assert!(matches!(err, PopulateError::ItemsParse(_)));
    }

    #[test]
    fn wrong_shape_is_an_error() {
        let err = items_from_json(r#"{"rows": []}"#).unwrap_err();
        assert!(err.to_string().contains("items"));
    }

    #[test]
    fn stats_serialize_camel_case() {
        let stats = PopulationStats { total_placeholders: 3, fallbacks_inserted: 2, ..Default::default() };
        let v = serde_json::to_value(&stats).unwrap();
        assert_eq!(v["totalPlaceholders"], 3);
        assert_eq!(v["fallbacksInserted"], 2);
        assert_eq!(v["placeholdersCleared"], 0);
    }

    #[test]
    fn status_eligibility() {
        assert!(MappingStatus::Matched.is_eligible());
        assert!(MappingStatus::Confirmed.is_eligible());
        assert!(!MappingStatus::Suggested.is_eligible());
        assert!(!MappingStatus::PendingReview.is_eligible());
        assert!(!MappingStatus::Unmatched.is_eligible());
        assert!(!MappingStatus::Unrecognized.is_eligible());
        assert_eq!(MappingStatus::PendingReview.to_string(), "pending_review");
    }
}
