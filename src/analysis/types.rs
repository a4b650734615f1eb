use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::models::enums::IssueKind;
use crate::models::{NutrientAmount, NutrientId, SafetyReport, UserProfile};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Per-nutrient or per-profile evaluation failure. None of these abort a scan;
/// the engine records them on the affected verdict or as a profile warning.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    #[error("Cannot use unit '{unit}' for {nutrient}: {reason}")]
    Unit {
        nutrient: NutrientId,
        unit: String,
        reason: String,
    },

    #[error("No reference data for {nutrient}: {detail}")]
    MissingReference { nutrient: NutrientId, detail: String },

    #[error("Age {age} is outside every reference age band")]
    OutOfRangeProfile { age: u32 },
}

impl AnalysisError {
    pub fn issue_kind(&self) -> IssueKind {
        match self {
            Self::Unit { .. } => IssueKind::UnitError,
            Self::MissingReference { .. } => IssueKind::MissingReference,
            Self::OutOfRangeProfile { .. } => IssueKind::OutOfRangeProfile,
        }
    }
}

// ---------------------------------------------------------------------------
// ScanRequest
// ---------------------------------------------------------------------------

/// One scanned label: the ingredient lines OCR extracted, plus ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub profile_id: Uuid,
    #[serde(default = "Uuid::new_v4")]
    pub scan_id: Uuid,
    #[serde(default = "now")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub product_name: Option<String>,
    pub ingredients: Vec<NutrientAmount>,
}

fn now() -> NaiveDateTime {
    chrono::Local::now().naive_local()
}

impl ScanRequest {
    pub fn new(profile_id: Uuid, ingredients: Vec<NutrientAmount>) -> Self {
        Self {
            profile_id,
            scan_id: Uuid::new_v4(),
            timestamp: now(),
            product_name: None,
            ingredients,
        }
    }

    pub fn at(mut self, timestamp: NaiveDateTime) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn named(mut self, product_name: &str) -> Self {
        self.product_name = Some(product_name.to_string());
        self
    }
}

// ---------------------------------------------------------------------------
// Engine trait
// ---------------------------------------------------------------------------

/// Turns a scan plus a profile into a safety report. Evaluation never fails as
/// a whole: unit, reference and profile problems surface inside the report.
pub trait SafetyEngine {
    fn evaluate(&self, scan: &ScanRequest, profile: &UserProfile) -> SafetyReport;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_issue_kinds() {
        let unit = AnalysisError::Unit {
            nutrient: NutrientId::new("zinc"),
            unit: "tsp".into(),
            reason: "unrecognized unit".into(),
        };
        assert_eq!(unit.issue_kind(), IssueKind::UnitError);
        assert_eq!(
            AnalysisError::OutOfRangeProfile { age: 12 }.issue_kind(),
            IssueKind::OutOfRangeProfile
        );
    }

    #[test]
    fn scan_request_defaults_ids_and_time() {
        let json = r#"{
            "profile_id": "6f1c1c8e-2f55-4a8e-9d55-0b8c2b5e7a10",
            "ingredients": [{"nutrient_id": "Vitamin D", "raw_value": 25.0, "raw_unit": "mcg"}]
        }"#;
        let scan: ScanRequest = serde_json::from_str(json).unwrap();
        assert_eq!(scan.ingredients.len(), 1);
        assert_eq!(scan.ingredients[0].nutrient_id.as_str(), "vitamin_d");
        assert!(scan.product_name.is_none());
        assert!(!scan.scan_id.is_nil());
    }
}
