use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{InteractionSeverity, IssueKind, OverallSignal, RiskTier};
use super::nutrient::{NormalizedAmount, NutrientId, Unit};
use crate::reference::{AgeBand, InteractionRule};

// ---------------------------------------------------------------------------
// NutrientVerdict
// ---------------------------------------------------------------------------

/// Dose-adequacy figures for the DRI view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseAdequacy {
    pub unit: Unit,
    pub recommended_min: f64,
    pub recommended: f64,
    pub recommended_max: f64,
    pub upper_limit: Option<f64>,
    pub percent_of_recommended: f64,
    pub percent_of_upper_limit: Option<f64>,
}

/// Explicit marker for a nutrient line that could not be fully evaluated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientIssue {
    pub kind: IssueKind,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientVerdict {
    pub nutrient_id: NutrientId,
    pub display_name: String,
    /// None when the label amount could not be normalized.
    pub normalized_amount: Option<NormalizedAmount>,
    /// Tier from the dose comparison alone.
    pub dose_tier: RiskTier,
    /// Final tier after interaction overrides.
    pub risk_tier: RiskTier,
    /// Ordered by descending severity, then registration order.
    pub triggered_interactions: Vec<InteractionRule>,
    pub adequacy: Option<DoseAdequacy>,
    /// Number of label lines combined into this verdict.
    pub source_lines: usize,
    pub issue: Option<NutrientIssue>,
}

impl NutrientVerdict {
    pub fn canonical_value(&self) -> Option<f64> {
        self.normalized_amount.as_ref().map(|a| a.canonical_value)
    }
}

// ---------------------------------------------------------------------------
// SafetyReport
// ---------------------------------------------------------------------------

/// Profile-level warning, e.g. an age outside every reference band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileWarning {
    pub kind: IssueKind,
    pub message: String,
    /// Band substituted under the nearest-band policy.
    pub fallback_band: Option<AgeBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SafetyReport {
    pub profile_id: Uuid,
    pub scan_id: Uuid,
    pub timestamp: NaiveDateTime,
    pub product_name: Option<String>,
    pub age_band: Option<AgeBand>,
    pub verdicts: Vec<NutrientVerdict>,
    pub overall_signal: OverallSignal,
    pub profile_warnings: Vec<ProfileWarning>,
}

impl SafetyReport {
    /// Verdicts for one nutrient (a scan may carry a failed line next to a good one).
    pub fn verdicts_for(&self, nutrient_id: &NutrientId) -> impl Iterator<Item = &NutrientVerdict> {
        let nutrient_id = nutrient_id.clone();
        self.verdicts
            .iter()
            .filter(move |v| v.nutrient_id == nutrient_id)
    }

    /// Verdicts that need the user's attention: anything but adequate, or
    /// adequate with a caution or stronger. Info-only notes are not flagged.
    pub fn flagged_verdicts(&self) -> Vec<&NutrientVerdict> {
        self.verdicts
            .iter()
            .filter(|v| {
                v.risk_tier != RiskTier::Adequate
                    || v.triggered_interactions
                        .iter()
                        .any(|r| r.severity >= InteractionSeverity::Caution)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::reference::Trigger;

    fn verdict(id: &str, tier: RiskTier) -> NutrientVerdict {
        NutrientVerdict {
            nutrient_id: NutrientId::new(id),
            display_name: id.into(),
            normalized_amount: Some(NormalizedAmount {
                nutrient_id: NutrientId::new(id),
                canonical_value: 10.0,
                canonical_unit: Unit::Mg,
            }),
            dose_tier: tier,
            risk_tier: tier,
            triggered_interactions: vec![],
            adequacy: None,
            source_lines: 1,
            issue: None,
        }
    }

    fn report(verdicts: Vec<NutrientVerdict>) -> SafetyReport {
        SafetyReport {
            profile_id: Uuid::new_v4(),
            scan_id: Uuid::new_v4(),
            timestamp: NaiveDate::from_ymd_opt(2026, 3, 1)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            product_name: None,
            age_band: None,
            verdicts,
            overall_signal: OverallSignal::Green,
            profile_warnings: vec![],
        }
    }

    #[test]
    fn flagged_verdicts_skip_plain_adequate() {
        let r = report(vec![
            verdict("zinc", RiskTier::Adequate),
            verdict("iron", RiskTier::Excess),
            verdict("boron", RiskTier::Unknown),
        ]);
        let flagged: Vec<_> = r.flagged_verdicts().iter().map(|v| v.nutrient_id.as_str()).collect();
        assert_eq!(flagged, vec!["iron", "boron"]);
    }

    fn with_rule(mut v: NutrientVerdict, severity: InteractionSeverity) -> NutrientVerdict {
        v.triggered_interactions.push(InteractionRule {
            nutrient_id: v.nutrient_id.clone(),
            trigger: Trigger::condition("osteoporosis"),
            severity,
            message: "note".into(),
        });
        v
    }

    #[test]
    fn flagged_verdicts_ignore_info_notes() {
        let r = report(vec![
            with_rule(verdict("calcium", RiskTier::Adequate), InteractionSeverity::Info),
            with_rule(verdict("vitamin_d", RiskTier::Adequate), InteractionSeverity::Caution),
        ]);
        let flagged: Vec<_> = r.flagged_verdicts().iter().map(|v| v.nutrient_id.as_str()).collect();
        assert_eq!(flagged, vec!["vitamin_d"]);
    }

    #[test]
    fn verdicts_for_filters_by_nutrient() {
        let r = report(vec![
            verdict("zinc", RiskTier::Adequate),
            verdict("iron", RiskTier::Excess),
        ]);
        assert_eq!(r.verdicts_for(&NutrientId::new("iron")).count(), 1);
    }

    #[test]
    fn report_serializes_round_trip() {
        let r = report(vec![verdict("zinc", RiskTier::Adequate)]);
        let json = serde_json::to_string(&r).unwrap();
        let back: SafetyReport = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
