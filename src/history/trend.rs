use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DEFAULT_TREND_TOLERANCE_PCT;
use crate::models::enums::TrendDirection;
use crate::models::{NutrientId, SafetyReport};

use super::{direction, nutrient_amounts, subject_reports};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientTrend {
    pub nutrient_id: NutrientId,
    /// Reports the nutrient appeared in.
    pub appearances: usize,
    /// Latest change between consecutive appearances.
    pub direction: TrendDirection,
    /// One entry per consecutive pair of appearances with a known amount.
    pub changes: Vec<TrendDirection>,
    pub latest_value: Option<f64>,
    /// Reports where the nutrient was excess or dangerous.
    pub repeated_risk_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrendSummary {
    pub profile_id: Option<Uuid>,
    pub report_count: usize,
    pub nutrients: BTreeMap<NutrientId, NutrientTrend>,
}

impl TrendSummary {
    pub fn is_empty(&self) -> bool {
        self.nutrients.is_empty()
    }

    pub fn get(&self, nutrient_id: &NutrientId) -> Option<&NutrientTrend> {
        self.nutrients.get(nutrient_id)
    }

    /// Nutrients flagged as risky in at least `min_reports` reports.
    pub fn repeated_risks(&self, min_reports: usize) -> Vec<&NutrientTrend> {
        self.nutrients
            .values()
            .filter(|t| t.repeated_risk_count >= min_reports)
            .collect()
    }
}

pub fn trend(reports: &[SafetyReport]) -> TrendSummary {
    trend_with_tolerance(reports, DEFAULT_TREND_TOLERANCE_PCT)
}

/// Fold reports (any order) into per-nutrient directions and risk counters.
pub fn trend_with_tolerance(reports: &[SafetyReport], tolerance_pct: f64) -> TrendSummary {
    let ordered = subject_reports(reports);
    let mut summary = TrendSummary {
        profile_id: ordered.first().map(|r| r.profile_id),
        report_count: ordered.len(),
        nutrients: BTreeMap::new(),
    };

    for report in &ordered {
        let amounts = nutrient_amounts(report);
        for (nutrient_id, value) in amounts {
            let risky = report
                .verdicts_for(&nutrient_id)
                .any(|v| v.risk_tier.is_risky());

            let entry = summary
                .nutrients
                .entry(nutrient_id.clone())
                .or_insert_with(|| NutrientTrend {
                    nutrient_id,
                    appearances: 0,
                    direction: TrendDirection::Stable,
                    changes: Vec::new(),
                    latest_value: None,
                    repeated_risk_count: 0,
                });

            entry.appearances += 1;
            if risky {
                entry.repeated_risk_count += 1;
            }
            if let Some(current) = value {
                if let Some(previous) = entry.latest_value {
                    let change = direction(previous, current, tolerance_pct);
                    entry.changes.push(change);
                    entry.direction = change;
                }
                entry.latest_value = Some(current);
            }
        }
    }

    tracing::debug!(
        reports = summary.report_count,
        nutrients = summary.nutrients.len(),
        "Trend computed"
    );

    summary
}
