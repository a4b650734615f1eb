//! Pure folds over past safety reports of one profile.

pub mod monthly;
pub mod trend;

pub use monthly::{month_over_month, monthly_summary, MonthlyIntake, MonthlySummary};
pub use trend::{trend, trend_with_tolerance, NutrientTrend, TrendSummary};

use std::collections::BTreeMap;

use crate::models::enums::TrendDirection;
use crate::models::{NutrientId, SafetyReport};

/// Reports of the first profile seen, oldest first. Reports of any other
/// profile are dropped with a warning; equal timestamps keep input order.
pub(crate) fn subject_reports(reports: &[SafetyReport]) -> Vec<&SafetyReport> {
    let mut ordered: Vec<&SafetyReport> = reports.iter().collect();
    ordered.sort_by_key(|r| r.timestamp);

    let Some(subject) = ordered.first().map(|r| r.profile_id) else {
        return ordered;
    };

    ordered.retain(|r| {
        let keep = r.profile_id == subject;
        if !keep {
            tracing::warn!(
                scan_id = %r.scan_id,
                profile_id = %r.profile_id,
                expected = %subject,
                "Skipping report of another profile"
            );
        }
        keep
    });
    ordered
}

/// Total canonical amount per nutrient in one report. Nutrients whose lines
/// all failed to normalize map to None.
pub(crate) fn nutrient_amounts(report: &SafetyReport) -> BTreeMap<NutrientId, Option<f64>> {
    let mut amounts: BTreeMap<NutrientId, Option<f64>> = BTreeMap::new();
    for verdict in &report.verdicts {
        let entry = amounts.entry(verdict.nutrient_id.clone()).or_insert(None);
        if let Some(value) = verdict.canonical_value() {
            *entry = Some(entry.unwrap_or(0.0) + value);
        }
    }
    amounts
}

/// Direction of `current` relative to `previous`, stable within `tolerance_pct`.
pub(crate) fn direction(previous: f64, current: f64, tolerance_pct: f64) -> TrendDirection {
    if previous == 0.0 {
        return if current > 0.0 {
            TrendDirection::Increasing
        } else {
            TrendDirection::Stable
        };
    }
    let change_pct = (current - previous) / previous.abs() * 100.0;
    if change_pct.abs() <= tolerance_pct {
        TrendDirection::Stable
    } else if change_pct > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::{NaiveDate, NaiveDateTime};
    use uuid::Uuid;

    use crate::models::enums::{OverallSignal, RiskTier};
    use crate::models::{NormalizedAmount, NutrientId, NutrientVerdict, SafetyReport, Unit};

    pub fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    pub fn verdict(id: &str, value: Option<f64>, tier: RiskTier) -> NutrientVerdict {
        NutrientVerdict {
            nutrient_id: NutrientId::new(id),
            display_name: id.into(),
            normalized_amount: value.map(|v| NormalizedAmount {
                nutrient_id: NutrientId::new(id),
                canonical_value: v,
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

    pub fn report(
        profile_id: Uuid,
        timestamp: NaiveDateTime,
        signal: OverallSignal,
        verdicts: Vec<NutrientVerdict>,
    ) -> SafetyReport {
        SafetyReport {
            profile_id,
            scan_id: Uuid::new_v4(),
            timestamp,
            product_name: None,
            age_band: None,
            verdicts,
            overall_signal: signal,
            profile_warnings: vec![],
        }
    }
}
