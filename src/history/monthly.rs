use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::models::enums::{OverallSignal, TrendDirection};
use crate::models::{NutrientId, SafetyReport};

use super::{direction, nutrient_amounts, subject_reports};

// ---------------------------------------------------------------------------
// Monthly summary
// ---------------------------------------------------------------------------

/// One calendar month of scans, as shown on the monthly report screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    pub scan_count: usize,
    /// Distinct days with at least one scan.
    pub scan_days: usize,
    pub green: usize,
    pub yellow: usize,
    pub red: usize,
    /// Share of green scans, one decimal.
    pub safe_percent: f64,
    /// Worst signal per scanned day.
    pub calendar: BTreeMap<NaiveDate, OverallSignal>,
    /// Verdict lines needing attention across the month.
    pub flagged_lines: usize,
    /// Flagged line count per nutrient.
    pub flagged_nutrients: BTreeMap<NutrientId, usize>,
}

pub fn monthly_summary(reports: &[SafetyReport], year: i32, month: u32) -> MonthlySummary {
    let mut summary = MonthlySummary {
        year,
        month,
        scan_count: 0,
        scan_days: 0,
        green: 0,
        yellow: 0,
        red: 0,
        safe_percent: 0.0,
        calendar: BTreeMap::new(),
        flagged_lines: 0,
        flagged_nutrients: BTreeMap::new(),
    };

    let in_month = subject_reports(reports)
        .into_iter()
        .filter(|r| r.timestamp.year() == year && r.timestamp.month() == month);

    for report in in_month {
        summary.scan_count += 1;
        match report.overall_signal {
            OverallSignal::Green => summary.green += 1,
            OverallSignal::Yellow => summary.yellow += 1,
            OverallSignal::Red => summary.red += 1,
        }

        summary
            .calendar
            .entry(report.timestamp.date())
            .and_modify(|worst| *worst = (*worst).max(report.overall_signal))
            .or_insert(report.overall_signal);

        for verdict in report.flagged_verdicts() {
            summary.flagged_lines += 1;
            *summary
                .flagged_nutrients
                .entry(verdict.nutrient_id.clone())
                .or_insert(0) += 1;
        }
    }

    summary.scan_days = summary.calendar.len();
    if summary.scan_count > 0 {
        let pct = summary.green as f64 / summary.scan_count as f64 * 100.0;
        summary.safe_percent = (pct * 10.0).round() / 10.0;
    }

    summary
}

// ---------------------------------------------------------------------------
// Month over month
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlyIntake {
    pub nutrient_id: NutrientId,
    pub year: i32,
    pub month: u32,
    /// Scans that month with a known amount of the nutrient.
    pub scans: usize,
    pub average_per_scan: f64,
    /// Versus the previous month the nutrient appeared in; None for the first.
    pub direction: Option<TrendDirection>,
}

/// Average amount per scan for each nutrient and month, ordered by nutrient
/// then month.
pub fn month_over_month(reports: &[SafetyReport], tolerance_pct: f64) -> Vec<MonthlyIntake> {
    // (nutrient, (year, month)) -> (sum, scans)
    let mut totals: BTreeMap<(NutrientId, (i32, u32)), (f64, usize)> = BTreeMap::new();

    for report in subject_reports(reports) {
        let key_month = (report.timestamp.year(), report.timestamp.month());
        for (nutrient_id, value) in nutrient_amounts(report) {
            if let Some(value) = value {
                let slot = totals.entry((nutrient_id, key_month)).or_insert((0.0, 0));
                slot.0 += value;
                slot.1 += 1;
            }
        }
    }

    let mut result: Vec<MonthlyIntake> = Vec::with_capacity(totals.len());
    for ((nutrient_id, (year, month)), (sum, scans)) in totals {
        let average_per_scan = round3(sum / scans as f64);
        let change = result
            .last()
            .filter(|prev| prev.nutrient_id == nutrient_id)
            .map(|prev| direction(prev.average_per_scan, average_per_scan, tolerance_pct));

        result.push(MonthlyIntake {
            nutrient_id,
            year,
            month,
            scans,
            average_per_scan,
            direction: change,
        });
    }

    result
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::super::fixtures::*;
    use super::*;
    use crate::models::enums::RiskTier;

    #[test]
    fn empty_month() {
        let summary = monthly_summary(&[], 2026, 2);
        assert_eq!(summary.scan_count, 0);
        assert_eq!(summary.safe_percent, 0.0);
        assert!(summary.calendar.is_empty());
    }

    #[test]
    fn counts_signals_days_and_flags() {
        let p = Uuid::new_v4();
        let reports = vec![
            report(p, at(2026, 3, 2, 8), OverallSignal::Green, vec![verdict("zinc", Some(10.0), RiskTier::Adequate)]),
            report(p, at(2026, 3, 2, 20), OverallSignal::Red, vec![verdict("iron", Some(60.0), RiskTier::Dangerous)]),
            report(
                p,
                at(2026, 3, 9, 8),
                OverallSignal::Yellow,
                vec![
                    verdict("iron", Some(30.0), RiskTier::Excess),
                    verdict("boron", Some(3.0), RiskTier::Unknown),
                ],
            ),
            report(p, at(2026, 3, 20, 8), OverallSignal::Green, vec![]),
            report(p, at(2026, 4, 1, 8), OverallSignal::Red, vec![]),
        ];

        let march = monthly_summary(&reports, 2026, 3);
        assert_eq!(march.scan_count, 4);
        assert_eq!(march.scan_days, 3);
        assert_eq!((march.green, march.yellow, march.red), (2, 1, 1));
        assert_eq!(march.safe_percent, 50.0);

        let day2 = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        assert_eq!(march.calendar[&day2], OverallSignal::Red);

        assert_eq!(march.flagged_lines, 3);
        assert_eq!(march.flagged_nutrients[&NutrientId::new("iron")], 2);
    }

    #[test]
    fn safe_percent_rounds_to_one_decimal() {
        let p = Uuid::new_v4();
        let reports = vec![
            report(p, at(2026, 5, 1, 8), OverallSignal::Green, vec![]),
            report(p, at(2026, 5, 2, 8), OverallSignal::Yellow, vec![]),
            report(p, at(2026, 5, 3, 8), OverallSignal::Yellow, vec![]),
        ];
        assert_eq!(monthly_summary(&reports, 2026, 5).safe_percent, 33.3);
    }

    #[test]
    fn month_over_month_averages_and_directions() {
        let p = Uuid::new_v4();
        let reports = vec![
            report(p, at(2026, 1, 5, 8), OverallSignal::Green, vec![verdict("zinc", Some(10.0), RiskTier::Adequate)]),
            report(p, at(2026, 1, 20, 8), OverallSignal::Green, vec![verdict("zinc", Some(20.0), RiskTier::Adequate)]),
            report(p, at(2026, 3, 3, 8), OverallSignal::Green, vec![verdict("zinc", Some(15.5), RiskTier::Adequate)]),
            report(p, at(2026, 4, 3, 8), OverallSignal::Green, vec![verdict("zinc", Some(30.0), RiskTier::Adequate)]),
            report(p, at(2026, 4, 9, 8), OverallSignal::Green, vec![verdict("iron", Some(8.0), RiskTier::Adequate)]),
        ];

        let rows = month_over_month(&reports, 5.0);
        let zinc: Vec<_> = rows
            .iter()
            .filter(|r| r.nutrient_id.as_str() == "zinc")
            .map(|r| (r.month, r.average_per_scan, r.direction))
            .collect();
        assert_eq!(
            zinc,
            vec![
                (1, 15.0, None),
                (3, 15.5, Some(TrendDirection::Stable)),
                (4, 30.0, Some(TrendDirection::Increasing)),
            ]
        );

        let iron = rows.iter().find(|r| r.nutrient_id.as_str() == "iron").unwrap();
        assert_eq!(iron.direction, None);
        assert_eq!(iron.scans, 1);
    }
}
