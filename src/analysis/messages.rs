use serde::{Deserialize, Serialize};

use crate::models::enums::{InteractionSeverity, OverallSignal, RiskTier};
use crate::models::{format_value, NutrientId, NutrientVerdict, SafetyReport, Unit};

use super::types::AnalysisError;

/// Plain-language message builder. Calm wording, no alarm words: the reader is
/// a senior holding a supplement bottle, not a clinician.
pub struct MessageTemplates;

impl MessageTemplates {
    pub fn adequate(name: &str, amount: &str) -> String {
        format!("{name}: {amount} is within the recommended range for you.")
    }

    pub fn deficient(name: &str, amount: &str, min: &str) -> String {
        format!(
            "{name}: {amount} is below the recommended {min}. \
             This is usually fine if you also get it from food."
        )
    }

    pub fn excess(name: &str, amount: &str, max: &str) -> String {
        format!(
            "{name}: {amount} is more than the recommended {max}. \
             It is still under the upper limit, but you may not need this much."
        )
    }

    pub fn above_limit(name: &str, amount: &str, limit: &str) -> String {
        format!(
            "{name}: {amount} is above the safe upper limit of {limit}. \
             Please check with your doctor or pharmacist before taking it."
        )
    }

    pub fn interaction(name: &str, message: &str) -> String {
        format!("{name}: {message}")
    }

    pub fn no_reference(name: &str) -> String {
        format!(
            "{name}: we don't have reference values for this nutrient, \
             so we could not check the amount."
        )
    }

    pub fn unreadable_unit(name: &str, unit: &str) -> String {
        format!(
            "{name}: we could not read the unit \"{unit}\" on the label. \
             You may want to check the label yourself."
        )
    }

    pub fn age_out_of_range(age: u32) -> String {
        format!(
            "Our reference tables do not cover age {age}, \
             so amounts could not be compared with recommendations."
        )
    }

    pub fn nearest_band(age: u32, band: &str) -> String {
        format!(
            "Our reference tables do not cover age {age}. \
             Amounts were compared with the values for ages {band}."
        )
    }

    pub fn signal_summary(signal: OverallSignal) -> &'static str {
        match signal {
            OverallSignal::Green => "This supplement looks fine for you.",
            OverallSignal::Yellow => {
                "Some items in this supplement are worth a closer look."
            }
            OverallSignal::Red => {
                "Please talk to your doctor or pharmacist before taking this supplement."
            }
        }
    }

    /// Message for a per-nutrient evaluation failure.
    pub fn issue(name: &str, error: &AnalysisError) -> String {
        match error {
            AnalysisError::Unit { unit, .. } => Self::unreadable_unit(name, unit),
            AnalysisError::MissingReference { .. } => Self::no_reference(name),
            AnalysisError::OutOfRangeProfile { age } => Self::age_out_of_range(*age),
        }
    }

    /// One-line message for a verdict. A contraindication speaks over the dose.
    pub fn verdict(verdict: &NutrientVerdict) -> String {
        let name = verdict.display_name.as_str();

        if let Some(rule) = verdict
            .triggered_interactions
            .iter()
            .find(|r| r.severity == InteractionSeverity::Contraindicated)
        {
            return Self::interaction(name, &rule.message);
        }

        if let Some(issue) = &verdict.issue {
            return issue.message.clone();
        }

        dose_message(verdict).unwrap_or_else(|| Self::no_reference(name))
    }
}

/// Message for the dose comparison alone; None without amount or range.
fn dose_message(verdict: &NutrientVerdict) -> Option<String> {
    let name = verdict.display_name.as_str();
    let amount = verdict.normalized_amount.as_ref()?;
    let adequacy = verdict.adequacy.as_ref()?;
    let shown = amount.display();
    let unit = adequacy.unit;

    let message = match verdict.dose_tier {
        RiskTier::Adequate => MessageTemplates::adequate(name, &shown),
        RiskTier::Deficient => {
            MessageTemplates::deficient(name, &shown, &with_unit(adequacy.recommended_min, unit))
        }
        RiskTier::Excess => {
            MessageTemplates::excess(name, &shown, &with_unit(adequacy.recommended_max, unit))
        }
        RiskTier::Dangerous => {
            let limit = adequacy.upper_limit.unwrap_or(adequacy.recommended_max);
            MessageTemplates::above_limit(name, &shown, &with_unit(limit, unit))
        }
        RiskTier::Unknown => return None,
    };
    Some(message)
}

fn with_unit(value: f64, unit: Unit) -> String {
    format!("{}{}", format_value(value), unit.display())
}

// ---------------------------------------------------------------------------
// Advice
// ---------------------------------------------------------------------------

/// Advice groups, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceCategory {
    Contraindicated,
    Caution,
    Excess,
    Deficient,
    MissingInformation,
    Beneficial,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdviceItem {
    pub category: AdviceCategory,
    /// None for profile-level notes.
    pub nutrient_id: Option<NutrientId>,
    pub message: String,
}

/// Grouped advice for a report: contraindications first, beneficial notes last.
/// Within a group, items follow the order of the verdicts.
pub fn advice(report: &SafetyReport) -> Vec<AdviceItem> {
    let mut items = Vec::new();

    for warning in &report.profile_warnings {
        items.push(AdviceItem {
            category: AdviceCategory::MissingInformation,
            nutrient_id: None,
            message: warning.message.clone(),
        });
    }

    for verdict in &report.verdicts {
        let name = verdict.display_name.as_str();
        let item = |category, message| AdviceItem {
            category,
            nutrient_id: Some(verdict.nutrient_id.clone()),
            message,
        };

        for rule in &verdict.triggered_interactions {
            let category = match rule.severity {
                InteractionSeverity::Contraindicated => AdviceCategory::Contraindicated,
                InteractionSeverity::Caution => AdviceCategory::Caution,
                InteractionSeverity::Info => AdviceCategory::Beneficial,
            };
            items.push(item(category, MessageTemplates::interaction(name, &rule.message)));
        }

        match verdict.dose_tier {
            RiskTier::Excess | RiskTier::Dangerous => {
                if let Some(message) = dose_message(verdict) {
                    items.push(item(AdviceCategory::Excess, message));
                }
            }
            RiskTier::Deficient => {
                if let Some(message) = dose_message(verdict) {
                    items.push(item(AdviceCategory::Deficient, message));
                }
            }
            RiskTier::Adequate | RiskTier::Unknown => {}
        }

        if let Some(issue) = &verdict.issue {
            items.push(item(AdviceCategory::MissingInformation, issue.message.clone()));
        }
    }

    items.sort_by_key(|i| i.category);
    items
}
