use crate::models::enums::{RiskTier, Sex};
use crate::models::{DoseAdequacy, NormalizedAmount, UserProfile};
use crate::reference::{AgeBand, ReferenceRange, ReferenceSnapshot};

use super::types::AnalysisError;

/// Tier plus adequacy figures for one normalized amount.
#[derive(Debug, Clone, PartialEq)]
pub struct DoseAssessment {
    pub tier: RiskTier,
    /// None when no range exists for the profile's cell.
    pub adequacy: Option<DoseAdequacy>,
}

/// Risk tier of `amount` for `profile`.
///
/// An age outside every declared band is an error; a missing range for the
/// nutrient is `Unknown`.
pub fn evaluate_dose(
    amount: &NormalizedAmount,
    profile: &UserProfile,
    reference: &ReferenceSnapshot,
) -> Result<RiskTier, AnalysisError> {
    let band = reference
        .age_band_for(profile.age)
        .ok_or(AnalysisError::OutOfRangeProfile { age: profile.age })?;
    Ok(assess_dose(amount, band, profile.sex, reference).tier)
}

/// Tier and adequacy figures against the range for an already-resolved band.
pub fn assess_dose(
    amount: &NormalizedAmount,
    band: AgeBand,
    sex: Sex,
    reference: &ReferenceSnapshot,
) -> DoseAssessment {
    let Some(range) = reference.range(&amount.nutrient_id, band, sex) else {
        return DoseAssessment {
            tier: RiskTier::Unknown,
            adequacy: None,
        };
    };

    let ceiling = reference
        .nutrient(&amount.nutrient_id)
        .and_then(|info| info.absolute_ceiling);

    DoseAssessment {
        tier: classify_tier(amount.canonical_value, range, ceiling),
        adequacy: Some(dose_adequacy(amount, range)),
    }
}

/// Bounds are inclusive on the adequate side: exactly `recommended_max` is
/// adequate, exactly `upper_limit` is excess.
pub fn classify_tier(value: f64, range: &ReferenceRange, absolute_ceiling: Option<f64>) -> RiskTier {
    if value < range.recommended_min {
        return RiskTier::Deficient;
    }
    if value <= range.recommended_max {
        return RiskTier::Adequate;
    }
    match range.upper_limit.or(absolute_ceiling) {
        Some(limit) if value > limit => RiskTier::Dangerous,
        _ => RiskTier::Excess,
    }
}

pub fn dose_adequacy(amount: &NormalizedAmount, range: &ReferenceRange) -> DoseAdequacy {
    let recommended = range.recommended_point();
    DoseAdequacy {
        unit: amount.canonical_unit,
        recommended_min: range.recommended_min,
        recommended,
        recommended_max: range.recommended_max,
        upper_limit: range.upper_limit,
        percent_of_recommended: percent(amount.canonical_value, recommended),
        percent_of_upper_limit: range.upper_limit.map(|ul| percent(amount.canonical_value, ul)),
    }
}

fn percent(value: f64, of: f64) -> f64 {
    if of <= 0.0 {
        return 0.0;
    }
    (value / of * 1000.0).round() / 10.0
}
