use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use crate::config::AnalysisConfig;
use crate::models::enums::{AgeBandPolicy, InteractionSeverity, IssueKind, OverallSignal, RiskTier};
use crate::models::{
    NormalizedAmount, NutrientAmount, NutrientId, NutrientIssue, NutrientVerdict, ProfileWarning,
    SafetyReport, UserProfile,
};
use crate::reference::{AgeBand, ReferenceSnapshot};

use super::aggregate::{aggregate, tier_counts};
use super::dose::assess_dose;
use super::interactions::check_interactions;
use super::messages::MessageTemplates;
use super::types::{AnalysisError, SafetyEngine, ScanRequest};
use super::units::{normalize, round6};

/// Label lines after normalization: same-nutrient lines summed, failures kept apart.
enum LineGroup {
    Summed {
        amount: NormalizedAmount,
        lines: usize,
    },
    Failed {
        nutrient_id: NutrientId,
        error: AnalysisError,
    },
}

/// Default implementation of the safety engine.
/// Evaluates every nutrient against one reference snapshot; nothing here does I/O.
pub struct DefaultSafetyEngine {
    reference: Arc<ReferenceSnapshot>,
    config: AnalysisConfig,
}

impl DefaultSafetyEngine {
    pub fn new(reference: Arc<ReferenceSnapshot>) -> Self {
        Self::with_config(reference, AnalysisConfig::default())
    }

    pub fn with_config(reference: Arc<ReferenceSnapshot>, config: AnalysisConfig) -> Self {
        Self { reference, config }
    }

    pub fn reference(&self) -> &ReferenceSnapshot {
        &self.reference
    }

    /// Band for the profile's age, or the fallback the policy allows.
    fn resolve_band(&self, age: u32) -> (Option<AgeBand>, Vec<ProfileWarning>) {
        if let Some(band) = self.reference.age_band_for(age) {
            return (Some(band), Vec::new());
        }

        match self.config.age_band_policy {
            AgeBandPolicy::Refuse => {
                tracing::warn!(age, "Age outside reference bands, doses not evaluated");
                let warning = ProfileWarning {
                    kind: IssueKind::OutOfRangeProfile,
                    message: MessageTemplates::age_out_of_range(age),
                    fallback_band: None,
                };
                (None, vec![warning])
            }
            AgeBandPolicy::NearestBand => {
                let nearest = self.reference.nearest_age_band(age);
                tracing::warn!(
                    age,
                    band = %nearest.map(|b| b.label()).unwrap_or_default(),
                    "Age outside reference bands, using nearest band"
                );
                let message = match nearest {
                    Some(band) => MessageTemplates::nearest_band(age, &band.label()),
                    None => MessageTemplates::age_out_of_range(age),
                };
                let warning = ProfileWarning {
                    kind: IssueKind::OutOfRangeProfile,
                    message,
                    fallback_band: nearest,
                };
                (nearest, vec![warning])
            }
        }
    }

    /// Normalize every line. Lines naming the same nutrient are summed in
    /// canonical units; the first appearance fixes the position in the report.
    fn group_lines(&self, ingredients: &[NutrientAmount]) -> Vec<LineGroup> {
        let mut groups: Vec<LineGroup> = Vec::new();
        let mut index: HashMap<NutrientId, usize> = HashMap::new();

        for line in ingredients {
            match normalize(line, &self.reference) {
                Ok(amount) => match index.get(&amount.nutrient_id).copied() {
                    Some(i) => {
                        if let LineGroup::Summed { amount: total, lines } = &mut groups[i] {
                            total.canonical_value =
                                round6(total.canonical_value + amount.canonical_value);
                            *lines += 1;
                        }
                    }
                    None => {
                        index.insert(amount.nutrient_id.clone(), groups.len());
                        groups.push(LineGroup::Summed { amount, lines: 1 });
                    }
                },
                Err(error) => {
                    tracing::warn!(
                        nutrient = %line.nutrient_id,
                        raw_unit = %line.raw_unit,
                        error = %error,
                        "Label line could not be normalized"
                    );
                    groups.push(LineGroup::Failed {
                        nutrient_id: self.reference.resolve_nutrient(&line.nutrient_id),
                        error,
                    });
                }
            }
        }

        groups
    }

    fn evaluate_group(
        &self,
        group: LineGroup,
        band: Option<AgeBand>,
        profile: &UserProfile,
    ) -> NutrientVerdict {
        let (nutrient_id, normalized_amount, source_lines, error) = match group {
            LineGroup::Summed { amount, lines } => (amount.nutrient_id.clone(), Some(amount), lines, None),
            LineGroup::Failed { nutrient_id, error } => (nutrient_id, None, 1, Some(error)),
        };
        let display_name = self.reference.display_name(&nutrient_id);

        let (dose_tier, adequacy, error) = match (&normalized_amount, band) {
            (Some(amount), Some(band)) => {
                let assessment = assess_dose(amount, band, profile.sex, &self.reference);
                let missing = (assessment.tier == RiskTier::Unknown).then(|| {
                    tracing::warn!(
                        nutrient = %nutrient_id,
                        band = %band.label(),
                        sex = %profile.sex,
                        "No reference range"
                    );
                    AnalysisError::MissingReference {
                        nutrient: nutrient_id.clone(),
                        detail: format!("no range for ages {} ({})", band.label(), profile.sex),
                    }
                });
                (assessment.tier, assessment.adequacy, missing)
            }
            (Some(_), None) => (
                RiskTier::Unknown,
                None,
                Some(AnalysisError::OutOfRangeProfile { age: profile.age }),
            ),
            (None, _) => (RiskTier::Unknown, None, error),
        };

        let triggered_interactions = check_interactions(&nutrient_id, profile, &self.reference);
        let contraindicated = triggered_interactions
            .iter()
            .any(|r| r.severity == InteractionSeverity::Contraindicated);
        let risk_tier = if contraindicated {
            RiskTier::Dangerous
        } else {
            dose_tier
        };

        tracing::debug!(
            nutrient = %nutrient_id,
            dose_tier = %dose_tier,
            risk_tier = %risk_tier,
            interactions = triggered_interactions.len(),
            "Nutrient evaluated"
        );

        NutrientVerdict {
            issue: error.map(|e| NutrientIssue {
                kind: e.issue_kind(),
                message: MessageTemplates::issue(&display_name, &e),
            }),
            nutrient_id,
            display_name,
            normalized_amount,
            dose_tier,
            risk_tier,
            triggered_interactions,
            adequacy,
            source_lines,
        }
    }
}

impl SafetyEngine for DefaultSafetyEngine {
    fn evaluate(&self, scan: &ScanRequest, profile: &UserProfile) -> SafetyReport {
        let start = Instant::now();
        let profile = profile.normalized();

        let (age_band, profile_warnings) = self.resolve_band(profile.age);

        let verdicts: Vec<NutrientVerdict> = self
            .group_lines(&scan.ingredients)
            .into_iter()
            .map(|group| self.evaluate_group(group, age_band, &profile))
            .collect();

        let mut overall_signal = aggregate(&verdicts);
        if !profile_warnings.is_empty() {
            overall_signal = overall_signal.max(OverallSignal::Yellow);
        }

        let counts = tier_counts(&verdicts);
        tracing::info!(
            scan_id = %scan.scan_id,
            profile_id = %scan.profile_id,
            lines = scan.ingredients.len(),
            nutrients = counts.total(),
            risky = counts.risky(),
            unknown = counts.unknown,
            signal = %overall_signal,
            processing_ms = start.elapsed().as_millis() as u64,
            "Safety evaluation complete for scan"
        );

        SafetyReport {
            profile_id: scan.profile_id,
            scan_id: scan.scan_id,
            timestamp: scan.timestamp,
            product_name: scan.product_name.clone(),
            age_band,
            verdicts,
            overall_signal,
            profile_warnings,
        }
    }
}
