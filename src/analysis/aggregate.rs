use serde::{Deserialize, Serialize};

use crate::models::enums::{InteractionSeverity, OverallSignal, RiskTier};
use crate::models::NutrientVerdict;

use super::interactions::strongest;

/// Signal contributed by a single verdict.
pub fn verdict_signal(verdict: &NutrientVerdict) -> OverallSignal {
    match verdict.risk_tier {
        RiskTier::Dangerous => OverallSignal::Red,
        RiskTier::Excess | RiskTier::Deficient | RiskTier::Unknown => OverallSignal::Yellow,
        RiskTier::Adequate => match strongest(&verdict.triggered_interactions) {
            Some(severity) if severity >= InteractionSeverity::Caution => OverallSignal::Yellow,
            _ => OverallSignal::Green,
        },
    }
}

/// Worst per-verdict signal. No verdicts means nothing to warn about.
pub fn aggregate(verdicts: &[NutrientVerdict]) -> OverallSignal {
    verdicts
        .iter()
        .map(verdict_signal)
        .max()
        .unwrap_or(OverallSignal::Green)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierCounts {
    pub deficient: usize,
    pub adequate: usize,
    pub excess: usize,
    pub dangerous: usize,
    pub unknown: usize,
}

impl TierCounts {
    pub fn total(&self) -> usize {
        self.deficient + self.adequate + self.excess + self.dangerous + self.unknown
    }

    pub fn risky(&self) -> usize {
        self.excess + self.dangerous
    }
}

pub fn tier_counts(verdicts: &[NutrientVerdict]) -> TierCounts {
    verdicts.iter().fold(TierCounts::default(), |mut counts, v| {
        match v.risk_tier {
            RiskTier::Deficient => counts.deficient += 1,
            RiskTier::Adequate => counts.adequate += 1,
            RiskTier::Excess => counts.excess += 1,
            RiskTier::Dangerous => counts.dangerous += 1,
            RiskTier::Unknown => counts.unknown += 1,
        }
        counts
    })
}
