use serde::{Deserialize, Serialize};

use crate::models::enums::{InteractionSeverity, Sex, TriggerKind};
use crate::models::{normalize_trigger_id, NutrientId, Unit, UserProfile};

/// Inclusive age interval. `max_age = None` means open-ended ("75+").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgeBand {
    pub min_age: u32,
    pub max_age: Option<u32>,
}

impl AgeBand {
    pub fn new(min_age: u32, max_age: Option<u32>) -> Self {
        Self { min_age, max_age }
    }

    pub fn contains(&self, age: u32) -> bool {
        age >= self.min_age && self.max_age.map_or(true, |max| age <= max)
    }

    /// Years between `age` and the nearest edge of this band (0 inside).
    pub fn distance(&self, age: u32) -> u32 {
        if age < self.min_age {
            self.min_age - age
        } else {
            match self.max_age {
                Some(max) if age > max => age - max,
                _ => 0,
            }
        }
    }

    pub fn label(&self) -> String {
        match self.max_age {
            Some(max) => format!("{}-{}", self.min_age, max),
            None => format!("{}+", self.min_age),
        }
    }
}

/// Per-nutrient unit metadata: the canonical unit plus conversion factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientInfo {
    pub nutrient_id: NutrientId,
    pub display_name: String,
    pub canonical_unit: Unit,
    /// Canonical units per IU (vitamin D: 0.025 mcg/IU).
    #[serde(default)]
    pub iu_factor: Option<f64>,
    /// Daily value in the canonical unit, used for %DV labels.
    #[serde(default)]
    pub daily_value: Option<f64>,
    /// Hard ceiling for nutrients without a tolerable upper intake level.
    #[serde(default)]
    pub absolute_ceiling: Option<f64>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// Reference intake range for one (nutrient, age band, sex) cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceRange {
    pub nutrient_id: NutrientId,
    pub age_band: AgeBand,
    /// `None` applies to both sexes.
    pub sex: Option<Sex>,
    pub recommended_min: f64,
    pub recommended: Option<f64>,
    pub recommended_max: f64,
    pub upper_limit: Option<f64>,
    pub source: Option<String>,
}

impl ReferenceRange {
    /// Point value used for percent-of-recommended figures.
    pub fn recommended_point(&self) -> f64 {
        self.recommended
            .unwrap_or((self.recommended_min + self.recommended_max) / 2.0)
    }
}

/// Range row as written in `reference_ranges.json`. Rows that only carry a
/// `recommended` amount get the 50%–150% band around it.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RangeRecord {
    pub nutrient_id: NutrientId,
    pub age_band: AgeBand,
    #[serde(default)]
    pub sex: Option<Sex>,
    #[serde(default)]
    pub recommended_min: Option<f64>,
    #[serde(default)]
    pub recommended: Option<f64>,
    #[serde(default)]
    pub recommended_max: Option<f64>,
    #[serde(default)]
    pub upper_limit: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}

pub(crate) const DERIVED_MIN_FACTOR: f64 = 0.5;
pub(crate) const DERIVED_MAX_FACTOR: f64 = 1.5;

impl RangeRecord {
    pub fn into_range(self) -> Result<ReferenceRange, String> {
        let (min, max) = match (self.recommended_min, self.recommended_max, self.recommended) {
            (Some(min), Some(max), _) => (min, max),
            (min, max, Some(rec)) => (
                min.unwrap_or(round2(rec * DERIVED_MIN_FACTOR)),
                max.unwrap_or(round2(rec * DERIVED_MAX_FACTOR)),
            ),
            _ => {
                return Err(format!(
                    "range for {} ({}) needs recommended_min/max or recommended",
                    self.nutrient_id,
                    self.age_band.label()
                ))
            }
        };

        Ok(ReferenceRange {
            nutrient_id: self.nutrient_id,
            age_band: self.age_band,
            sex: self.sex,
            recommended_min: min,
            recommended: self.recommended,
            recommended_max: max,
            upper_limit: self.upper_limit,
            source: self.source,
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// What an interaction rule reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Trigger {
    pub kind: TriggerKind,
    pub id: String,
}

impl Trigger {
    pub fn condition(id: &str) -> Self {
        Self {
            kind: TriggerKind::Condition,
            id: normalize_trigger_id(id),
        }
    }

    pub fn medication(id: &str) -> Self {
        Self {
            kind: TriggerKind::Medication,
            id: normalize_trigger_id(id),
        }
    }

    /// `profile` must already hold normalized ids.
    pub fn matches(&self, profile: &UserProfile) -> bool {
        match self.kind {
            TriggerKind::Condition => profile.conditions.contains(&self.id),
            TriggerKind::Medication => profile.medications.contains(&self.id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRule {
    pub nutrient_id: NutrientId,
    pub trigger: Trigger,
    pub severity: InteractionSeverity,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn age_band_contains_inclusive() {
        let band = AgeBand::new(65, Some(74));
        assert!(band.contains(65));
        assert!(band.contains(74));
        assert!(!band.contains(75));
        assert!(AgeBand::new(75, None).contains(104));
    }

    #[test]
    fn age_band_distance() {
        let band = AgeBand::new(50, Some(64));
        assert_eq!(band.distance(40), 10);
        assert_eq!(band.distance(55), 0);
        assert_eq!(band.distance(70), 6);
        assert_eq!(AgeBand::new(75, None).distance(120), 0);
    }

    #[test]
    fn age_band_labels() {
        assert_eq!(AgeBand::new(65, Some(74)).label(), "65-74");
        assert_eq!(AgeBand::new(75, None).label(), "75+");
    }

    #[test]
    fn range_record_derives_band_from_recommended() {
        let record: RangeRecord = serde_json::from_str(
            r#"{"nutrient_id": "vitamin_c", "age_band": {"min_age": 65, "max_age": 74},
                "recommended": 100.0, "upper_limit": 2000.0}"#,
        )
        .unwrap();
        let range = record.into_range().unwrap();
        assert_eq!(range.recommended_min, 50.0);
        assert_eq!(range.recommended_max, 150.0);
        assert_eq!(range.sex, None);
        assert_eq!(range.recommended_point(), 100.0);
    }

    #[test]
    fn range_record_without_bounds_is_rejected() {
        let record: RangeRecord = serde_json::from_str(
            r#"{"nutrient_id": "zinc", "age_band": {"min_age": 19, "max_age": 49}}"#,
        )
        .unwrap();
        assert!(record.into_range().is_err());
    }

    #[test]
    fn trigger_matches_normalized_profile() {
        let profile = UserProfile::new(70, Sex::Male).with_medication("Warfarin");
        assert!(Trigger::medication("warfarin").matches(&profile));
        assert!(!Trigger::condition("warfarin").matches(&profile));
    }
}
