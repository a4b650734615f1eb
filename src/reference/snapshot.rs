use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::de::DeserializeOwned;

use crate::models::enums::Sex;
use crate::models::{NutrientId, Unit};

use super::types::{AgeBand, InteractionRule, NutrientInfo, RangeRecord, ReferenceRange, Trigger};
use super::ReferenceError;

pub const AGE_BANDS_FILE: &str = "age_bands.json";
pub const NUTRIENTS_FILE: &str = "nutrients.json";
pub const RANGES_FILE: &str = "reference_ranges.json";
pub const RULES_FILE: &str = "interaction_rules.json";

/// Raw reference tables before validation and indexing.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTables {
    pub age_bands: Vec<AgeBand>,
    pub nutrients: Vec<NutrientInfo>,
    pub ranges: Vec<ReferenceRange>,
    /// Registration order is the order of this vector.
    pub rules: Vec<InteractionRule>,
}

/// Immutable, validated reference data. Evaluations borrow it; reloads
/// build a new snapshot instead of mutating this one.
#[derive(Debug)]
pub struct ReferenceSnapshot {
    age_bands: Vec<AgeBand>,
    nutrients: HashMap<NutrientId, NutrientInfo>,
    aliases: HashMap<String, NutrientId>,
    ranges: HashMap<NutrientId, Vec<ReferenceRange>>,
    rules: HashMap<NutrientId, Vec<InteractionRule>>,
}

impl ReferenceSnapshot {
    /// Validate the tables and build lookup indices.
    pub fn build(tables: ReferenceTables) -> Result<Self, ReferenceError> {
        let age_bands = validate_age_bands(tables.age_bands)?;

        let mut nutrients = HashMap::new();
        let mut aliases: HashMap<String, NutrientId> = HashMap::new();
        for info in tables.nutrients {
            validate_nutrient(&info)?;
            let id = info.nutrient_id.clone();

            let keys = std::iter::once(id.compact())
                .chain(info.aliases.iter().map(|a| NutrientId::new(a).compact()));
            for key in keys {
                if let Some(existing) = aliases.get(&key) {
                    if existing != &id {
                        return Err(ReferenceError::Invalid(format!(
                            "alias '{key}' maps to both {existing} and {id}"
                        )));
                    }
                }
                aliases.insert(key, id.clone());
            }

            if nutrients.insert(id.clone(), info).is_some() {
                return Err(ReferenceError::Invalid(format!(
                    "nutrient {id} declared twice (one canonical unit per nutrient)"
                )));
            }
        }

        let band_set: HashSet<AgeBand> = age_bands.iter().copied().collect();
        let mut ranges: HashMap<NutrientId, Vec<ReferenceRange>> = HashMap::new();
        let mut seen_cells = HashSet::new();
        for mut range in tables.ranges {
            range.nutrient_id = declared_id(&aliases, &range.nutrient_id, "range")?;
            validate_range(&range, &band_set)?;
            if let Some(ceiling) = nutrients
                .get(&range.nutrient_id)
                .and_then(|info| info.absolute_ceiling)
            {
                if range.recommended_max > ceiling {
                    return Err(ReferenceError::Invalid(format!(
                        "range {} ({}): recommended_max {} exceeds absolute_ceiling {ceiling}",
                        range.nutrient_id,
                        range.age_band.label(),
                        range.recommended_max
                    )));
                }
            }
            if !seen_cells.insert((range.nutrient_id.clone(), range.age_band, range.sex)) {
                return Err(ReferenceError::Invalid(format!(
                    "duplicate range for {} ({}, {})",
                    range.nutrient_id,
                    range.age_band.label(),
                    range.sex.map_or("any", |s| s.as_str())
                )));
            }
            ranges.entry(range.nutrient_id.clone()).or_default().push(range);
        }

        let mut rules: HashMap<NutrientId, Vec<InteractionRule>> = HashMap::new();
        for mut rule in tables.rules {
            rule.nutrient_id = declared_id(&aliases, &rule.nutrient_id, "interaction rule")?;
            rule.trigger = match rule.trigger.kind {
                crate::models::enums::TriggerKind::Condition => Trigger::condition(&rule.trigger.id),
                crate::models::enums::TriggerKind::Medication => Trigger::medication(&rule.trigger.id),
            };
            if rule.trigger.id.is_empty() {
                return Err(ReferenceError::Invalid(format!(
                    "interaction rule for {} has an empty trigger",
                    rule.nutrient_id
                )));
            }
            rules.entry(rule.nutrient_id.clone()).or_default().push(rule);
        }

        tracing::debug!(
            age_bands = age_bands.len(),
            nutrients = nutrients.len(),
            ranges = seen_cells.len(),
            rules = rules.values().map(Vec::len).sum::<usize>(),
            "Reference snapshot built"
        );

        Ok(Self {
            age_bands,
            nutrients,
            aliases,
            ranges,
            rules,
        })
    }

    /// Load reference data from the four JSON files in `dir`.
    pub fn load(dir: &Path) -> Result<Self, ReferenceError> {
        let age_bands: Vec<AgeBand> = read_json(dir, AGE_BANDS_FILE)?;
        let nutrients: Vec<NutrientInfo> = read_json(dir, NUTRIENTS_FILE)?;
        let records: Vec<RangeRecord> = read_json(dir, RANGES_FILE)?;
        let rules: Vec<InteractionRule> = read_json(dir, RULES_FILE)?;

        let snapshot = Self::build(ReferenceTables {
            age_bands,
            nutrients,
            ranges: convert_records(records)?,
            rules,
        })?;

        tracing::info!(dir = %dir.display(), "Reference data loaded");
        Ok(snapshot)
    }

    /// Load from `dir` when it exists, otherwise fall back to the bundled tables.
    pub fn load_or_bundled(dir: &Path) -> Result<Self, ReferenceError> {
        if dir.is_dir() {
            Self::load(dir)
        } else {
            tracing::info!(dir = %dir.display(), "No reference directory, using bundled data");
            Self::bundled()
        }
    }

    /// Reference data compiled into the binary.
    pub fn bundled() -> Result<Self, ReferenceError> {
        let age_bands: Vec<AgeBand> = parse_json(
            AGE_BANDS_FILE,
            include_str!("../../resources/reference/age_bands.json"),
        )?;
        let nutrients: Vec<NutrientInfo> = parse_json(
            NUTRIENTS_FILE,
            include_str!("../../resources/reference/nutrients.json"),
        )?;
        let records: Vec<RangeRecord> = parse_json(
            RANGES_FILE,
            include_str!("../../resources/reference/reference_ranges.json"),
        )?;
        let rules: Vec<InteractionRule> = parse_json(
            RULES_FILE,
            include_str!("../../resources/reference/interaction_rules.json"),
        )?;

        Self::build(ReferenceTables {
            age_bands,
            nutrients,
            ranges: convert_records(records)?,
            rules,
        })
    }

    // -- lookups ------------------------------------------------------------

    pub fn age_bands(&self) -> &[AgeBand] {
        &self.age_bands
    }

    pub fn age_band_for(&self, age: u32) -> Option<AgeBand> {
        self.age_bands.iter().copied().find(|b| b.contains(age))
    }

    /// Closest band by years; ties go to the older band.
    pub fn nearest_age_band(&self, age: u32) -> Option<AgeBand> {
        self.age_bands
            .iter()
            .copied()
            .min_by_key(|b| (b.distance(age), std::cmp::Reverse(b.min_age)))
    }

    /// Map a label name onto the id the tables use ("Cholecalciferol" -> vitamin_d).
    /// Unknown names come back unchanged.
    pub fn resolve_nutrient(&self, id: &NutrientId) -> NutrientId {
        if self.nutrients.contains_key(id) {
            return id.clone();
        }
        self.aliases
            .get(&id.compact())
            .cloned()
            .unwrap_or_else(|| id.clone())
    }

    pub fn nutrient(&self, id: &NutrientId) -> Option<&NutrientInfo> {
        self.nutrients.get(id)
    }

    /// Declared canonical unit; nutrients missing from the unit table use mg.
    pub fn canonical_unit(&self, id: &NutrientId) -> Unit {
        self.nutrients
            .get(id)
            .map_or(Unit::Mg, |info| info.canonical_unit)
    }

    pub fn display_name(&self, id: &NutrientId) -> String {
        self.nutrients
            .get(id)
            .map_or_else(|| id.as_str().replace('_', " "), |info| info.display_name.clone())
    }

    /// Sex-specific row first, then the row that applies to both sexes.
    pub fn range(&self, id: &NutrientId, band: AgeBand, sex: Sex) -> Option<&ReferenceRange> {
        let rows = self.ranges.get(id)?;
        rows.iter()
            .find(|r| r.age_band == band && r.sex == Some(sex))
            .or_else(|| rows.iter().find(|r| r.age_band == band && r.sex.is_none()))
    }

    /// Rules for a nutrient in registration order.
    pub fn rules_for(&self, id: &NutrientId) -> &[InteractionRule] {
        self.rules.get(id).map_or(&[], Vec::as_slice)
    }

    pub fn nutrient_count(&self) -> usize {
        self.nutrients.len()
    }

    pub fn rule_count(&self) -> usize {
        self.rules.values().map(Vec::len).sum()
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate_age_bands(mut bands: Vec<AgeBand>) -> Result<Vec<AgeBand>, ReferenceError> {
    if bands.is_empty() {
        return Err(ReferenceError::Invalid("no age bands defined".into()));
    }
    bands.sort();

    for band in &bands {
        if let Some(max) = band.max_age {
            if max < band.min_age {
                return Err(ReferenceError::Invalid(format!(
                    "age band {} ends before it starts",
                    band.label()
                )));
            }
        }
    }

    for pair in bands.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        let expected_start = match prev.max_age {
            Some(max) => max + 1,
            None => {
                return Err(ReferenceError::Invalid(format!(
                    "open-ended age band {} must be the last band",
                    prev.label()
                )))
            }
        };
        if next.min_age != expected_start {
            return Err(ReferenceError::Invalid(format!(
                "age bands {} and {} are not contiguous",
                prev.label(),
                next.label()
            )));
        }
    }

    Ok(bands)
}

/// Map a range or rule key onto a declared nutrient id, accepting aliases.
fn declared_id(
    aliases: &HashMap<String, NutrientId>,
    id: &NutrientId,
    what: &str,
) -> Result<NutrientId, ReferenceError> {
    aliases.get(&id.compact()).cloned().ok_or_else(|| {
        ReferenceError::Invalid(format!("{what} for {id} names no declared nutrient"))
    })
}

fn validate_nutrient(info: &NutrientInfo) -> Result<(), ReferenceError> {
    let id = &info.nutrient_id;
    if !info.canonical_unit.is_mass() {
        return Err(ReferenceError::Invalid(format!(
            "canonical unit of {id} must be a mass unit, got {}",
            info.canonical_unit
        )));
    }
    let positive = [
        ("iu_factor", info.iu_factor),
        ("daily_value", info.daily_value),
        ("absolute_ceiling", info.absolute_ceiling),
    ];
    for (field, value) in positive {
        if let Some(v) = value {
            if !v.is_finite() || v <= 0.0 {
                return Err(ReferenceError::Invalid(format!(
                    "{field} of {id} must be positive, got {v}"
                )));
            }
        }
    }
    Ok(())
}

fn validate_range(range: &ReferenceRange, bands: &HashSet<AgeBand>) -> Result<(), ReferenceError> {
    let cell = format!("{} ({})", range.nutrient_id, range.age_band.label());

    if !bands.contains(&range.age_band) {
        return Err(ReferenceError::Invalid(format!(
            "range {cell} uses an undeclared age band"
        )));
    }

    let values = [Some(range.recommended_min), Some(range.recommended_max), range.upper_limit];
    if values.iter().flatten().any(|v| !v.is_finite() || *v < 0.0) {
        return Err(ReferenceError::Invalid(format!(
            "range {cell} has a negative or non-finite bound"
        )));
    }

    if range.recommended_min > range.recommended_max {
        return Err(ReferenceError::Invalid(format!(
            "range {cell}: recommended_min {} exceeds recommended_max {}",
            range.recommended_min, range.recommended_max
        )));
    }

    if let Some(point) = range.recommended {
        if point < range.recommended_min || point > range.recommended_max {
            return Err(ReferenceError::Invalid(format!(
                "range {cell}: recommended {point} lies outside {}..{}",
                range.recommended_min, range.recommended_max
            )));
        }
    }

    if let Some(ul) = range.upper_limit {
        if range.recommended_max > ul {
            return Err(ReferenceError::Invalid(format!(
                "range {cell}: recommended_max {} exceeds upper_limit {ul}",
                range.recommended_max
            )));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// File helpers
// ---------------------------------------------------------------------------

fn read_json<T: DeserializeOwned>(dir: &Path, file: &str) -> Result<T, ReferenceError> {
    let path = dir.join(file);
    let json = std::fs::read_to_string(&path)
        .map_err(|e| ReferenceError::Load(path.display().to_string(), e.to_string()))?;
    parse_json(file, &json)
}

fn parse_json<T: DeserializeOwned>(file: &str, json: &str) -> Result<T, ReferenceError> {
    serde_json::from_str(json).map_err(|e| ReferenceError::Parse(file.into(), e.to_string()))
}

fn convert_records(records: Vec<RangeRecord>) -> Result<Vec<ReferenceRange>, ReferenceError> {
    records
        .into_iter()
        .map(|r| r.into_range().map_err(ReferenceError::Invalid))
        .collect()
}

// ---------------------------------------------------------------------------
// Test fixtures
// ---------------------------------------------------------------------------

#[cfg(test)]
impl ReferenceSnapshot {
    /// Small fixture table set: bands 19-49 / 50-64 / 65-74 / 75+.
    pub fn test_tables() -> ReferenceTables {
        use crate::models::enums::InteractionSeverity;

        let bands = vec![
            AgeBand::new(19, Some(49)),
            AgeBand::new(50, Some(64)),
            AgeBand::new(65, Some(74)),
            AgeBand::new(75, None),
        ];

        let nutrient = |id: &str, name: &str, unit: Unit| NutrientInfo {
            nutrient_id: NutrientId::new(id),
            display_name: name.into(),
            canonical_unit: unit,
            iu_factor: None,
            daily_value: None,
            absolute_ceiling: None,
            aliases: vec![],
        };

        let nutrients = vec![
            NutrientInfo {
                iu_factor: Some(0.025),
                daily_value: Some(20.0),
                aliases: vec!["cholecalciferol".into(), "vitamin d3".into()],
                ..nutrient("vitamin_d", "Vitamin D", Unit::Mcg)
            },
            NutrientInfo {
                daily_value: Some(1300.0),
                ..nutrient("calcium", "Calcium", Unit::Mg)
            },
            NutrientInfo {
                daily_value: Some(90.0),
                aliases: vec!["ascorbic acid".into()],
                ..nutrient("vitamin_c", "Vitamin C", Unit::Mg)
            },
            NutrientInfo {
                iu_factor: Some(0.67),
                daily_value: Some(15.0),
                ..nutrient("vitamin_e", "Vitamin E", Unit::Mg)
            },
            NutrientInfo {
                absolute_ceiling: Some(1000.0),
                ..nutrient("vitamin_k", "Vitamin K", Unit::Mcg)
            },
            nutrient("zinc", "Zinc", Unit::Mg),
        ];

        let mut ranges = Vec::new();
        for band in &bands {
            let row = |id: &str, sex: Option<Sex>, min: f64, max: f64, ul: Option<f64>| {
                ReferenceRange {
                    nutrient_id: NutrientId::new(id),
                    age_band: *band,
                    sex,
                    recommended_min: min,
                    recommended: None,
                    recommended_max: max,
                    upper_limit: ul,
                    source: Some("test fixture".into()),
                }
            };
            ranges.push(row("vitamin_d", None, 10.0, 20.0, Some(50.0)));
            ranges.push(row("calcium", None, 1000.0, 1200.0, Some(2500.0)));
            ranges.push(row("calcium", Some(Sex::Female), 1200.0, 1500.0, Some(2000.0)));
            ranges.push(row("vitamin_c", None, 75.0, 200.0, Some(2000.0)));
            ranges.push(row("vitamin_e", None, 15.0, 100.0, Some(1000.0)));
            ranges.push(row("vitamin_k", None, 90.0, 120.0, None));
            ranges.push(row("zinc", Some(Sex::Male), 11.0, 20.0, Some(40.0)));
        }

        let rule = |nutrient: &str, trigger: Trigger, severity, message: &str| InteractionRule {
            nutrient_id: NutrientId::new(nutrient),
            trigger,
            severity,
            message: message.into(),
        };

        let rules = vec![
            rule(
                "calcium",
                Trigger::condition("osteoporosis"),
                InteractionSeverity::Info,
                "Calcium supports bone density.",
            ),
            rule(
                "calcium",
                Trigger::condition("kidney_stones"),
                InteractionSeverity::Caution,
                "Supplemental calcium may raise kidney stone risk.",
            ),
            rule(
                "calcium",
                Trigger::medication("thiazide_diuretic"),
                InteractionSeverity::Contraindicated,
                "Thiazide diuretics reduce calcium excretion; added calcium can push blood calcium too high.",
            ),
            rule(
                "vitamin_d",
                Trigger::condition("osteoporosis"),
                InteractionSeverity::Info,
                "Vitamin D helps calcium absorption.",
            ),
            rule(
                "vitamin_d",
                Trigger::condition("hypercalcemia"),
                InteractionSeverity::Contraindicated,
                "Vitamin D raises blood calcium.",
            ),
            rule(
                "vitamin_e",
                Trigger::medication("warfarin"),
                InteractionSeverity::Caution,
                "High-dose vitamin E can add to warfarin's bleeding effect.",
            ),
            rule(
                "vitamin_e",
                Trigger::medication("aspirin"),
                InteractionSeverity::Caution,
                "Vitamin E and aspirin both reduce clotting.",
            ),
            rule(
                "vitamin_k",
                Trigger::medication("warfarin"),
                InteractionSeverity::Contraindicated,
                "Vitamin K counteracts warfarin.",
            ),
        ];

        ReferenceTables {
            age_bands: bands,
            nutrients,
            ranges,
            rules,
        }
    }

    pub fn load_test() -> Self {
        Self::build(Self::test_tables()).unwrap()
    }
}
