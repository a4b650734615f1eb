use std::borrow::Borrow;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Canonical nutrient identifier: lowercase, words joined by `_`.
/// "Vitamin D" and "vitamin-d" both become `vitamin_d`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct NutrientId(String);

static RE_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-_]+").unwrap());

impl NutrientId {
    pub fn new(raw: &str) -> Self {
        let lower = raw.trim().to_lowercase();
        Self(RE_SEPARATORS.replace_all(&lower, "_").trim_matches('_').to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Separator-insensitive key, so "vitamin_d" and "vitamind" collide.
    pub fn compact(&self) -> String {
        self.0.replace('_', "")
    }
}

impl From<String> for NutrientId {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<&str> for NutrientId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<NutrientId> for String {
    fn from(id: NutrientId) -> Self {
        id.0
    }
}

impl Borrow<str> for NutrientId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for NutrientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

/// Label units the normalizer understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    #[serde(rename = "g")]
    G,
    #[serde(rename = "mg")]
    Mg,
    #[serde(rename = "mcg")]
    Mcg,
    #[serde(rename = "IU")]
    Iu,
    #[serde(rename = "%DV")]
    PercentDv,
}

/// Mass unit followed by an optional label qualifier (µg RAE, mg α-TE, mcg DFE).
static RE_UNIT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(g|grams?|mg|milligrams?|mcg|µg|μg|ug|micrograms?|iu|i\.u\.|%\s*(?:dv|daily\s*value)?)(?:\s*(?:rae|dfe|ne|re|α-te|a-te))?$",
    )
    .unwrap()
});

impl Unit {
    /// Parse a raw label unit. Returns None for anything outside the recognized set.
    pub fn parse(raw: &str) -> Option<Self> {
        let lower = raw.trim().to_lowercase();
        let caps = RE_UNIT.captures(&lower)?;
        let base = caps.get(1)?.as_str();
        let unit = match base {
            "g" | "gram" | "grams" => Self::G,
            "mg" | "milligram" | "milligrams" => Self::Mg,
            "mcg" | "µg" | "μg" | "ug" | "microgram" | "micrograms" => Self::Mcg,
            "iu" | "i.u." => Self::Iu,
            _ if base.starts_with('%') => Self::PercentDv,
            _ => return None,
        };
        Some(unit)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::G => "g",
            Self::Mg => "mg",
            Self::Mcg => "mcg",
            Self::Iu => "IU",
            Self::PercentDv => "%DV",
        }
    }

    /// Display form for seniors' screens: micrograms render as µg.
    pub fn display(&self) -> &'static str {
        match self {
            Self::Mcg => "µg",
            other => other.as_str(),
        }
    }

    /// Milligrams per one of this unit, for mass units only.
    pub fn mg_per_unit(&self) -> Option<f64> {
        match self {
            Self::G => Some(1000.0),
            Self::Mg => Some(1.0),
            Self::Mcg => Some(0.001),
            Self::Iu | Self::PercentDv => None,
        }
    }

    pub fn is_mass(&self) -> bool {
        self.mg_per_unit().is_some()
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Amounts
// ---------------------------------------------------------------------------

/// One ingredient line as extracted from a label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutrientAmount {
    pub nutrient_id: NutrientId,
    pub raw_value: f64,
    pub raw_unit: String,
}

impl NutrientAmount {
    pub fn new(nutrient: &str, raw_value: f64, raw_unit: &str) -> Self {
        Self {
            nutrient_id: NutrientId::new(nutrient),
            raw_value,
            raw_unit: raw_unit.to_string(),
        }
    }
}

/// An amount expressed in its nutrient's canonical unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAmount {
    pub nutrient_id: NutrientId,
    pub canonical_value: f64,
    pub canonical_unit: Unit,
}

impl NormalizedAmount {
    /// Format for messages: "25µg", "1.2mg".
    pub fn display(&self) -> String {
        format!("{}{}", format_value(self.canonical_value), self.canonical_unit.display())
    }
}

/// Format a value without trailing zeros.
pub fn format_value(value: f64) -> String {
    if value == value.floor() && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        let s = format!("{value:.3}");
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nutrient_id_canonicalizes() {
        assert_eq!(NutrientId::new("Vitamin D").as_str(), "vitamin_d");
        assert_eq!(NutrientId::new("  vitamin-B12 ").as_str(), "vitamin_b12");
        assert_eq!(NutrientId::new("Folic  Acid").as_str(), "folic_acid");
        assert_eq!(NutrientId::new("calcium").as_str(), "calcium");
    }

    #[test]
    fn nutrient_id_compact_ignores_separators() {
        assert_eq!(NutrientId::new("Vitamin D").compact(), NutrientId::new("VitaminD").compact());
    }

    #[test]
    fn nutrient_id_deserializes_from_raw_name() {
        let id: NutrientId = serde_json::from_str("\"Vitamin C\"").unwrap();
        assert_eq!(id.as_str(), "vitamin_c");
    }

    #[test]
    fn unit_parse_recognized_set() {
        assert_eq!(Unit::parse("mg"), Some(Unit::Mg));
        assert_eq!(Unit::parse("MG"), Some(Unit::Mg));
        assert_eq!(Unit::parse("mcg"), Some(Unit::Mcg));
        assert_eq!(Unit::parse("µg"), Some(Unit::Mcg));
        assert_eq!(Unit::parse("μg"), Some(Unit::Mcg));
        assert_eq!(Unit::parse("ug"), Some(Unit::Mcg));
        assert_eq!(Unit::parse("g"), Some(Unit::G));
        assert_eq!(Unit::parse("IU"), Some(Unit::Iu));
        assert_eq!(Unit::parse("%DV"), Some(Unit::PercentDv));
        assert_eq!(Unit::parse("% DV"), Some(Unit::PercentDv));
        assert_eq!(Unit::parse("%"), Some(Unit::PercentDv));
    }

    #[test]
    fn unit_parse_accepts_label_qualifiers() {
        assert_eq!(Unit::parse("µg RAE"), Some(Unit::Mcg));
        assert_eq!(Unit::parse("mcg DFE"), Some(Unit::Mcg));
        assert_eq!(Unit::parse("mg α-TE"), Some(Unit::Mg));
    }

    #[test]
    fn unit_parse_rejects_unknown() {
        assert_eq!(Unit::parse("kcal"), None);
        assert_eq!(Unit::parse("cfu"), None);
        assert_eq!(Unit::parse("tablet"), None);
        assert_eq!(Unit::parse(""), None);
    }

    #[test]
    fn unit_display_uses_micro_sign() {
        assert_eq!(Unit::Mcg.display(), "µg");
        assert_eq!(Unit::Mg.display(), "mg");
    }

    #[test]
    fn format_value_trims() {
        assert_eq!(format_value(25.0), "25");
        assert_eq!(format_value(1.25), "1.25");
        assert_eq!(format_value(0.1), "0.1");
    }
}
