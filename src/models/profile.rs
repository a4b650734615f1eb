use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

use super::enums::Sex;

/// Health profile supplied by the profile-management side of the app.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub age: u32,
    #[serde(deserialize_with = "deserialize_sex")]
    pub sex: Sex,
    #[serde(default)]
    pub conditions: BTreeSet<String>,
    #[serde(default)]
    pub medications: BTreeSet<String>,
}

impl UserProfile {
    pub fn new(age: u32, sex: Sex) -> Self {
        Self {
            age,
            sex,
            conditions: BTreeSet::new(),
            medications: BTreeSet::new(),
        }
    }

    pub fn with_condition(mut self, condition: &str) -> Self {
        self.conditions.insert(normalize_trigger_id(condition));
        self
    }

    pub fn with_medication(mut self, medication: &str) -> Self {
        self.medications.insert(normalize_trigger_id(medication));
        self
    }

    /// Same profile with every condition/medication id in canonical form.
    pub fn normalized(&self) -> Self {
        Self {
            age: self.age,
            sex: self.sex,
            conditions: self.conditions.iter().map(|c| normalize_trigger_id(c)).collect(),
            medications: self.medications.iter().map(|m| normalize_trigger_id(m)).collect(),
        }
    }
}

fn deserialize_sex<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Sex, D::Error> {
    let raw = String::deserialize(deserializer)?;
    Sex::parse_lenient(&raw)
        .ok_or_else(|| serde::de::Error::custom(format!("unrecognized sex '{raw}'")))
}

/// Condition and medication ids compare lowercase with `_` between words.
pub fn normalize_trigger_id(raw: &str) -> String {
    raw.split(|c: char| c.is_whitespace() || c == '-' || c == '_')
        .filter(|part| !part.is_empty())
        .map(|part| part.to_lowercase())
        .collect::<Vec<_>>()
        .join("_")
}
