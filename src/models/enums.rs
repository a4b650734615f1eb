use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// Variant order doubles as the `Ord` ranking.
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(Sex {
    Male => "male",
    Female => "female",
});

impl Sex {
    /// Accepts the spellings profile forms actually send ("M", "Female", "남자", ...).
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "male" | "m" | "man" | "남자" | "남성" | "남" => Some(Self::Male),
            "female" | "f" | "woman" | "여자" | "여성" | "여" => Some(Self::Female),
            _ => None,
        }
    }
}

str_enum!(RiskTier {
    Deficient => "deficient",
    Adequate => "adequate",
    Excess => "excess",
    Dangerous => "dangerous",
    Unknown => "unknown",
});

impl RiskTier {
    /// Tiers counted by the repeated-risk counter.
    pub fn is_risky(&self) -> bool {
        matches!(self, Self::Excess | Self::Dangerous)
    }
}

str_enum!(OverallSignal {
    Green => "green",
    Yellow => "yellow",
    Red => "red",
});

str_enum!(InteractionSeverity {
    Info => "info",
    Caution => "caution",
    Contraindicated => "contraindicated",
});

str_enum!(TriggerKind {
    Condition => "condition",
    Medication => "medication",
});

str_enum!(TrendDirection {
    Increasing => "increasing",
    Decreasing => "decreasing",
    Stable => "stable",
});

str_enum!(IssueKind {
    UnitError => "unit_error",
    MissingReference => "missing_reference",
    OutOfRangeProfile => "out_of_range_profile",
});

str_enum!(AgeBandPolicy {
    Refuse => "refuse",
    NearestBand => "nearest_band",
});
