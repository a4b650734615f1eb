use std::path::PathBuf;

use crate::models::enums::AgeBandPolicy;

/// Application-level constants
pub const APP_NAME: &str = "Nutriscan";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const HOME_ENV: &str = "NUTRISCAN_HOME";
pub const AGE_BAND_POLICY_ENV: &str = "NUTRISCAN_AGE_BAND_POLICY";
pub const TREND_TOLERANCE_ENV: &str = "NUTRISCAN_TREND_TOLERANCE_PCT";

/// Relative change (percent) below which a trend counts as stable.
pub const DEFAULT_TREND_TOLERANCE_PCT: f64 = 5.0;

/// Get the application data directory.
/// `$NUTRISCAN_HOME` when set, otherwise ~/Nutriscan/.
pub fn app_data_dir() -> PathBuf {
    if let Some(home) = std::env::var_os(HOME_ENV) {
        return PathBuf::from(home);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Reference tables (age_bands.json, nutrients.json, ...)
pub fn reference_dir() -> PathBuf {
    app_data_dir().join("reference")
}

pub fn database_path() -> PathBuf {
    app_data_dir().join("reports.db")
}

/// Log filter used when RUST_LOG is unset.
pub fn default_log_filter() -> &'static str {
    if cfg!(debug_assertions) {
        "nutriscan_lib=debug,nutriscan=debug,info"
    } else {
        "nutriscan_lib=info,nutriscan=info,warn"
    }
}

// ---------------------------------------------------------------------------
// AnalysisConfig
// ---------------------------------------------------------------------------

/// Tunables for evaluation and trend analysis.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    /// What to do when the user's age is outside every reference band.
    pub age_band_policy: AgeBandPolicy,
    pub trend_stable_tolerance_pct: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            age_band_policy: AgeBandPolicy::Refuse,
            trend_stable_tolerance_pct: DEFAULT_TREND_TOLERANCE_PCT,
        }
    }
}

impl AnalysisConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup. Unparseable values keep the default.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(raw) = lookup(AGE_BAND_POLICY_ENV) {
            match raw.trim().to_lowercase().parse::<AgeBandPolicy>() {
                Ok(policy) => config.age_band_policy = policy,
                Err(e) => tracing::warn!(value = %raw, error = %e, "Ignoring {AGE_BAND_POLICY_ENV}"),
            }
        }

        if let Some(raw) = lookup(TREND_TOLERANCE_ENV) {
            match raw.trim().parse::<f64>() {
                Ok(pct) if pct.is_finite() && pct >= 0.0 => config.trend_stable_tolerance_pct = pct,
                _ => tracing::warn!(value = %raw, "Ignoring {TREND_TOLERANCE_ENV}"),
            }
        }

        config
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn paths_under_app_data() {
        let app = app_data_dir();
        assert!(reference_dir().starts_with(&app));
        assert!(reference_dir().ends_with("reference"));
        assert!(database_path().ends_with("reports.db"));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.1.0");
    }

    #[test]
    fn defaults_refuse_and_five_percent() {
        let config = AnalysisConfig::from_lookup(lookup(&[]));
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.age_band_policy, AgeBandPolicy::Refuse);
        assert_eq!(config.trend_stable_tolerance_pct, 5.0);
    }

    #[test]
    fn reads_overrides() {
        let config = AnalysisConfig::from_lookup(lookup(&[
            (AGE_BAND_POLICY_ENV, "Nearest_Band"),
            (TREND_TOLERANCE_ENV, "10"),
        ]));
        assert_eq!(config.age_band_policy, AgeBandPolicy::NearestBand);
        assert_eq!(config.trend_stable_tolerance_pct, 10.0);
    }

    #[test]
    fn invalid_values_keep_defaults() {
        let config = AnalysisConfig::from_lookup(lookup(&[
            (AGE_BAND_POLICY_ENV, "guess"),
            (TREND_TOLERANCE_ENV, "-3"),
        ]));
        assert_eq!(config, AnalysisConfig::default());
    }
}
