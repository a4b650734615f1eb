use crate::models::{NormalizedAmount, NutrientAmount, NutrientId, Unit};
use crate::reference::ReferenceSnapshot;

use super::types::AnalysisError;

/// Decimal places kept after conversion.
const PRECISION: f64 = 1_000_000.0;

/// Convert a label amount into its nutrient's canonical unit.
///
/// Mass units convert directly; IU uses the nutrient's IU factor and %DV its
/// daily value. Nutrients absent from the unit table normalize to mg.
pub fn normalize(
    amount: &NutrientAmount,
    reference: &ReferenceSnapshot,
) -> Result<NormalizedAmount, AnalysisError> {
    let nutrient_id = reference.resolve_nutrient(&amount.nutrient_id);

    if !amount.raw_value.is_finite() || amount.raw_value < 0.0 {
        return Err(unit_error(
            &nutrient_id,
            &amount.raw_unit,
            format!("amount {} is not a valid quantity", amount.raw_value),
        ));
    }

    let unit = Unit::parse(&amount.raw_unit).ok_or_else(|| {
        unit_error(&nutrient_id, &amount.raw_unit, "unrecognized unit".into())
    })?;

    let info = reference.nutrient(&nutrient_id);
    let canonical_unit = reference.canonical_unit(&nutrient_id);

    let value = match unit {
        Unit::G | Unit::Mg | Unit::Mcg => convert_mass(amount.raw_value, unit, canonical_unit),
        Unit::Iu => {
            let info = info.ok_or_else(|| missing_reference(&nutrient_id, "no unit metadata for IU"))?;
            let factor = info.iu_factor.ok_or_else(|| {
                unit_error(
                    &nutrient_id,
                    &amount.raw_unit,
                    format!("{} has no IU conversion", info.display_name),
                )
            })?;
            amount.raw_value * factor
        }
        Unit::PercentDv => {
            let daily_value = info
                .and_then(|i| i.daily_value)
                .ok_or_else(|| missing_reference(&nutrient_id, "no daily value for %DV"))?;
            amount.raw_value / 100.0 * daily_value
        }
    };

    Ok(NormalizedAmount {
        nutrient_id,
        canonical_value: round6(value),
        canonical_unit,
    })
}

fn convert_mass(value: f64, from: Unit, to: Unit) -> f64 {
    match (from.mg_per_unit(), to.mg_per_unit()) {
        _ if from == to => value,
        (Some(from_mg), Some(to_mg)) => value * from_mg / to_mg,
        _ => value,
    }
}

pub(crate) fn round6(value: f64) -> f64 {
    (value * PRECISION).round() / PRECISION
}

fn unit_error(nutrient: &NutrientId, unit: &str, reason: String) -> AnalysisError {
    AnalysisError::Unit {
        nutrient: nutrient.clone(),
        unit: unit.to_string(),
        reason,
    }
}

fn missing_reference(nutrient: &NutrientId, detail: &str) -> AnalysisError {
    AnalysisError::MissingReference {
        nutrient: nutrient.clone(),
        detail: detail.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot() -> ReferenceSnapshot {
        ReferenceSnapshot::load_test()
    }

    #[test]
    fn mass_units_convert_to_canonical() {
        let r = snapshot();
        let d = normalize(&NutrientAmount::new("Vitamin D", 0.025, "mg"), &r).unwrap();
        assert_eq!(d.canonical_value, 25.0);
        assert_eq!(d.canonical_unit, Unit::Mcg);

        let ca = normalize(&NutrientAmount::new("Calcium", 1.2, "g"), &r).unwrap();
        assert_eq!(ca.canonical_value, 1200.0);
        assert_eq!(ca.canonical_unit, Unit::Mg);
    }

    #[test]
    fn microgram_spellings_are_equivalent() {
        let r = snapshot();
        for unit in ["mcg", "µg", "μg", "ug", "µg RAE"] {
            let n = normalize(&NutrientAmount::new("vitamin_d", 10.0, unit), &r).unwrap();
            assert_eq!(n.canonical_value, 10.0, "unit {unit}");
        }
    }

    #[test]
    fn iu_uses_nutrient_factor() {
        let r = snapshot();
        let d = normalize(&NutrientAmount::new("vitamin d", 1000.0, "IU"), &r).unwrap();
        assert_eq!(d.canonical_value, 25.0);

        let e = normalize(&NutrientAmount::new("vitamin e", 30.0, "IU"), &r).unwrap();
        assert_eq!(e.canonical_value, 20.1);
    }

    #[test]
    fn iu_without_factor_is_unit_error() {
        let r = snapshot();
        let err = normalize(&NutrientAmount::new("calcium", 100.0, "IU"), &r).unwrap_err();
        assert!(matches!(err, AnalysisError::Unit { .. }));
    }

    #[test]
    fn percent_dv_uses_daily_value() {
        let r = snapshot();
        let ca = normalize(&NutrientAmount::new("calcium", 50.0, "%DV"), &r).unwrap();
        assert_eq!(ca.canonical_value, 650.0);
    }

    #[test]
    fn percent_dv_without_daily_value_is_missing_reference() {
        let r = snapshot();
        let err = normalize(&NutrientAmount::new("zinc", 100.0, "%"), &r).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingReference { .. }));
    }

    #[test]
    fn unknown_nutrient_normalizes_mass_to_mg() {
        let r = snapshot();
        let boron = normalize(&NutrientAmount::new("Boron", 3000.0, "mcg"), &r).unwrap();
        assert_eq!(boron.canonical_value, 3.0);
        assert_eq!(boron.canonical_unit, Unit::Mg);

        let err = normalize(&NutrientAmount::new("Boron", 10.0, "IU"), &r).unwrap_err();
        assert!(matches!(err, AnalysisError::MissingReference { .. }));
    }

    #[test]
    fn unrecognized_unit_is_unit_error() {
        let r = snapshot();
        let err = normalize(&NutrientAmount::new("zinc", 1.0, "tablespoon"), &r).unwrap_err();
        assert!(matches!(err, AnalysisError::Unit { ref unit, .. } if unit == "tablespoon"));
    }

    #[test]
    fn negative_amount_is_unit_error() {
        let r = snapshot();
        assert!(normalize(&NutrientAmount::new("zinc", -1.0, "mg"), &r).is_err());
        assert!(normalize(&NutrientAmount::new("zinc", f64::NAN, "mg"), &r).is_err());
    }

    #[test]
    fn alias_resolves_to_canonical_id() {
        let r = snapshot();
        let n = normalize(&NutrientAmount::new("Cholecalciferol", 800.0, "IU"), &r).unwrap();
        assert_eq!(n.nutrient_id.as_str(), "vitamin_d");
        assert_eq!(n.canonical_value, 20.0);
    }

    #[test]
    fn result_is_rounded_to_six_places() {
        let r = snapshot();
        let n = normalize(&NutrientAmount::new("calcium", 1.0, "mcg"), &r).unwrap();
        assert_eq!(n.canonical_value, 0.001);
        let n = normalize(&NutrientAmount::new("calcium", 1.0, "µg"), &r).unwrap();
        assert_eq!(n.canonical_value, round6(0.001));
    }

    /// Normalizing an already-normalized amount is a no-op.
    #[test]
    fn normalize_is_idempotent() {
        let r = snapshot();
        let inputs = [
            NutrientAmount::new("Vitamin D", 1000.0, "IU"),
            NutrientAmount::new("Vitamin E", 33.3, "IU"),
            NutrientAmount::new("Calcium", 35.0, "%DV"),
            NutrientAmount::new("Vitamin C", 0.5, "g"),
            NutrientAmount::new("Boron", 1234.5678, "µg"),
        ];
        for input in inputs {
            let once = normalize(&input, &r).unwrap();
            let again = normalize(
                &NutrientAmount::new(
                    once.nutrient_id.as_str(),
                    once.canonical_value,
                    once.canonical_unit.as_str(),
                ),
                &r,
            )
            .unwrap();
            assert_eq!(once, again);
        }
    }
}
