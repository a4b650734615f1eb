use std::cmp::Reverse;

use crate::models::enums::InteractionSeverity;
use crate::models::{NutrientId, UserProfile};
use crate::reference::{InteractionRule, ReferenceSnapshot};

/// Rules for `nutrient_id` whose trigger is among the profile's conditions or
/// medications. Strongest first; equal severities keep registration order.
pub fn check_interactions(
    nutrient_id: &NutrientId,
    profile: &UserProfile,
    reference: &ReferenceSnapshot,
) -> Vec<InteractionRule> {
    let nutrient_id = reference.resolve_nutrient(nutrient_id);
    let profile = profile.normalized();

    let mut matched: Vec<InteractionRule> = reference
        .rules_for(&nutrient_id)
        .iter()
        .filter(|rule| rule.trigger.matches(&profile))
        .cloned()
        .collect();

    matched.sort_by_key(|rule| Reverse(rule.severity));
    matched
}

/// Highest severity among `rules`, if any.
pub fn strongest(rules: &[InteractionRule]) -> Option<InteractionSeverity> {
    rules.iter().map(|r| r.severity).max()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::enums::Sex;

    #[test]
    fn no_conditions_no_matches() {
        let r = ReferenceSnapshot::load_test();
        let profile = UserProfile::new(70, Sex::Female);
        assert!(check_interactions(&NutrientId::new("calcium"), &profile, &r).is_empty());
    }

    #[test]
    fn orders_by_severity_then_registration() {
        let r = ReferenceSnapshot::load_test();
        let profile = UserProfile::new(70, Sex::Female)
            .with_condition("osteoporosis")
            .with_condition("kidney stones")
            .with_medication("Thiazide Diuretic");
        let rules = check_interactions(&NutrientId::new("calcium"), &profile, &r);
        let severities: Vec<_> = rules.iter().map(|r| r.severity).collect();
        assert_eq!(
            severities,
            vec![
                InteractionSeverity::Contraindicated,
                InteractionSeverity::Caution,
                InteractionSeverity::Info,
            ]
        );
    }

    #[test]
    fn equal_severity_keeps_table_order() {
        let r = ReferenceSnapshot::load_test();
        let profile = UserProfile::new(70, Sex::Male)
            .with_medication("aspirin")
            .with_medication("warfarin");
        let rules = check_interactions(&NutrientId::new("vitamin_e"), &profile, &r);
        let triggers: Vec<_> = rules.iter().map(|r| r.trigger.id.as_str()).collect();
        assert_eq!(triggers, vec!["warfarin", "aspirin"]);
    }

    #[test]
    fn raw_profile_ids_are_normalized() {
        let r = ReferenceSnapshot::load_test();
        let mut profile = UserProfile::new(70, Sex::Male);
        profile.medications.insert("Warfarin".into());
        let rules = check_interactions(&NutrientId::new("Vitamin K"), &profile, &r);
        assert_eq!(rules.len(), 1);
        assert_eq!(strongest(&rules), Some(InteractionSeverity::Contraindicated));
    }

    #[test]
    fn condition_and_medication_triggers_are_distinct() {
        let r = ReferenceSnapshot::load_test();
        let profile = UserProfile::new(70, Sex::Male).with_condition("warfarin");
        assert!(check_interactions(&NutrientId::new("vitamin_k"), &profile, &r).is_empty());
    }
}
