//! Stage 2: checks that correlate two or more fields.

use std::collections::HashSet;

use crate::submission::{option_path, DraftSubmission};
use crate::validation::errors::ValidationErrors;
use crate::validation::rules::{is_landline_shape, is_mobile_shape, is_toll_free, PlanOptionMatrix};
use crate::validation::ValidationMode;

/// Error path for the combined phone number.
pub const PHONE_PATH: &str = "phone";

pub fn check_cross_field(
    draft: &DraftSubmission,
    matrix: &PlanOptionMatrix,
    mode: ValidationMode,
) -> ValidationErrors {
    let mut errors = ValidationErrors::new();
    // In draft mode a correlation only runs once all of its inputs are filled.
    let strict = mode == ValidationMode::Strict;

    if strict || (!draft.email.is_empty() && !draft.email_confirmation.is_empty()) {
        check_email_confirmation(draft, &mut errors);
    }
    if strict || draft.phone.is_complete() {
        check_phone(draft, &mut errors);
    }
    if strict || !draft.plan_code.is_empty() {
        check_plan_options(draft, matrix, &mut errors);
    }

    errors
}

fn check_email_confirmation(draft: &DraftSubmission, errors: &mut ValidationErrors) {
    if draft.email != draft.email_confirmation {
        errors.add("email_confirmation", "does not match email");
    }
}

fn check_phone(draft: &DraftSubmission, errors: &mut ValidationErrors) {
    let digits = draft.phone.concatenated();
    if is_toll_free(&digits) {
        errors.add(PHONE_PATH, "toll-free numbers are not accepted");
    } else if !is_mobile_shape(&digits) && !is_landline_shape(&digits) {
        errors.add(PHONE_PATH, "is not a valid mobile or landline number");
    }
}

fn check_plan_options(draft: &DraftSubmission, matrix: &PlanOptionMatrix, errors: &mut ValidationErrors) {
    if !matrix.has_plan(&draft.plan_code) {
        errors.add("plan_code", "is not an available plan");
        return;
    }

    let mut seen = HashSet::new();
    for (index, code) in draft.option_codes.iter().enumerate() {
        if !seen.insert(code.as_str()) {
            errors.add(option_path(index), "is selected more than once");
        } else if !matrix.allows(&draft.plan_code, code) {
            errors.add(option_path(index), "cannot be combined with the selected plan");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CatalogConfig;
    use crate::submission::PhoneNumber;
    use crate::validation::test_support::valid_draft;

    fn matrix() -> PlanOptionMatrix {
        PlanOptionMatrix::from_config(&CatalogConfig::default())
    }

    fn phone_errors(p1: &str, p2: &str, p3: &str) -> ValidationErrors {
        let mut draft = valid_draft();
        draft.phone = PhoneNumber::new(p1, p2, p3);
        check_cross_field(&draft, &matrix(), ValidationMode::Strict)
    }

    #[test]
    fn test_valid_draft_passes() {
        assert!(check_cross_field(&valid_draft(), &matrix(), ValidationMode::Strict).is_empty());
    }

    #[test]
    fn test_email_mismatch_keyed_to_confirmation_only() {
        let mut draft = valid_draft();
        draft.email_confirmation = "taro@example.com".into();
        let errors = check_cross_field(&draft, &matrix(), ValidationMode::Strict);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("email_confirmation"), Some("does not match email"));
        assert!(!errors.contains("email"));
    }

    #[test]
    fn test_email_comparison_is_exact() {
        let mut draft = valid_draft();
        draft.email_confirmation = draft.email.to_uppercase();
        let errors = check_cross_field(&draft, &matrix(), ValidationMode::Strict);
        assert!(errors.contains("email_confirmation"));
    }

    #[test]
    fn test_phone_cases() {
        assert!(phone_errors("090", "1234", "5678").is_empty());
        assert!(phone_errors("03", "1234", "5678").is_empty());
        assert_eq!(
            phone_errors("0120", "123", "4567").get(PHONE_PATH),
            Some("toll-free numbers are not accepted")
        );
        assert_eq!(
            phone_errors("050", "1234", "5678").get(PHONE_PATH),
            Some("is not a valid mobile or landline number")
        );
        assert!(phone_errors("0800", "123", "4567").contains(PHONE_PATH));
        assert!(phone_errors("00", "1234", "5678").contains(PHONE_PATH));
    }

    #[test]
    fn test_plan_with_own_options_passes() {
        let mut draft = valid_draft();
        draft.plan_code = "PREMIUM".into();
        draft.option_codes = vec![
            "OPT_PRM_CONCIERGE".into(),
            "OPT_PRM_STATIC_IP".into(),
            "OPT_BACKUP".into(),
        ];
        assert!(check_cross_field(&draft, &matrix(), ValidationMode::Strict).is_empty());
    }

    #[test]
    fn test_other_plans_exclusive_option_fails() {
        let mut draft = valid_draft();
        draft.plan_code = "BASIC".into();
        draft.option_codes = vec!["OPT_SUPPORT".into(), "OPT_PRM_STATIC_IP".into()];
        let errors = check_cross_field(&draft, &matrix(), ValidationMode::Strict);
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors.get("option_codes[1]"),
            Some("cannot be combined with the selected plan")
        );
    }

    #[test]
    fn test_unknown_plan_and_duplicates() {
        let mut draft = valid_draft();
        draft.plan_code = "GOLD".into();
        let errors = check_cross_field(&draft, &matrix(), ValidationMode::Strict);
        assert_eq!(errors.get("plan_code"), Some("is not an available plan"));

        draft.plan_code = "BASIC".into();
        draft.option_codes = vec!["OPT_SUPPORT".into(), "OPT_SUPPORT".into()];
        let errors = check_cross_field(&draft, &matrix(), ValidationMode::Strict);
        assert_eq!(errors.get("option_codes[1]"), Some("is selected more than once"));
    }

    #[test]
    fn test_all_checks_accumulate() {
        let mut draft = valid_draft();
        draft.email_confirmation = "other@example.jp".into();
        draft.phone = PhoneNumber::new("0120", "123", "4567");
        draft.option_codes = vec!["OPT_PRM_STATIC_IP".into()];
        let errors = check_cross_field(&draft, &matrix(), ValidationMode::Strict);
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_draft_mode_skips_incomplete_groups() {
        let mut draft = DraftSubmission::default();
        draft.email = "taro@example.jp".into();
        draft.phone = PhoneNumber::new("0120", "", "");
        assert!(check_cross_field(&draft, &matrix(), ValidationMode::Draft).is_empty());

        draft.email_confirmation = "x@example.jp".into();
        let errors = check_cross_field(&draft, &matrix(), ValidationMode::Draft);
        assert!(errors.contains("email_confirmation"));
    }
}
