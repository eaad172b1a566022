//! Static field rules, character classes and the plan/option table.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::RangeInclusive;

use crate::config::CatalogConfig;
use crate::submission::Field;

/// Longest accepted plan or option code.
pub const CODE_MAX_CHARS: usize = 32;

/// Numbers that are rejected regardless of shape.
pub const TOLL_FREE_PREFIXES: [&str; 4] = ["0120", "0800", "0570", "0990"];

/// Third digit of an 11-digit mobile number must follow `0` + one of these.
const MOBILE_SECOND_DIGITS: [char; 3] = ['7', '8', '9'];

/// Allowed characters for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Free text; only suspicious characters are rejected.
    Text,
    /// Full-width katakana reading.
    Kana,
    /// ASCII digits.
    Digits,
    Email,
    /// Upper-case ASCII letters, digits and `_`.
    Code,
}

/// Per-field syntactic rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pub field: Field,
    pub required: bool,
    pub max_chars: usize,
    pub class: CharClass,
    /// Exact digit count range for numeric-split parts.
    pub length: Option<RangeInclusive<usize>>,
}

const fn rule(field: Field, required: bool, max_chars: usize, class: CharClass) -> FieldRule {
    FieldRule {
        field,
        required,
        max_chars,
        class,
        length: None,
    }
}

const fn split(field: Field, length: RangeInclusive<usize>) -> FieldRule {
    FieldRule {
        field,
        required: true,
        max_chars: *length.end(),
        class: CharClass::Digits,
        length: Some(length),
    }
}

/// Rules for every scalar field, in form order.
pub fn field_rules() -> [FieldRule; 20] {
    use CharClass::*;
    [
        rule(Field::LastName, true, 50, Text),
        rule(Field::FirstName, true, 50, Text),
        rule(Field::LastNameKana, true, 50, Kana),
        rule(Field::FirstNameKana, true, 50, Kana),
        rule(Field::Email, true, 254, Email),
        rule(Field::EmailConfirmation, true, 254, Email),
        split(Field::Phone1, 2..=5),
        split(Field::Phone2, 1..=4),
        split(Field::Phone3, 4..=4),
        split(Field::PostalCode1, 3..=3),
        split(Field::PostalCode2, 4..=4),
        rule(Field::Prefecture, true, 10, Text),
        rule(Field::City, true, 50, Text),
        rule(Field::Town, true, 100, Text),
        rule(Field::District, false, 20, Text),
        rule(Field::Block, false, 20, Text),
        rule(Field::SubBlock, false, 20, Text),
        rule(Field::Building, false, 100, Text),
        rule(Field::Room, false, 20, Text),
        rule(Field::PlanCode, true, CODE_MAX_CHARS, Code),
    ]
}

/// Control characters and markup delimiters.
pub fn is_suspicious(c: char) -> bool {
    c.is_control() || c == '<' || c == '>'
}

/// Full-width katakana, the prolonged sound mark and the ideographic space.
pub fn is_full_width_kana(c: char) -> bool {
    matches!(c, '\u{30A1}'..='\u{30FA}' | '\u{30FC}' | '\u{3000}')
}

pub fn is_code_char(c: char) -> bool {
    c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_'
}

/// Minimal address shape: one `@`, non-empty local part, dotted domain.
pub fn is_email_shaped(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = value.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
}

pub fn is_toll_free(digits: &str) -> bool {
    TOLL_FREE_PREFIXES.iter().any(|p| digits.starts_with(p))
}

/// `0` + one of `7/8/9` + `0`, eleven digits.
pub fn is_mobile_shape(digits: &str) -> bool {
    let chars: Vec<char> = digits.chars().collect();
    chars.len() == 11
        && chars.iter().all(char::is_ascii_digit)
        && chars[0] == '0'
        && MOBILE_SECOND_DIGITS.contains(&chars[1])
        && chars[2] == '0'
}

/// `0` + a non-zero digit, ten digits.
pub fn is_landline_shape(digits: &str) -> bool {
    let chars: Vec<char> = digits.chars().collect();
    chars.len() == 10 && chars.iter().all(char::is_ascii_digit) && chars[0] == '0' && chars[1] != '0'
}

/// Which option codes may be selected with which plan.
#[derive(Debug, Clone, Default)]
pub struct PlanOptionMatrix {
    plans: BTreeMap<String, BTreeSet<String>>,
}

impl PlanOptionMatrix {
    pub fn from_config(config: &CatalogConfig) -> Self {
        let plans = config
            .plans
            .iter()
            .map(|(plan, options)| (plan.clone(), options.iter().cloned().collect()))
            .collect();
        Self { plans }
    }

    pub fn has_plan(&self, plan: &str) -> bool {
        self.plans.contains_key(plan)
    }

    pub fn allows(&self, plan: &str, option: &str) -> bool {
        self.plans
            .get(plan)
            .is_some_and(|options| options.contains(option))
    }

    pub fn plans(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kana_class() {
        assert!("ヤマダ　タロウ".chars().all(is_full_width_kana));
        assert!("ヴァージー".chars().all(is_full_width_kana));
        assert!(!"やまだ".chars().all(is_full_width_kana));
        assert!(!"ﾔﾏﾀﾞ".chars().all(is_full_width_kana), "half-width rejected");
        assert!(!"YAMADA".chars().all(is_full_width_kana));
    }

    #[test]
    fn test_email_shape() {
        assert!(is_email_shaped("a@example.jp"));
        assert!(!is_email_shaped("a@b@example.jp"));
        assert!(!is_email_shaped("@example.jp"));
        assert!(!is_email_shaped("a@localhost"));
        assert!(!is_email_shaped("a @example.jp"));
        assert!(!is_email_shaped("a@example..jp"));
    }

    #[test]
    fn test_phone_shapes() {
        assert!(is_mobile_shape("09012345678"));
        assert!(is_mobile_shape("07012345678"));
        assert!(!is_mobile_shape("05012345678"));
        assert!(!is_mobile_shape("09112345678"));
        assert!(is_landline_shape("0312345678"));
        assert!(!is_landline_shape("0012345678"));
        assert!(is_toll_free("01201234567"));
        assert!(!is_toll_free("0312345678"));
    }

    #[test]
    fn test_default_matrix() {
        let matrix = PlanOptionMatrix::from_config(&CatalogConfig::default());
        assert!(matrix.allows("BASIC", "OPT_SUPPORT"));
        assert!(matrix.allows("BASIC", "OPT_BASIC_STARTER"));
        assert!(!matrix.allows("BASIC", "OPT_PRM_STATIC_IP"));
        assert!(!matrix.allows("NOPE", "OPT_SUPPORT"));
        assert_eq!(matrix.plans().count(), 3);
    }

    #[test]
    fn test_rules_cover_every_field() {
        let rules = field_rules();
        for field in Field::ALL {
            assert_eq!(rules.iter().filter(|r| r.field == field).count(), 1, "{field}");
        }
        let optional: Vec<Field> = rules.iter().filter(|r| !r.required).map(|r| r.field).collect();
        assert_eq!(
            optional,
            vec![Field::District, Field::Block, Field::SubBlock, Field::Building, Field::Room]
        );
    }
}
