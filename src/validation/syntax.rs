//! Stage 1: per-field syntactic checks.
//!
//! Each field is checked on its own: required, length in characters,
//! character class, then digit-count structure. Every field is visited; one
//! message is kept per field.

use crate::submission::{option_path, DraftSubmission};
use crate::validation::errors::ValidationErrors;
use crate::validation::rules::{
    field_rules, is_code_char, is_email_shaped, is_full_width_kana, is_suspicious, CharClass,
    FieldRule, CODE_MAX_CHARS,
};
use crate::validation::ValidationMode;

pub fn check_syntax(draft: &DraftSubmission, mode: ValidationMode) -> ValidationErrors {
    let mut errors = ValidationErrors::new();

    for rule in field_rules() {
        let value = draft.get(rule.field);
        if let Some(message) = check_value(value, &rule, mode) {
            errors.add(rule.field.key(), message);
        }
    }

    for (index, code) in draft.option_codes.iter().enumerate() {
        if let Some(message) = check_option_code(code) {
            errors.add(option_path(index), message);
        }
    }

    errors
}

fn check_value(value: &str, rule: &FieldRule, mode: ValidationMode) -> Option<String> {
    if value.is_empty() {
        return (rule.required && mode == ValidationMode::Strict).then(|| "is required".to_string());
    }

    let chars = value.chars().count();
    if chars > rule.max_chars {
        return Some(format!("must be at most {} characters", rule.max_chars));
    }

    if value.chars().any(is_suspicious) {
        return Some("contains characters that are not allowed".to_string());
    }

    let class_error = match rule.class {
        CharClass::Text => None,
        CharClass::Kana if !value.chars().all(is_full_width_kana) => {
            Some("must be full-width katakana")
        }
        CharClass::Digits if !value.chars().all(|c| c.is_ascii_digit()) => {
            Some("must contain digits only")
        }
        CharClass::Email if !is_email_shaped(value) => Some("is not a valid email address"),
        CharClass::Code if !value.chars().all(is_code_char) => Some("is not a valid code"),
        _ => None,
    };
    if let Some(message) = class_error {
        return Some(message.to_string());
    }

    if let Some(length) = &rule.length {
        if !length.contains(&chars) {
            return Some(if length.start() == length.end() {
                format!("must be exactly {} digits", length.start())
            } else {
                format!("must be {} to {} digits", length.start(), length.end())
            });
        }
    }

    None
}

fn check_option_code(code: &str) -> Option<String> {
    if code.is_empty() {
        Some("is required".to_string())
    } else if code.chars().count() > CODE_MAX_CHARS {
        Some(format!("must be at most {CODE_MAX_CHARS} characters"))
    } else if !code.chars().all(is_code_char) {
        Some("is not a valid code".to_string())
    } else {
        None
    }
}
