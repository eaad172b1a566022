//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (fixtures reference catalog options)
//! - Validate value ranges (TTLs in (0, 1 year], limits > 0, addresses parse)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: IntakeConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::BTreeSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::clock::MAX_DURATION_SECS;
use crate::config::schema::IntakeConfig;

/// A single semantic problem in a configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &IntakeConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be > 0"));
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }
    if config.session.ttl_secs == 0 {
        errors.push(ValidationError::new("session.ttl_secs", "must be > 0"));
    }
    if config.csrf.ttl_secs == 0 {
        errors.push(ValidationError::new("csrf.ttl_secs", "must be > 0"));
    }

    let bounded = [
        ("timeouts.request_secs", config.timeouts.request_secs),
        ("session.ttl_secs", config.session.ttl_secs),
        ("csrf.ttl_secs", config.csrf.ttl_secs),
        ("rate_limit.window_secs", config.rate_limit.window_secs),
        ("rate_limit.finalize_window_secs", config.rate_limit.finalize_window_secs),
        ("sweeper.session_interval_secs", config.sweeper.session_interval_secs),
        ("sweeper.csrf_interval_secs", config.sweeper.csrf_interval_secs),
        ("sweeper.rate_limit_interval_secs", config.sweeper.rate_limit_interval_secs),
        ("sweeper.receipt_interval_secs", config.sweeper.receipt_interval_secs),
        ("external.timeout_ms", config.external.timeout_ms / 1000),
    ];
    for (field, secs) in bounded {
        if secs > MAX_DURATION_SECS {
            errors.push(ValidationError::new(
                field,
                format!("must be at most {MAX_DURATION_SECS} seconds"),
            ));
        }
    }

    if config.csrf.max_outstanding == 0 {
        errors.push(ValidationError::new("csrf.max_outstanding", "must be > 0"));
    }

    let rl = &config.rate_limit;
    if rl.enabled {
        if rl.limit == 0 || rl.window_secs == 0 {
            errors.push(ValidationError::new(
                "rate_limit.limit",
                "limit and window_secs must be > 0 when enabled",
            ));
        }
        if rl.finalize_limit == 0 || rl.finalize_window_secs == 0 {
            errors.push(ValidationError::new(
                "rate_limit.finalize_limit",
                "finalize_limit and finalize_window_secs must be > 0 when enabled",
            ));
        }
    }

    let sw = &config.sweeper;
    if sw.enabled
        && [
            sw.session_interval_secs,
            sw.csrf_interval_secs,
            sw.rate_limit_interval_secs,
            sw.receipt_interval_secs,
        ]
        .contains(&0)
    {
        errors.push(ValidationError::new("sweeper", "intervals must be > 0 when enabled"));
    }

    if config.external.timeout_ms == 0 {
        errors.push(ValidationError::new("external.timeout_ms", "must be > 0"));
    }

    if config.catalog.plans.is_empty() {
        errors.push(ValidationError::new("catalog.plans", "at least one plan is required"));
    }
    let known_options: BTreeSet<&str> = config
        .catalog
        .plans
        .values()
        .flatten()
        .map(String::as_str)
        .collect();
    for option in &config.fixtures.options {
        if !known_options.contains(option.code.as_str()) {
            errors.push(ValidationError::new(
                "fixtures.options",
                format!("option '{}' is not in any catalog plan", option.code),
            ));
        }
    }
    for denial in &config.fixtures.region_denials {
        if !known_options.contains(denial.option_code.as_str()) {
            errors.push(ValidationError::new(
                "fixtures.region_denials",
                format!("option '{}' is not in any catalog plan", denial.option_code),
            ));
        }
    }
    for address in &config.fixtures.addresses {
        if address.postal_code.len() != 7 || !address.postal_code.chars().all(|c| c.is_ascii_digit()) {
            errors.push(ValidationError::new(
                "fixtures.addresses",
                format!("postal code '{}' must be 7 digits", address.postal_code),
            ));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            "not a socket address",
        ));
    }
    if config.admin.enabled {
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new("admin.bind_address", "not a socket address"));
        }
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::new("security.max_body_size", "must be > 0"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::OptionFixture;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&IntakeConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = IntakeConfig::default();
        config.session.ttl_secs = 0;
        config.external.timeout_ms = 0;
        config.listener.bind_address = "not-an-address".into();
        config.fixtures.options.push(OptionFixture {
            code: "OPT_UNKNOWN".into(),
            active: true,
            allowed_plans: vec![],
            stock: 1,
        });

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(errors.len(), 4, "{fields:?}");
        assert!(fields.contains(&"session.ttl_secs"));
        assert!(fields.contains(&"external.timeout_ms"));
        assert!(fields.contains(&"listener.bind_address"));
        assert!(fields.contains(&"fixtures.options"));
    }

    #[test]
    fn test_rejects_durations_beyond_a_year() {
        let mut config = IntakeConfig::default();
        config.session.ttl_secs = 10_000_000_000_000;
        config.csrf.ttl_secs = u64::MAX;
        config.rate_limit.window_secs = MAX_DURATION_SECS + 1;

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(
            fields,
            ["session.ttl_secs", "csrf.ttl_secs", "rate_limit.window_secs"]
        );

        config.session.ttl_secs = MAX_DURATION_SECS;
        config.csrf.ttl_secs = MAX_DURATION_SECS;
        config.rate_limit.window_secs = MAX_DURATION_SECS;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_disabled_rate_limit_skips_checks() {
        let mut config = IntakeConfig::default();
        config.rate_limit.enabled = false;
        config.rate_limit.limit = 0;
        assert!(validate_config(&config).is_ok());
    }
}
