//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the intake
//! gateway. All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration for the intake gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct IntakeConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Draft session storage.
    pub session: SessionConfig,

    /// Anti-forgery tokens.
    pub csrf: CsrfConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Background sweep intervals.
    pub sweeper: SweeperConfig,

    /// External collaborator call budget.
    pub external: ExternalConfig,

    /// Plan to option compatibility table.
    pub catalog: CatalogConfig,

    /// Seed data for the in-memory collaborators.
    pub fixtures: FixtureConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    pub admin: AdminConfig,

    pub security: SecurityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,

    /// Maximum concurrent in-flight requests (backpressure).
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
            max_connections: 10_000,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time for a request/response in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 10 }
    }
}

/// Draft session storage.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sliding TTL applied on every write.
    pub ttl_secs: u64,

    /// JSON snapshot written on shutdown and reloaded on startup.
    pub persistence_path: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 4 * 3600,
            persistence_path: None,
        }
    }
}

/// Anti-forgery token settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CsrfConfig {
    /// Token lifetime, aligned with the session TTL by default.
    pub ttl_secs: u64,

    /// Upper bound on unredeemed tokens held in memory.
    pub max_outstanding: usize,
}

impl Default for CsrfConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 4 * 3600,
            max_outstanding: 100_000,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per window on ordinary endpoints.
    pub limit: u32,

    /// Window length for ordinary endpoints.
    pub window_secs: u64,

    /// Requests allowed per window on the finalize endpoint.
    pub finalize_limit: u32,

    pub finalize_window_secs: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            limit: 60,
            window_secs: 60,
            finalize_limit: 5,
            finalize_window_secs: 60,
        }
    }
}

/// Background sweep intervals.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SweeperConfig {
    pub enabled: bool,
    pub session_interval_secs: u64,
    pub csrf_interval_secs: u64,
    pub rate_limit_interval_secs: u64,
    pub receipt_interval_secs: u64,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            session_interval_secs: 300,
            csrf_interval_secs: 300,
            rate_limit_interval_secs: 60,
            receipt_interval_secs: 600,
        }
    }
}

/// Budget for calls to external collaborators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ExternalConfig {
    /// Per-call deadline. A timeout is a definitive "unavailable".
    pub timeout_ms: u64,
}

impl Default for ExternalConfig {
    fn default() -> Self {
        Self { timeout_ms: 500 }
    }
}

/// Plan to option compatibility table.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// plan code -> option codes selectable with it.
    pub plans: BTreeMap<String, Vec<String>>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        let shared = ["OPT_SUPPORT", "OPT_BACKUP"];
        let plan = |exclusive: &[&str]| -> Vec<String> {
            shared
                .iter()
                .chain(exclusive.iter())
                .map(|s| s.to_string())
                .collect()
        };

        let mut plans = BTreeMap::new();
        plans.insert("BASIC".to_string(), plan(&["OPT_BASIC_STARTER"]));
        plans.insert("STANDARD".to_string(), plan(&["OPT_STD_ROUTER"]));
        plans.insert(
            "PREMIUM".to_string(),
            plan(&["OPT_PRM_CONCIERGE", "OPT_PRM_STATIC_IP"]),
        );
        Self { plans }
    }
}

/// Seed data for the in-memory master data, inventory, region and address
/// collaborators.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FixtureConfig {
    pub options: Vec<OptionFixture>,
    pub region_denials: Vec<RegionDenial>,
    pub addresses: Vec<AddressFixture>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OptionFixture {
    pub code: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub allowed_plans: Vec<String>,
    #[serde(default)]
    pub stock: i64,
}

/// An option that may not be sold in a prefecture, or in one city of it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RegionDenial {
    pub option_code: String,
    pub prefecture: String,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AddressFixture {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub town: String,
}

fn default_true() -> bool {
    true
}

impl Default for FixtureConfig {
    fn default() -> Self {
        let catalog = CatalogConfig::default();
        let mut by_option: BTreeMap<&str, Vec<String>> = BTreeMap::new();
        for (plan, options) in &catalog.plans {
            for option in options {
                by_option.entry(option.as_str()).or_default().push(plan.clone());
            }
        }

        let options = by_option
            .into_iter()
            .map(|(code, allowed_plans)| OptionFixture {
                code: code.to_string(),
                active: true,
                allowed_plans,
                stock: 100,
            })
            .collect();

        Self {
            options,
            region_denials: vec![RegionDenial {
                option_code: "OPT_PRM_STATIC_IP".to_string(),
                prefecture: "沖縄県".to_string(),
                city: None,
            }],
            addresses: vec![
                AddressFixture {
                    postal_code: "1000001".to_string(),
                    prefecture: "東京都".to_string(),
                    city: "千代田区".to_string(),
                    town: "千代田".to_string(),
                },
                AddressFixture {
                    postal_code: "5300001".to_string(),
                    prefecture: "大阪府".to_string(),
                    city: "大阪市北区".to_string(),
                    town: "梅田".to_string(),
                },
            ],
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit JSON log lines instead of the human-readable format.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Security hardening configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Add security response headers.
    pub enable_headers: bool,
    /// Maximum body size in bytes.
    pub max_body_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            enable_headers: true,
            max_body_size: 64 * 1024, // 64KB
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_align_csrf_with_session_ttl() {
        let config = IntakeConfig::default();
        assert_eq!(config.session.ttl_secs, 14_400);
        assert_eq!(config.csrf.ttl_secs, config.session.ttl_secs);
        assert_eq!(config.external.timeout_ms, 500);
    }

    #[test]
    fn test_default_fixtures_cover_catalog() {
        let config = IntakeConfig::default();
        for options in config.catalog.plans.values() {
            for code in options {
                assert!(
                    config.fixtures.options.iter().any(|o| &o.code == code),
                    "missing fixture for {code}"
                );
            }
        }
        let shared = config
            .fixtures
            .options
            .iter()
            .find(|o| o.code == "OPT_SUPPORT")
            .unwrap();
        assert_eq!(shared.allowed_plans.len(), 3);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: IntakeConfig = toml::from_str(
            r#"
            [session]
            ttl_secs = 60

            [catalog.plans]
            LITE = ["OPT_A"]
            "#,
        )
        .unwrap();
        assert_eq!(config.session.ttl_secs, 60);
        assert_eq!(config.csrf.ttl_secs, 14_400);
        assert_eq!(config.catalog.plans.len(), 1);
        assert!(config.rate_limit.enabled);
    }
}
