//! Single-use anti-forgery tokens.
//!
//! Tokens are 256 random bits, base64url encoded, valid for a fixed TTL and
//! destroyed on their first redemption. Redemption removes the entry before
//! inspecting it, so two concurrent redemptions of the same value can never
//! both succeed.

use std::sync::Arc;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use rand::{rngs::OsRng, RngCore};
use serde::Serialize;
use thiserror::Error;

use crate::clock::{bounded_seconds, expires_after, SharedClock};
use crate::config::CsrfConfig;

const TOKEN_BYTES: usize = 32;

/// Why a mutating request was refused by the guard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CsrfError {
    /// The request carried no token at all.
    #[error("CSRF token missing")]
    Missing,
    /// Unknown, already redeemed, or expired.
    #[error("CSRF token invalid or expired")]
    Invalid,
}

impl CsrfError {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Missing => "missing",
            Self::Invalid => "invalid",
        }
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues and redeems anti-forgery tokens.
pub struct CsrfGuard {
    tokens: DashMap<String, DateTime<Utc>>,
    ttl: Duration,
    max_outstanding: usize,
    clock: SharedClock,
}

impl CsrfGuard {
    pub fn new(config: &CsrfConfig, clock: SharedClock) -> Self {
        Self {
            tokens: DashMap::new(),
            ttl: bounded_seconds(config.ttl_secs),
            max_outstanding: config.max_outstanding,
            clock,
        }
    }

    /// Issue a new token.
    pub fn issue_token(&self) -> IssuedToken {
        if self.tokens.len() >= self.max_outstanding {
            self.make_room();
        }

        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        let token = URL_SAFE_NO_PAD.encode(bytes);
        let expires_at = expires_after(self.clock.now(), self.ttl);

        self.tokens.insert(token.clone(), expires_at);
        IssuedToken { token, expires_at }
    }

    /// Redeem `token`. Returns `true` exactly once per issued, unexpired token.
    pub fn validate_and_consume(&self, token: &str) -> bool {
        match self.tokens.remove(token) {
            Some((_, expires_at)) => expires_at > self.clock.now(),
            None => false,
        }
    }

    /// Redeem a token taken from a request header.
    pub fn redeem(&self, token: Option<&str>) -> Result<(), CsrfError> {
        let token = match token.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => return Err(CsrfError::Missing),
        };
        if self.validate_and_consume(token) {
            Ok(())
        } else {
            Err(CsrfError::Invalid)
        }
    }

    /// Drop every expired token. Returns the number removed.
    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.tokens.len();
        self.tokens.retain(|_, expires_at| *expires_at > now);
        before.saturating_sub(self.tokens.len())
    }

    /// Number of unredeemed tokens held.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// At capacity: evict expired tokens, then the ones closest to expiry.
    fn make_room(&self) {
        let removed = self.sweep_expired();
        if self.tokens.len() < self.max_outstanding {
            tracing::debug!(removed, "Evicted expired CSRF tokens at capacity");
            return;
        }

        let mut oldest: Vec<(String, DateTime<Utc>)> = self
            .tokens
            .iter()
            .map(|r| (r.key().clone(), *r.value()))
            .collect();
        oldest.sort_by_key(|(_, expires_at)| *expires_at);

        let excess = self.tokens.len() + 1 - self.max_outstanding;
        let to_remove = excess.max(self.max_outstanding / 10);
        for (token, _) in oldest.into_iter().take(to_remove) {
            self.tokens.remove(&token);
        }
        tracing::warn!(evicted = to_remove, "CSRF token store at capacity, evicted oldest tokens");
    }
}

/// Shared handle injected into the router state.
pub type SharedCsrfGuard = Arc<CsrfGuard>;
