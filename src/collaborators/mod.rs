//! External collaborators consumed by the intake pipeline.
//!
//! # Data Flow
//! ```text
//! stage 3 (validation/business.rs)
//!     → MasterDataCatalog (option exists / active / allowed plans)
//!     → InventoryProvider (stock per option)        ┐ issued concurrently,
//!     → RegionRestrictionProvider (area allow-list) ┘ each under a deadline
//!
//! address autofill endpoint → AddressLookup
//! finalize                  → RegistrationRepository
//! ```
//!
//! # Design Decisions
//! - Traits return boxed futures so implementations stay object safe
//! - Errors never leak to callers raw; stage 3 converts them to fail-closed
//!   business rule errors
//! - `memory.rs` holds the configurable in-process implementations

pub mod memory;

use std::collections::HashMap;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::config::FixtureConfig;
use crate::submission::Registration;

pub use memory::{
    MemoryRegistrationRepository, StaticAddressBook, StaticCatalog, StaticInventory,
    StaticRegionRules,
};

/// Failure talking to a collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("{provider} did not answer within {after_ms} ms")]
    Timeout { provider: &'static str, after_ms: u64 },

    #[error("{0} is unavailable")]
    Unavailable(String),

    #[error("{0}")]
    Rejected(String),
}

pub type CollaboratorResult<T> = Result<T, CollaboratorError>;

/// Master data for one option code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionRecord {
    pub code: String,
    pub active: bool,
    pub allowed_plans: Vec<String>,
}

/// Address resolved from a postal code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostalAddress {
    pub postal_code: String,
    pub prefecture: String,
    pub city: String,
    pub town: String,
}

pub trait MasterDataCatalog: Send + Sync {
    /// `Ok(None)` when the code does not exist.
    fn get_option<'a>(&'a self, code: &'a str) -> BoxFuture<'a, CollaboratorResult<Option<OptionRecord>>>;
}

pub trait InventoryProvider: Send + Sync {
    /// Stock count per requested code. Missing codes count as zero.
    fn check_levels<'a>(&'a self, codes: &'a [String]) -> BoxFuture<'a, CollaboratorResult<HashMap<String, i64>>>;
}

pub trait RegionRestrictionProvider: Send + Sync {
    /// Whether each code may be sold at the address. Missing codes are denied.
    fn check<'a>(
        &'a self,
        prefecture: &'a str,
        city: &'a str,
        codes: &'a [String],
    ) -> BoxFuture<'a, CollaboratorResult<HashMap<String, bool>>>;
}

pub trait AddressLookup: Send + Sync {
    fn search_by_postal_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, CollaboratorResult<Option<PostalAddress>>>;
}

/// Durable storage for finalized registrations.
pub trait RegistrationRepository: Send + Sync {
    fn commit<'a>(&'a self, registration: &'a Registration) -> BoxFuture<'a, CollaboratorResult<Uuid>>;
}

/// Every collaborator the gateway talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn MasterDataCatalog>,
    pub inventory: Arc<dyn InventoryProvider>,
    pub regions: Arc<dyn RegionRestrictionProvider>,
    pub addresses: Arc<dyn AddressLookup>,
    pub repository: Arc<dyn RegistrationRepository>,
}

impl Collaborators {
    /// In-process collaborators seeded from configuration.
    pub fn from_fixtures(fixtures: &FixtureConfig) -> Self {
        Self {
            catalog: Arc::new(StaticCatalog::from_fixtures(fixtures)),
            inventory: Arc::new(StaticInventory::from_fixtures(fixtures)),
            regions: Arc::new(StaticRegionRules::from_fixtures(fixtures)),
            addresses: Arc::new(StaticAddressBook::from_fixtures(fixtures)),
            repository: Arc::new(MemoryRegistrationRepository::new()),
        }
    }
}
