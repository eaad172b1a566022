//! In-process collaborator implementations backed by configuration fixtures.

use std::collections::HashMap;

use dashmap::DashMap;
use futures_util::future::{self, BoxFuture, FutureExt};
use uuid::Uuid;

use crate::collaborators::{
    AddressLookup, CollaboratorError, CollaboratorResult, InventoryProvider, MasterDataCatalog,
    OptionRecord, PostalAddress, RegionRestrictionProvider, RegistrationRepository,
};
use crate::config::{FixtureConfig, RegionDenial};
use crate::submission::Registration;

/// Option master data held in memory.
#[derive(Debug, Default)]
pub struct StaticCatalog {
    options: DashMap<String, OptionRecord>,
}

impl StaticCatalog {
    pub fn from_fixtures(fixtures: &FixtureConfig) -> Self {
        let catalog = Self::default();
        for option in &fixtures.options {
            catalog.upsert(OptionRecord {
                code: option.code.clone(),
                active: option.active,
                allowed_plans: option.allowed_plans.clone(),
            });
        }
        catalog
    }

    pub fn upsert(&self, record: OptionRecord) {
        self.options.insert(record.code.clone(), record);
    }

    pub fn deactivate(&self, code: &str) {
        if let Some(mut record) = self.options.get_mut(code) {
            record.active = false;
        }
    }
}

impl MasterDataCatalog for StaticCatalog {
    fn get_option<'a>(&'a self, code: &'a str) -> BoxFuture<'a, CollaboratorResult<Option<OptionRecord>>> {
        let record = self.options.get(code).map(|r| r.value().clone());
        future::ready(Ok(record)).boxed()
    }
}

/// Stock levels held in memory.
#[derive(Debug, Default)]
pub struct StaticInventory {
    levels: DashMap<String, i64>,
}

impl StaticInventory {
    pub fn from_fixtures(fixtures: &FixtureConfig) -> Self {
        let inventory = Self::default();
        for option in &fixtures.options {
            inventory.set_level(&option.code, option.stock);
        }
        inventory
    }

    pub fn set_level(&self, code: &str, count: i64) {
        self.levels.insert(code.to_string(), count);
    }
}

impl InventoryProvider for StaticInventory {
    fn check_levels<'a>(&'a self, codes: &'a [String]) -> BoxFuture<'a, CollaboratorResult<HashMap<String, i64>>> {
        let levels = codes
            .iter()
            .map(|code| {
                let count = self.levels.get(code).map(|c| *c).unwrap_or(0);
                (code.clone(), count)
            })
            .collect();
        future::ready(Ok(levels)).boxed()
    }
}

/// Deny-list of (option, prefecture[, city]) combinations.
#[derive(Debug, Default)]
pub struct StaticRegionRules {
    denials: Vec<RegionDenial>,
}

impl StaticRegionRules {
    pub fn from_fixtures(fixtures: &FixtureConfig) -> Self {
        Self {
            denials: fixtures.region_denials.clone(),
        }
    }

    fn is_denied(&self, prefecture: &str, city: &str, code: &str) -> bool {
        self.denials.iter().any(|d| {
            d.option_code == code
                && d.prefecture == prefecture
                && d.city.as_deref().map_or(true, |c| c == city)
        })
    }
}

impl RegionRestrictionProvider for StaticRegionRules {
    fn check<'a>(
        &'a self,
        prefecture: &'a str,
        city: &'a str,
        codes: &'a [String],
    ) -> BoxFuture<'a, CollaboratorResult<HashMap<String, bool>>> {
        let allowed = codes
            .iter()
            .map(|code| (code.clone(), !self.is_denied(prefecture, city, code)))
            .collect();
        future::ready(Ok(allowed)).boxed()
    }
}

/// Postal code directory held in memory.
#[derive(Debug, Default)]
pub struct StaticAddressBook {
    addresses: HashMap<String, PostalAddress>,
}

impl StaticAddressBook {
    pub fn from_fixtures(fixtures: &FixtureConfig) -> Self {
        let addresses = fixtures
            .addresses
            .iter()
            .map(|a| {
                (
                    a.postal_code.clone(),
                    PostalAddress {
                        postal_code: a.postal_code.clone(),
                        prefecture: a.prefecture.clone(),
                        city: a.city.clone(),
                        town: a.town.clone(),
                    },
                )
            })
            .collect();
        Self { addresses }
    }
}

impl AddressLookup for StaticAddressBook {
    fn search_by_postal_code<'a>(&'a self, code: &'a str) -> BoxFuture<'a, CollaboratorResult<Option<PostalAddress>>> {
        let normalized: String = code.chars().filter(|c| *c != '-').collect();
        future::ready(Ok(self.addresses.get(&normalized).cloned())).boxed()
    }
}

/// Registrations kept in memory, keyed by id.
#[derive(Debug, Default)]
pub struct MemoryRegistrationRepository {
    registrations: DashMap<Uuid, Registration>,
}

impl MemoryRegistrationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &Uuid) -> Option<Registration> {
        self.registrations.get(id).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl RegistrationRepository for MemoryRegistrationRepository {
    fn commit<'a>(&'a self, registration: &'a Registration) -> BoxFuture<'a, CollaboratorResult<Uuid>> {
        let result = if self.registrations.contains_key(&registration.id) {
            Err(CollaboratorError::Rejected(format!(
                "registration {} already exists",
                registration.id
            )))
        } else {
            self.registrations.insert(registration.id, registration.clone());
            Ok(registration.id)
        };
        future::ready(result).boxed()
    }
}
