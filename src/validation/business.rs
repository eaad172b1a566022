//! Stage 3: checks against mutable external state.
//!
//! Catalog lookups, the inventory query and the region query are issued
//! together, each under its own deadline. Any error or timeout marks the
//! affected options as unavailable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;

use crate::collaborators::{
    CollaboratorResult, InventoryProvider, MasterDataCatalog, OptionRecord,
    RegionRestrictionProvider,
};
use crate::resilience::with_deadline;
use crate::submission::{option_path, DraftSubmission};
use crate::validation::errors::ValidationErrors;

pub const MSG_UNKNOWN_OPTION: &str = "does not exist";
pub const MSG_INACTIVE_OPTION: &str = "is no longer offered";
pub const MSG_PLAN_NOT_ALLOWED: &str = "is not available with the selected plan";
pub const MSG_UNCONFIRMED: &str = "could not be confirmed";
pub const MSG_OUT_OF_STOCK: &str = "is currently unavailable";
pub const MSG_REGION_DENIED: &str = "is not available in your area";

/// Business rule checks backed by the external collaborators.
#[derive(Clone)]
pub struct BusinessRules {
    catalog: Arc<dyn MasterDataCatalog>,
    inventory: Arc<dyn InventoryProvider>,
    regions: Arc<dyn RegionRestrictionProvider>,
    deadline: Duration,
}

impl BusinessRules {
    pub fn new(
        catalog: Arc<dyn MasterDataCatalog>,
        inventory: Arc<dyn InventoryProvider>,
        regions: Arc<dyn RegionRestrictionProvider>,
        deadline: Duration,
    ) -> Self {
        Self {
            catalog,
            inventory,
            regions,
            deadline,
        }
    }

    pub async fn check(&self, draft: &DraftSubmission) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        let codes = &draft.option_codes;
        if codes.is_empty() {
            return errors;
        }

        let catalog_lookups = join_all(codes.iter().map(|code| {
            with_deadline("catalog", self.deadline, self.catalog.get_option(code))
        }));
        let inventory = with_deadline("inventory", self.deadline, self.inventory.check_levels(codes));
        let regions = with_deadline(
            "region",
            self.deadline,
            self.regions
                .check(&draft.address.prefecture, &draft.address.city, codes),
        );

        let (records, levels, allowed) = tokio::join!(catalog_lookups, inventory, regions);

        for (index, (code, record)) in codes.iter().zip(records).enumerate() {
            if let Some(message) = catalog_message(record, &draft.plan_code) {
                errors.add(option_path(index), message);
            }
            if !in_stock(&levels, code) {
                errors.add(option_path(index), MSG_OUT_OF_STOCK);
            }
            if !region_allows(&allowed, code) {
                errors.add(option_path(index), MSG_REGION_DENIED);
            }
        }

        if !errors.is_empty() {
            tracing::info!(
                plan = %draft.plan_code,
                rejected = errors.len(),
                "Business rules rejected options"
            );
        }
        errors
    }
}

fn catalog_message(record: CollaboratorResult<Option<OptionRecord>>, plan: &str) -> Option<&'static str> {
    match record {
        Err(_) => Some(MSG_UNCONFIRMED),
        Ok(None) => Some(MSG_UNKNOWN_OPTION),
        Ok(Some(record)) if !record.active => Some(MSG_INACTIVE_OPTION),
        Ok(Some(record)) if !record.allowed_plans.iter().any(|p| p == plan) => {
            Some(MSG_PLAN_NOT_ALLOWED)
        }
        Ok(Some(_)) => None,
    }
}

fn in_stock(levels: &CollaboratorResult<HashMap<String, i64>>, code: &str) -> bool {
    levels
        .as_ref()
        .is_ok_and(|levels| levels.get(code).is_some_and(|count| *count > 0))
}

fn region_allows(allowed: &CollaboratorResult<HashMap<String, bool>>, code: &str) -> bool {
    allowed
        .as_ref()
        .is_ok_and(|allowed| allowed.get(code).copied().unwrap_or(false))
}
