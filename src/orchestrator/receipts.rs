//! Finalize receipts kept for retried finalize calls.
//!
//! A client that loses the finalize response may retry with the same session
//! id. The session is already gone by then, so the receipt recorded at commit
//! time is returned instead of creating a second registration.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::clock::{expires_after, SharedClock};
use crate::submission::FinalizeReceipt;

struct Entry {
    receipt: FinalizeReceipt,
    expires_at: DateTime<Utc>,
}

/// Session id -> receipt, retained for a fixed TTL.
pub struct ReceiptCache {
    entries: DashMap<String, Entry>,
    ttl: Duration,
    clock: SharedClock,
}

impl ReceiptCache {
    pub fn new(ttl: Duration, clock: SharedClock) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            clock,
        }
    }

    pub fn insert(&self, receipt: FinalizeReceipt) {
        let expires_at = expires_after(self.clock.now(), self.ttl);
        self.entries
            .insert(receipt.session_id.clone(), Entry { receipt, expires_at });
    }

    pub fn get(&self, session_id: &str) -> Option<FinalizeReceipt> {
        let now = self.clock.now();
        let found = self
            .entries
            .get(session_id)
            .map(|entry| (entry.receipt.clone(), entry.expires_at));
        match found {
            Some((receipt, expires_at)) if now < expires_at => Some(receipt),
            Some(_) => {
                self.entries.remove_if(session_id, |_, e| now >= e.expires_at);
                None
            }
            None => None,
        }
    }

    pub fn sweep_expired(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, e| now < e.expires_at);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
