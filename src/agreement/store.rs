use crate::agreement::{Agreement, AgreementError};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashSet;
use tracing::info;

/// In-memory store of provisioned rental agreements.
///
/// Read-mostly: evaluation tasks call `find_active` concurrently while
/// provisioning replaces or amends the set. Constructed once at startup and
/// shared via `Arc`; there is no ambient global instance.
pub struct AgreementStore {
    agreements: DashMap<String, Agreement>,
}

impl AgreementStore {
    pub fn new() -> Self {
        Self {
            agreements: DashMap::new(),
        }
    }

    /// Find the agreement currently in effect for an asset.
    ///
    /// Matches on `asset_id` with `start_time <= now < end_time`. Returns
    /// `None` when the asset has no active rental — a normal state, not an
    /// error. If provisioning ever leaves overlapping windows for one asset,
    /// the agreement with the latest `start_time` wins, with the lexically
    /// greatest id as tie-break, so the result is deterministic.
    pub fn find_active(&self, asset_id: &str, now: DateTime<Utc>) -> Option<Agreement> {
        self.agreements
            .iter()
            .filter(|entry| entry.asset_id == asset_id && entry.is_active_at(now))
            .max_by(|a, b| {
                a.start_time
                    .cmp(&b.start_time)
                    .then_with(|| a.id.cmp(&b.id))
            })
            .map(|entry| entry.value().clone())
    }

    /// Replace the full agreement set.
    ///
    /// Every record is validated first; an invalid record rejects the whole
    /// batch and leaves the current set untouched. Returns the number of
    /// agreements loaded.
    pub fn reload(&self, agreements: Vec<Agreement>) -> Result<usize, AgreementError> {
        for agreement in &agreements {
            agreement.validate()?;
        }

        self.agreements.clear();
        let count = agreements.len();
        for agreement in agreements {
            self.agreements.insert(agreement.id.clone(), agreement);
        }

        info!(count = count, "Agreement set reloaded");
        Ok(count)
    }

    /// Insert or replace a single agreement.
    pub fn upsert(&self, agreement: Agreement) -> Result<(), AgreementError> {
        agreement.validate()?;
        info!(
            agreement_id = %agreement.id,
            asset_id = %agreement.asset_id,
            "Agreement provisioned"
        );
        self.agreements.insert(agreement.id.clone(), agreement);
        Ok(())
    }

    /// Remove an agreement by id. Returns true if it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.agreements.remove(id).is_some()
    }

    /// All agreements, in no particular order.
    pub fn all(&self) -> Vec<Agreement> {
        self.agreements.iter().map(|e| e.value().clone()).collect()
    }

    /// Distinct asset ids across the current set (the assets worth watching).
    pub fn asset_ids(&self) -> HashSet<String> {
        self.agreements.iter().map(|e| e.asset_id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.agreements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agreements.is_empty()
    }
}

impl Default for AgreementStore {
    fn default() -> Self {
        Self::new()
    }
}
