//! Role-dependent contact directory.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use futures::future::join_all;
use tracing::debug;

use crate::{
    api::{Profile, RosterApi},
    store::RecencyStore,
};

/// Local user's marketplace role, which selects the directory strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Sees only recent counterparts, resolved from the recency list.
    Worker,
    /// Sees the full worker roster.
    Farmer,
}

/// Contact directory for one local user.
///
/// Every failure degrades to an empty list; no error is surfaced past
/// this boundary.
pub struct Directory {
    api: Arc<dyn RosterApi>,
    store: Arc<dyn RecencyStore>,
    role: Role,
    my_id: String,
    /// Load generation counter for discarding superseded responses.
    generation: AtomicU64,
}

impl Directory {
    /// Create a directory for the given user and role.
    pub fn new(
        api: Arc<dyn RosterApi>,
        store: Arc<dyn RecencyStore>,
        role: Role,
        my_id: impl Into<String>,
    ) -> Self {
        Self { api, store, role, my_id: my_id.into(), generation: AtomicU64::new(0) }
    }

    /// Load contacts matching `query`.
    ///
    /// Returns `None` when a newer load started while this one was in
    /// flight; the caller must discard the result and keep waiting for
    /// the newer one.
    pub async fn load(&self, query: &str) -> Option<Vec<Profile>> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let contacts = match self.role {
            Role::Worker => self.load_recents().await,
            Role::Farmer => self.load_roster().await,
        };

        if self.generation.load(Ordering::SeqCst) != generation {
            debug!(generation, "discarding superseded directory load");
            return None;
        }

        Some(self.filter(contacts, query))
    }

    /// Worker strategy: resolve the persisted recency list id by id.
    ///
    /// An empty recency list short-circuits without touching the backend.
    /// Individual lookup failures are dropped, not fatal to the batch.
    async fn load_recents(&self) -> Vec<Profile> {
        let ids = self.store.get(&self.my_id);
        if ids.is_empty() {
            return vec![];
        }

        let lookups = ids.iter().map(|id| self.api.profile(id));
        join_all(lookups)
            .await
            .into_iter()
            .zip(&ids)
            .filter_map(|(result, id)| match result {
                Ok(profile) => Some(profile),
                Err(e) => {
                    debug!(id, error = %e, "contact lookup failed, dropping entry");
                    None
                },
            })
            .collect()
    }

    /// Farmer strategy: fetch the full roster.
    async fn load_roster(&self) -> Vec<Profile> {
        match self.api.roster().await {
            Ok(roster) => roster,
            Err(e) => {
                debug!(error = %e, "roster fetch failed, directory degrades to empty");
                vec![]
            },
        }
    }

    /// Case-insensitive name/email filter, excluding the local user.
    fn filter(&self, contacts: Vec<Profile>, query: &str) -> Vec<Profile> {
        let needle = query.trim().to_lowercase();
        contacts
            .into_iter()
            .filter(|p| p.id != self.my_id)
            .filter(|p| {
                needle.is_empty()
                    || p.name.to_lowercase().contains(&needle)
                    || p.email.to_lowercase().contains(&needle)
            })
            .collect()
    }
}
