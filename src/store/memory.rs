//! In-memory flag store
//!
//! `DashMap`-backed [`FlagStore`] used by the CLI shell and tests. Keys the
//! tracker does not own are kept as-is so a host snapshot survives a
//! load/save cycle unchanged.

use dashmap::DashMap;
use indexmap::IndexMap;
use serde_json::Value;
use tracing::trace;

use crate::model::{Encounter, FlagKey, ParticipantId};

use super::{FlagStore, FlagUpdate, Result};

/// Flat flag bag of one participant.
pub type FlagBag = IndexMap<String, Value>;

/// Concurrent in-memory flag store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    bags: DashMap<ParticipantId, FlagBag>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with flag bags.
    #[must_use]
    pub fn from_bags(bags: impl IntoIterator<Item = (ParticipantId, FlagBag)>) -> Self {
        Self {
            bags: bags.into_iter().collect(),
        }
    }

    /// Returns a copy of one participant's flag bag (empty if never written).
    #[must_use]
    pub fn bag(&self, participant: &ParticipantId) -> FlagBag {
        self.bags
            .get(participant)
            .map(|b| b.value().clone())
            .unwrap_or_default()
    }

    /// Number of participants with at least one stored flag.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bags.iter().filter(|b| !b.value().is_empty()).count()
    }

    /// Whether no flags are stored at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply(&self, participant: &ParticipantId, key: FlagKey, value: Value) {
        trace!(%participant, key = key.as_str(), %value, "flag write");
        let mut bag = self.bags.entry(participant.clone()).or_default();
        if value.is_null() {
            bag.shift_remove(key.as_str());
        } else {
            bag.insert(key.as_str().to_string(), value);
        }
    }
}

#[async_trait::async_trait]
impl FlagStore for MemoryStore {
    fn get(&self, participant: &ParticipantId, key: FlagKey) -> Option<Value> {
        self.bags
            .get(participant)
            .and_then(|bag| bag.get(key.as_str()).cloned())
    }

    async fn set(&self, participant: &ParticipantId, key: FlagKey, value: Value) -> Result<()> {
        self.apply(participant, key, value);
        Ok(())
    }

    async fn bulk_set(&self, encounter: &Encounter, updates: Vec<FlagUpdate>) -> Result<()> {
        trace!(encounter = %encounter.id, count = updates.len(), "bulk flag write");
        for update in updates {
            self.apply(&update.participant, update.key, update.value);
        }
        Ok(())
    }
}
