//! Assignment store adapter
//!
//! The host document layer keeps a flat key/value bag per participant.
//! The tracker only ever talks to it through [`FlagStore`]: synchronous
//! reads, asynchronous single and bulk writes. Writing JSON `null`
//! removes a key.

pub mod memory;

pub use memory::MemoryStore;

use serde_json::Value;

use crate::error::StoreError;
use crate::model::{Encounter, FlagKey, ParticipantId};

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// One flag write.
#[derive(Debug, Clone, PartialEq)]
pub struct FlagUpdate {
    /// Participant whose flag bag is written
    pub participant: ParticipantId,
    /// Flag key
    pub key: FlagKey,
    /// New value; `null` removes the key
    pub value: Value,
}

/// Per-participant flag storage.
///
/// Implementations use interior mutability so a single store can be
/// shared (`Arc<S>`) between the tracker and the host.
#[async_trait::async_trait]
pub trait FlagStore: Send + Sync {
    /// Reads one flag. Never blocks; returns `None` when the key is absent.
    fn get(&self, participant: &ParticipantId, key: FlagKey) -> Option<Value>;

    /// Writes one flag.
    async fn set(&self, participant: &ParticipantId, key: FlagKey, value: Value) -> Result<()>;

    /// Writes many flags, possibly across participants, as one request.
    ///
    /// Implementations should apply all updates or none; callers do not
    /// rely on ordering between updates to different participants.
    async fn bulk_set(&self, encounter: &Encounter, updates: Vec<FlagUpdate>) -> Result<()>;
}
