//! Shared integration-test helpers: tracker construction, a store that
//! fails on demand, an in-memory event sink, and a CLI runner.

#![allow(dead_code)]

use std::io::Write;
use std::path::Path;
use std::process::Output;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use phasekeeper::config::TrackerConfig;
use phasekeeper::error::StoreError;
use phasekeeper::model::{Encounter, FlagKey, Participant, ParticipantId, Phase};
use phasekeeper::observability::EventEmitter;
use phasekeeper::store::{FlagStore, FlagUpdate, MemoryStore};
use phasekeeper::tracker::PhaseTracker;
use serde_json::Value;

pub fn pid(id: &str) -> ParticipantId {
    ParticipantId::new(id)
}

pub fn encounter(ids: &[&str]) -> Encounter {
    Encounter::new(
        "test-encounter",
        1,
        ids.iter().map(|id| Participant::named(id)).collect(),
    )
}

/// Tracker over a fresh `MemoryStore`.
pub fn tracker(ids: &[&str]) -> PhaseTracker<MemoryStore> {
    PhaseTracker::new(
        encounter(ids),
        Arc::new(MemoryStore::new()),
        TrackerConfig::default(),
    )
}

/// Tracker over a caller-supplied store.
pub fn tracker_on<S: FlagStore>(ids: &[&str], store: Arc<S>) -> PhaseTracker<S> {
    PhaseTracker::new(encounter(ids), store, TrackerConfig::default())
}

/// Puts every id into melee at increasing order keys.
#[allow(clippy::missing_panics_doc)]
pub async fn all_in_melee<S: FlagStore>(tracker: &PhaseTracker<S>, ids: &[&str]) {
    for (i, id) in ids.iter().enumerate() {
        #[allow(clippy::cast_precision_loss)]
        let order = (i as f64 + 1.0) * 1000.0;
        tracker
            .write_assignment(&pid(id), Phase::Melee, order, 1)
            .await
            .expect("melee placement");
    }
}

// ============================================================================
// FailingStore
// ============================================================================

/// A `MemoryStore` that accepts a fixed number of write requests and
/// rejects every one after that.
#[derive(Debug)]
pub struct FailingStore {
    inner: MemoryStore,
    budget: AtomicUsize,
    requests: AtomicUsize,
}

impl FailingStore {
    pub fn allowing(writes: usize) -> Self {
        Self {
            inner: MemoryStore::new(),
            budget: AtomicUsize::new(writes),
            requests: AtomicUsize::new(0),
        }
    }

    /// Direct access for seeding state without spending budget.
    pub const fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    /// Resets the remaining write budget.
    pub fn allow(&self, writes: usize) {
        self.budget.store(writes, Ordering::SeqCst);
    }

    /// Write requests seen so far, including rejected ones.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn spend(&self) -> Result<(), StoreError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        self.budget
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .map(|_| ())
            .map_err(|_| StoreError::Unavailable("write budget exhausted".to_string()))
    }
}

#[async_trait::async_trait]
impl FlagStore for FailingStore {
    fn get(&self, participant: &ParticipantId, key: FlagKey) -> Option<Value> {
        self.inner.get(participant, key)
    }

    async fn set(
        &self,
        participant: &ParticipantId,
        key: FlagKey,
        value: Value,
    ) -> Result<(), StoreError> {
        self.spend()?;
        self.inner.set(participant, key, value).await
    }

    async fn bulk_set(
        &self,
        encounter: &Encounter,
        updates: Vec<FlagUpdate>,
    ) -> Result<(), StoreError> {
        self.spend()?;
        self.inner.bulk_set(encounter, updates).await
    }
}

// ============================================================================
// Event capture
// ============================================================================

/// Cloneable in-memory writer for capturing emitted events.
#[derive(Clone, Default)]
pub struct EventSink(Arc<Mutex<Vec<u8>>>);

impl EventSink {
    pub fn emitter(&self) -> Arc<EventEmitter> {
        Arc::new(EventEmitter::new(Box::new(self.clone())))
    }

    /// Parsed JSONL events written so far.
    #[allow(clippy::missing_panics_doc)]
    pub fn events(&self) -> Vec<Value> {
        let data = self.0.lock().unwrap().clone();
        String::from_utf8(data)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    /// Event `type` tags in emission order.
    pub fn kinds(&self) -> Vec<String> {
        self.events()
            .iter()
            .map(|e| e["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

impl Write for EventSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ============================================================================
// CLI
// ============================================================================

/// Runs the `phasekeeper` binary with `args` and captures its output.
#[allow(clippy::missing_panics_doc)]
pub fn run_cli(args: &[&str]) -> Output {
    std::process::Command::new(env!("CARGO_BIN_EXE_phasekeeper"))
        .args(args)
        .env_remove("PHASEKEEPER_LOG_LEVEL")
        .env_remove("PHASEKEEPER_ENCOUNTER")
        .env_remove("PHASEKEEPER_CONFIG")
        .env_remove("PHASEKEEPER_SEED_ORDER")
        .env_remove("PHASEKEEPER_TAIL_GAP")
        .env_remove("PHASEKEEPER_RESET_ON_ROUND")
        .output()
        .expect("failed to run phasekeeper")
}

/// Writes `contents` to `dir/name` and returns the path as a string.
#[allow(clippy::missing_panics_doc)]
pub fn write_file(dir: &Path, name: &str, contents: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, contents).expect("write test file");
    path.to_str().expect("utf-8 path").to_string()
}
