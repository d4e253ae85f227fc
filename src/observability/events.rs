//! Structured change journal for `phasekeeper`.
//!
//! Every completed tracker mutation can be recorded as a typed event,
//! serialized as newline-delimited JSON (JSONL) with a monotonically
//! increasing sequence number. The journal is write-only: views still
//! re-derive their state through `group_by_phase`.

use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::{GroupId, MeleeRole, ParticipantId, Phase};

// ---------------------------------------------------------------------------
// Event variants
// ---------------------------------------------------------------------------

/// A completed tracker mutation.
///
/// Each variant is tagged with `"type"` when serialized to JSON so consumers
/// can dispatch on the event kind.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum TrackerEvent {
    /// A participant was placed into a phase (or reordered within one).
    PhaseAssigned {
        /// When the write completed.
        timestamp: DateTime<Utc>,
        /// Moved participant.
        participant: ParticipantId,
        /// Phase before the move.
        from: Phase,
        /// Phase after the move.
        to: Phase,
        /// New order key.
        order: f64,
        /// Round stamped on the record.
        round: u64,
    },

    /// Role and group were cleared because the phase changed.
    EngagementCleared {
        /// When the write completed.
        timestamp: DateTime<Utc>,
        /// Affected participant.
        participant: ParticipantId,
        /// Group the participant referenced, if any.
        group_id: Option<GroupId>,
    },

    /// A new engagement group was formed.
    GroupFormed {
        /// When the last member write completed.
        timestamp: DateTime<Utc>,
        /// Fresh group id.
        group_id: GroupId,
        /// Member ranked highest by reaction result.
        attacker: ParticipantId,
        /// All members in encounter order.
        members: Vec<ParticipantId>,
    },

    /// A participant joined an existing group as attacker.
    GroupJoined {
        /// When the last write completed.
        timestamp: DateTime<Utc>,
        /// Joined group.
        group_id: GroupId,
        /// The newcomer.
        joiner: ParticipantId,
        /// Pre-existing members, now all defenders.
        defenders: Vec<ParticipantId>,
    },

    /// A 2-person group lost a member and the remaining one was released.
    PartnerReleased {
        /// When the write completed.
        timestamp: DateTime<Utc>,
        /// Released participant.
        participant: ParticipantId,
        /// Group that dissolved.
        group_id: GroupId,
    },

    /// A role was flipped.
    RoleToggled {
        /// When the last write completed.
        timestamp: DateTime<Utc>,
        /// Invoking participant.
        participant: ParticipantId,
        /// Its new role.
        role: MeleeRole,
        /// Opponent flipped alongside it in a 1v1.
        partner: Option<ParticipantId>,
    },

    /// A participant left its group.
    Disengaged {
        /// When the write completed.
        timestamp: DateTime<Utc>,
        /// Participant that left.
        participant: ParticipantId,
        /// Group it left.
        group_id: Option<GroupId>,
    },

    /// Every participant was moved back to `none`.
    AllReset {
        /// When the bulk write completed.
        timestamp: DateTime<Utc>,
        /// Encounter id.
        encounter: String,
        /// Round stamped on every record.
        round: u64,
        /// Number of participants reset.
        participants: usize,
    },

    /// A reaction result was stored or cleared.
    ReactionRecorded {
        /// When the write completed.
        timestamp: DateTime<Utc>,
        /// Participant.
        participant: ParticipantId,
        /// Stored value; `None` when cleared.
        result: Option<f64>,
    },

    /// A phase was re-sorted by reaction result.
    PhaseSortedByRoll {
        /// When the last write completed.
        timestamp: DateTime<Utc>,
        /// Sorted phase.
        phase: Phase,
        /// Members in their new order.
        participants: Vec<ParticipantId>,
    },

    /// The round counter moved on.
    RoundAdvanced {
        /// When the round changed.
        timestamp: DateTime<Utc>,
        /// Encounter id.
        encounter: String,
        /// New round.
        round: u64,
        /// Whether assignments were reset as part of the advance.
        reset: bool,
    },
}

// ---------------------------------------------------------------------------
// Envelope (adds sequence number via serde flatten)
// ---------------------------------------------------------------------------

/// Wraps a [`TrackerEvent`] with a monotonically increasing sequence number.
#[derive(Debug, Serialize)]
struct EventEnvelope {
    sequence: u64,
    #[serde(flatten)]
    event: TrackerEvent,
}

// ---------------------------------------------------------------------------
// Emitter
// ---------------------------------------------------------------------------

/// Thread-safe, buffered JSONL event writer.
///
/// Events produced by one tracker operation are written as one batch:
/// their sequence numbers are contiguous and the writer is flushed once
/// the whole batch is out. Serialization or I/O failures are dropped; the
/// journal must never fail a tracker operation.
pub struct EventEmitter {
    journal: Mutex<Journal>,
}

struct Journal {
    writer: BufWriter<Box<dyn Write + Send>>,
    next_sequence: u64,
}

impl Journal {
    fn append(&mut self, event: TrackerEvent) {
        let envelope = EventEnvelope {
            sequence: self.next_sequence,
            event,
        };
        self.next_sequence += 1;
        if let Ok(line) = serde_json::to_string(&envelope) {
            let _ = writeln!(self.writer, "{line}");
        }
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("events", &self.event_count())
            .finish_non_exhaustive()
    }
}

impl EventEmitter {
    /// Creates an emitter that writes to the given writer.
    #[must_use]
    pub fn new(writer: Box<dyn Write + Send>) -> Self {
        Self {
            journal: Mutex::new(Journal {
                writer: BufWriter::new(writer),
                next_sequence: 0,
            }),
        }
    }

    /// Creates an emitter that writes to stderr.
    #[must_use]
    pub fn stderr() -> Self {
        Self::new(Box::new(std::io::stderr()))
    }

    /// Creates an emitter that discards every event but still counts them.
    #[must_use]
    pub fn noop() -> Self {
        Self::new(Box::new(std::io::sink()))
    }

    /// Creates an emitter that writes to a file at `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the file cannot be created.
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        let file = std::fs::File::create(path)?;
        Ok(Self::new(Box::new(file)))
    }

    /// Emits a single event.
    pub fn emit(&self, event: TrackerEvent) {
        self.emit_all([event]);
    }

    /// Emits the events of one operation as a contiguous, flushed batch.
    ///
    /// Another operation sharing this emitter cannot interleave its events
    /// with the batch.
    pub fn emit_all(&self, events: impl IntoIterator<Item = TrackerEvent>) {
        let Ok(mut journal) = self.journal.lock() else {
            return;
        };
        let before = journal.next_sequence;
        for event in events {
            journal.append(event);
        }
        if journal.next_sequence != before {
            let _ = journal.writer.flush();
        }
    }

    /// Returns the number of events emitted so far.
    #[must_use]
    pub fn event_count(&self) -> u64 {
        self.journal.lock().map_or(0, |j| j.next_sequence)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
