//! Encounter and participant identity

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Opaque participant identifier, unique within an encounter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub String);

impl ParticipantId {
    /// Creates a new `ParticipantId`.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ParticipantId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// A combatant taking part in the encounter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Identity
    pub id: ParticipantId,
    /// Display name
    pub name: String,
}

impl Participant {
    /// Creates a participant whose display name equals its id.
    #[must_use]
    pub fn named(id: &str) -> Self {
        Self {
            id: ParticipantId::new(id),
            name: id.to_string(),
        }
    }
}

/// The encounter the tracker operates on.
///
/// Participant order is the encounter iteration order, used as the
/// tie-break everywhere a stable order is needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Encounter {
    /// Encounter identifier
    pub id: String,
    /// Current round counter
    pub round: u64,
    /// Participants in iteration order
    pub participants: Vec<Participant>,
}

impl Encounter {
    /// Creates an encounter.
    #[must_use]
    pub fn new(id: impl Into<String>, round: u64, participants: Vec<Participant>) -> Self {
        Self {
            id: id.into(),
            round,
            participants,
        }
    }

    /// Number of participants.
    #[must_use]
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether the encounter has no participants.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Iterates participant ids in encounter order.
    pub fn ids(&self) -> impl Iterator<Item = &ParticipantId> {
        self.participants.iter().map(|p| &p.id)
    }

    /// Position of a participant in encounter order.
    #[must_use]
    pub fn position(&self, id: &ParticipantId) -> Option<usize> {
        self.participants.iter().position(|p| &p.id == id)
    }

    /// Whether the participant belongs to this encounter.
    #[must_use]
    pub fn contains(&self, id: &ParticipantId) -> bool {
        self.position(id).is_some()
    }

    /// Looks up a participant by id.
    #[must_use]
    pub fn get(&self, id: &ParticipantId) -> Option<&Participant> {
        self.participants.iter().find(|p| &p.id == id)
    }

    /// Like [`get`](Self::get) but reports an unknown id as `NotFound`.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::NotFound` if the participant is not part of the encounter.
    pub fn require(&self, id: &ParticipantId) -> Result<&Participant, TrackerError> {
        self.get(id).ok_or_else(|| TrackerError::participant(id.as_str()))
    }
}
