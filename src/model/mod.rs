//! Assignment data model
//!
//! Strongly-typed participant assignment records, the closed phase
//! taxonomy, and the encounter the records belong to.
//!
//! # Architecture
//!
//! - [`AssignmentRecord`]: per-participant phase, order, round, and melee state
//! - [`RecordPatch`]: partial update, converted to flat store writes
//! - [`FlagKey`]: the persisted keys of the flat per-participant flag bag
//! - [`Encounter`]: ordered participants plus the current round

pub mod encounter;
pub mod record;

pub use encounter::{Encounter, Participant, ParticipantId};
pub use record::{
    AssignmentRecord, FieldChange, FlagKey, GroupId, MeleeRole, Phase, RecordPatch,
};
