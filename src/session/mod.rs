//! Host shell: encounter files and action scripts
//!
//! Stands in for the host document layer when the tracker is driven from
//! the command line or from tests.

pub mod file;
pub mod script;

pub use file::{EncounterFile, FileFormat, ParticipantEntry};
pub use script::{Action, Script, ScriptReport, run_script};
