//! `phasekeeper` - combat phase and engagement tracking
//!
//! Tracks which phase (ranged, melee, mystic, or none) each participant of
//! a turn-based encounter is assigned to, their relative order within that
//! phase, and attacker/defender engagement groups inside melee. State lives
//! in an external per-participant flag store; every view is re-derived
//! from it on read.

pub mod cli;
pub mod config;
pub mod error;
pub mod model;
pub mod observability;
pub mod ordering;
pub mod reaction;
pub mod session;
pub mod store;
pub mod tracker;

pub use error::{PhaseKeeperError, Result, TrackerError};
pub use tracker::PhaseTracker;
