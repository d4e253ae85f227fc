//! Tracker configuration
//!
//! Loaded from an optional YAML file, then overridden from the
//! environment, then validated. Every field has a default, so an empty
//! file (or no file) yields [`TrackerConfig::default`].

pub mod loader;

pub use loader::{ConfigLoader, ENV_RESET_ON_ROUND, ENV_SEED_ORDER, ENV_TAIL_GAP};

use serde::{Deserialize, Serialize};

use crate::error::ValidationIssue;
use crate::ordering::OrderingParams;

/// Runtime settings for a [`PhaseTracker`](crate::tracker::PhaseTracker).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Midpoint insertion tunables.
    pub ordering: OrderingParams,

    /// Reset every assignment to `none` whenever the round advances.
    pub reset_on_round_advance: bool,
}

impl TrackerConfig {
    /// Checks semantic constraints, collecting every problem.
    #[must_use]
    pub fn validate(&self) -> Vec<ValidationIssue> {
        let mut issues = Vec::new();
        check_positive(&mut issues, "ordering.seed", self.ordering.seed);
        check_positive(&mut issues, "ordering.tail_gap", self.ordering.tail_gap);
        issues
    }
}

fn check_positive(issues: &mut Vec<ValidationIssue>, path: &str, value: f64) {
    if !value.is_finite() {
        issues.push(ValidationIssue {
            path: path.to_string(),
            message: format!("must be a finite number, got {value}"),
        });
    } else if value <= 0.0 {
        issues.push(ValidationIssue {
            path: path.to_string(),
            message: format!("must be greater than 0, got {value}"),
        });
    }
}
