//! Fractional order keys for drag-reordering within a phase
//!
//! A participant dropped at a visual position gets the midpoint of its
//! neighbours' order keys, so existing members are never renumbered.
//!
//! Order keys are `f64`. Repeated insertions at the same position halve
//! the gap each time; after roughly 52 halvings two neighbours can no
//! longer be told apart. This is a known limitation and keys are never
//! rebalanced automatically.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Order key given to the first member of an empty phase.
pub const DEFAULT_SEED_ORDER: f64 = 1000.0;

/// Distance past the last member used when appending.
pub const DEFAULT_TAIL_GAP: f64 = 2000.0;

/// Tunables for midpoint insertion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrderingParams {
    /// Order key for the first member of an empty phase.
    pub seed: f64,
    /// Virtual gap after the last member when appending.
    pub tail_gap: f64,
}

impl Default for OrderingParams {
    fn default() -> Self {
        Self {
            seed: DEFAULT_SEED_ORDER,
            tail_gap: DEFAULT_TAIL_GAP,
        }
    }
}

/// Computes the order key for inserting at `index` into a phase whose
/// members currently have the (ascending) keys in `sequence`.
///
/// `index` 0 inserts before everyone, `sequence.len()` appends. Larger
/// indices are clamped to the end.
#[must_use]
pub fn order_for_insert(sequence: &[f64], index: usize, params: OrderingParams) -> f64 {
    if sequence.is_empty() {
        return params.seed;
    }

    let index = index.min(sequence.len());
    let prev = if index == 0 { 0.0 } else { sequence[index - 1] };
    let next = sequence
        .get(index)
        .copied()
        .unwrap_or(prev + params.tail_gap);

    (prev + next) / 2.0
}

/// Total comparator for order keys.
#[must_use]
pub fn compare_orders(a: f64, b: f64) -> Ordering {
    a.total_cmp(&b)
}

/// Orders for a phase re-sorted by rank: `seed`, `2 × seed`, ...
#[must_use]
pub fn spaced_orders(count: usize, params: OrderingParams) -> Vec<f64> {
    (1..=count)
        .map(|rank| {
            #[allow(clippy::cast_precision_loss)]
            let rank = rank as f64;
            rank * params.seed
        })
        .collect()
}
