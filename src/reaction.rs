//! Reaction check boundary
//!
//! The tracker never rolls dice itself. An external [`ReactionSource`]
//! supplies a number per participant; the tracker stores it as
//! `reactionRollResult` and uses it only to rank participants.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::model::{AssignmentRecord, ParticipantId};

/// External supplier of reaction check results.
#[async_trait::async_trait]
pub trait ReactionSource: Send + Sync {
    /// Returns a result for `participant`, or `None` if no check was made.
    async fn roll_for(&self, participant: &ParticipantId) -> Option<f64>;
}

/// Reaction source answering from a fixed table.
#[derive(Debug, Clone, Default)]
pub struct FixedReactions {
    results: HashMap<ParticipantId, f64>,
}

impl FixedReactions {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces one participant's result.
    #[must_use]
    pub fn with(mut self, participant: impl Into<ParticipantId>, result: f64) -> Self {
        self.results.insert(participant.into(), result);
        self
    }
}

impl<P: Into<ParticipantId>> FromIterator<(P, f64)> for FixedReactions {
    fn from_iter<I: IntoIterator<Item = (P, f64)>>(iter: I) -> Self {
        Self {
            results: iter.into_iter().map(|(p, r)| (p.into(), r)).collect(),
        }
    }
}

#[async_trait::async_trait]
impl ReactionSource for FixedReactions {
    async fn roll_for(&self, participant: &ParticipantId) -> Option<f64> {
        self.results.get(participant).copied()
    }
}

/// Sorts items by their record's reaction result, highest first.
///
/// Missing results count as `0`. The sort is stable, so ties keep the
/// input order, which callers pass in encounter order.
pub fn rank_by_reaction<T>(items: &mut [T], record_of: impl Fn(&T) -> &AssignmentRecord) {
    items.sort_by(|a, b| {
        compare_desc(
            record_of(a).reaction_or_zero(),
            record_of(b).reaction_or_zero(),
        )
    });
}

fn compare_desc(a: f64, b: f64) -> Ordering {
    b.total_cmp(&a)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, roll: Option<f64>) -> (ParticipantId, AssignmentRecord) {
        (
            ParticipantId::new(id),
            AssignmentRecord {
                reaction_roll_result: roll,
                ..AssignmentRecord::DEFAULT
            },
        )
    }

    fn ids(members: &[(ParticipantId, AssignmentRecord)]) -> Vec<&str> {
        members.iter().map(|(id, _)| id.as_str()).collect()
    }

    #[test]
    fn test_rank_highest_first() {
        let mut members = vec![member("a", Some(5.0)), member("b", Some(17.0)), member("c", Some(9.0))];
        rank_by_reaction(&mut members, |(_, record)| record);
        assert_eq!(ids(&members), ["b", "c", "a"]);
    }

    #[test]
    fn test_missing_counts_as_zero() {
        let mut members = vec![member("a", None), member("b", Some(-1.0)), member("c", Some(0.5))];
        rank_by_reaction(&mut members, |(_, record)| record);
        assert_eq!(ids(&members), ["c", "a", "b"]);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let mut members = vec![member("a", Some(10.0)), member("b", None), member("c", Some(10.0))];
        rank_by_reaction(&mut members, |(_, record)| record);
        assert_eq!(ids(&members), ["a", "c", "b"]);
    }

    #[tokio::test]
    async fn test_fixed_reactions() {
        let source: FixedReactions = [("a", 12.0)].into_iter().collect();
        assert_eq!(source.roll_for(&"a".into()).await, Some(12.0));
        assert_eq!(source.roll_for(&"b".into()).await, None);

        let source = FixedReactions::new().with("b", 3.0);
        assert_eq!(source.roll_for(&"b".into()).await, Some(3.0));
    }
}
