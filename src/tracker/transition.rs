//! Phase assignment and reordering

use chrono::Utc;
use tracing::{debug, info};

use crate::error::TrackerError;
use crate::model::{AssignmentRecord, ParticipantId, Phase, RecordPatch};
use crate::observability::TrackerEvent;
use crate::ordering::order_for_insert;
use crate::store::FlagStore;

use super::{PhaseTracker, engagement, observe};

/// Result of [`PhaseTracker::assign_phase`].
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseAssignment {
    /// Record before the move
    pub previous: AssignmentRecord,
    /// Record after the move
    pub record: AssignmentRecord,
    /// Whether role or group references were removed
    pub engagement_cleared: bool,
}

impl<S: FlagStore> PhaseTracker<S> {
    /// Places `participant` into `phase` at visual position `index`
    /// (`None` appends), stamped with `round`.
    ///
    /// The participant itself is left out of the target sequence before
    /// `index` is applied, so a reorder within the same phase indexes the
    /// other members. Changing phase always clears role and group; a pure
    /// reorder keeps them.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown participant (nothing written).
    /// `StoreFailure` if either write fails; when the clearing write fails
    /// the new phase stays applied.
    pub async fn assign_phase(
        &self,
        participant: &ParticipantId,
        phase: Phase,
        index: Option<usize>,
        round: u64,
    ) -> Result<PhaseAssignment, TrackerError> {
        let result = self.move_participant(participant, phase, index, round).await;
        observe("assign_phase", result)
    }

    async fn move_participant(
        &self,
        participant: &ParticipantId,
        phase: Phase,
        index: Option<usize>,
        round: u64,
    ) -> Result<PhaseAssignment, TrackerError> {
        self.encounter.require(participant)?;
        let previous = self.read_assignment(participant);

        let groups = self.group_by_phase();
        let others: Vec<f64> = groups
            .get(phase)
            .iter()
            .filter(|e| e.id() != participant)
            .map(|e| e.record.order)
            .collect();
        let order = order_for_insert(
            &others,
            index.unwrap_or(others.len()),
            self.config.ordering,
        );

        self.write_assignment(participant, phase, order, round).await?;

        let phase_changed = previous.phase != phase;
        if phase_changed {
            self.apply_patches(
                "assign_phase",
                vec![(participant.clone(), RecordPatch::clear_engagement())],
            )
            .await?;
        }
        let engagement_cleared = phase_changed && previous.has_engagement();

        info!(
            %participant,
            from = %previous.phase,
            to = %phase,
            order,
            round,
            engagement_cleared,
            "phase assigned"
        );
        let now = Utc::now();
        let mut events = vec![TrackerEvent::PhaseAssigned {
            timestamp: now,
            participant: participant.clone(),
            from: previous.phase,
            to: phase,
            order,
            round,
        }];

        if engagement_cleared {
            if let Some(group) = &previous.engagement_group_id {
                let left = engagement::members_of(&self.roster(), group).len();
                if left == 1 {
                    debug!(%group, "group left with a single member after phase change");
                }
            }
            events.push(TrackerEvent::EngagementCleared {
                timestamp: now,
                participant: participant.clone(),
                group_id: previous.engagement_group_id.clone(),
            });
        }
        self.events.emit_all(events);

        Ok(PhaseAssignment {
            record: self.read_assignment(participant),
            previous,
            engagement_cleared,
        })
    }
}
