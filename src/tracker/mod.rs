//! Per-encounter view-model
//!
//! A [`PhaseTracker`] is constructed for one encounter session and passed
//! by reference to whoever needs it. It owns no derived state: every view
//! is re-read from the [`FlagStore`] on each call, and every mutation
//! writes back through it.
//!
//! The operations are split across submodules:
//! - [`grouping`]: derived views (`group_by_phase`, engaged groups)
//! - [`transition`]: phase assignment and reordering
//! - [`engagement`]: melee engagement groups and roles

pub mod engagement;
pub mod grouping;
pub mod transition;

pub use engagement::{EngagementOutcome, EngagementPlan};
pub use grouping::{EngagedGroup, Entry, PhaseGroups, engaged_groups};
pub use transition::PhaseAssignment;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::error::TrackerError;
use crate::model::{
    AssignmentRecord, Encounter, FieldChange, Participant, ParticipantId, Phase, RecordPatch,
};
use crate::observability::metrics;
use crate::observability::{EventEmitter, TrackerEvent};
use crate::ordering::spaced_orders;
use crate::reaction::{ReactionSource, rank_by_reaction};
use crate::store::FlagStore;

/// Phase and engagement state of one encounter.
#[derive(Debug)]
pub struct PhaseTracker<S> {
    encounter: Encounter,
    store: Arc<S>,
    config: TrackerConfig,
    events: Arc<EventEmitter>,
}

impl<S: FlagStore> PhaseTracker<S> {
    /// Creates a tracker that emits no events.
    #[must_use]
    pub fn new(encounter: Encounter, store: Arc<S>, config: TrackerConfig) -> Self {
        Self {
            encounter,
            store,
            config,
            events: Arc::new(EventEmitter::noop()),
        }
    }

    /// Routes change events to `events`.
    #[must_use]
    pub fn with_events(mut self, events: Arc<EventEmitter>) -> Self {
        self.events = events;
        self
    }

    /// The encounter this tracker operates on.
    #[must_use]
    pub const fn encounter(&self) -> &Encounter {
        &self.encounter
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Underlying store.
    #[must_use]
    pub const fn store(&self) -> &Arc<S> {
        &self.store
    }

    // ========================================================================
    // Phase State Model
    // ========================================================================

    /// Reads a participant's record merged over the default record.
    ///
    /// Never fails: a participant that was never assigned, or whose stored
    /// values are malformed, reads as [`AssignmentRecord::DEFAULT`].
    #[must_use]
    pub fn read_assignment(&self, participant: &ParticipantId) -> AssignmentRecord {
        AssignmentRecord::from_flags(participant, |key| self.store.get(participant, key))
    }

    /// Overwrites `phase`, `order`, and `round` in a single store request.
    ///
    /// Role, group, and reaction result are left untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown participant, `InvalidState` for a
    /// non-finite order (nothing written in either case), `StoreFailure`
    /// if the store rejects the write.
    pub async fn write_assignment(
        &self,
        participant: &ParticipantId,
        phase: Phase,
        order: f64,
        round: u64,
    ) -> Result<(), TrackerError> {
        if let Err(error) = self.encounter.require(participant) {
            return observe("write_assignment", Err(error));
        }
        if !order.is_finite() {
            return observe(
                "write_assignment",
                Err(TrackerError::InvalidState(format!(
                    "order for '{participant}' must be finite, got {order}"
                ))),
            );
        }
        let result = self
            .apply_patches(
                "write_assignment",
                vec![(
                    participant.clone(),
                    RecordPatch::assignment(phase, order, round),
                )],
            )
            .await;
        observe("write_assignment", result)
    }

    /// Every participant with its current record, in encounter order.
    #[must_use]
    pub fn roster(&self) -> Vec<Entry> {
        self.encounter
            .participants
            .iter()
            .map(|p| Entry {
                participant: p.clone(),
                record: self.read_assignment(&p.id),
            })
            .collect()
    }

    /// Partitions the encounter by phase, each sequence sorted by order.
    ///
    /// Performs a fresh read on every call.
    #[must_use]
    pub fn group_by_phase(&self) -> PhaseGroups {
        PhaseGroups::from_roster(&self.roster())
    }

    /// Moves every participant back to `none` with order `0`, stamped with
    /// the encounter's current round.
    ///
    /// Role and group references are left as they are.
    ///
    /// # Errors
    ///
    /// `StoreFailure` if the bulk write fails.
    pub async fn reset_all(&self) -> Result<(), TrackerError> {
        let round = self.encounter.round;
        let updates = self
            .encounter
            .ids()
            .flat_map(|id| RecordPatch::assignment(Phase::Unassigned, 0.0, round).to_updates(id))
            .collect();

        metrics::record_store_write("bulk");
        let result = self
            .store
            .bulk_set(&self.encounter, updates)
            .await
            .map_err(TrackerError::from);

        if result.is_ok() {
            info!(encounter = %self.encounter.id, round, "all assignments reset");
            self.events.emit(TrackerEvent::AllReset {
                timestamp: Utc::now(),
                encounter: self.encounter.id.clone(),
                round,
                participants: self.encounter.len(),
            });
        }
        observe("reset_all", result)
    }

    // ========================================================================
    // Reaction results
    // ========================================================================

    /// Stores (`Some`) or clears (`None`) a participant's reaction result.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown participant, `InvalidState` for a
    /// non-finite result, `StoreFailure` if the write fails.
    pub async fn record_reaction(
        &self,
        participant: &ParticipantId,
        result: Option<f64>,
    ) -> Result<(), TrackerError> {
        let outcome = self.store_reaction(participant, result).await;
        observe("record_reaction", outcome)
    }

    async fn store_reaction(
        &self,
        participant: &ParticipantId,
        result: Option<f64>,
    ) -> Result<(), TrackerError> {
        self.encounter.require(participant)?;
        let change = match result {
            Some(value) if !value.is_finite() => {
                return Err(TrackerError::InvalidState(format!(
                    "reaction result for '{participant}' must be finite, got {value}"
                )));
            }
            Some(value) => FieldChange::Set(value),
            None => FieldChange::Clear,
        };
        let patch = RecordPatch {
            reaction_roll_result: change,
            ..RecordPatch::default()
        };
        self.apply_patches("record_reaction", vec![(participant.clone(), patch)])
            .await?;

        debug!(%participant, ?result, "reaction result recorded");
        self.events.emit(TrackerEvent::ReactionRecorded {
            timestamp: Utc::now(),
            participant: participant.clone(),
            result,
        });
        Ok(())
    }

    /// Asks `source` for a result per participant and records every value
    /// it returns. Participants without a result keep their stored value.
    ///
    /// Returns the number of results recorded.
    ///
    /// # Errors
    ///
    /// `NotFound` if any participant is unknown (checked before rolling),
    /// `StoreFailure` on the first failed write.
    pub async fn roll_reactions(
        &self,
        source: &dyn ReactionSource,
        participants: &[ParticipantId],
    ) -> Result<usize, TrackerError> {
        if let Some(unknown) = participants.iter().find(|id| !self.encounter.contains(id)) {
            return observe("roll_reactions", Err(TrackerError::participant(unknown.as_str())));
        }

        let mut recorded = 0;
        for participant in participants {
            if let Some(result) = source.roll_for(participant).await {
                self.record_reaction(participant, Some(result)).await?;
                recorded += 1;
            }
        }
        observe("roll_reactions", Ok(recorded))
    }

    /// Rewrites the order keys of one phase by reaction result, highest
    /// first, ties in encounter order. Engagement state is untouched.
    ///
    /// Returns the phase members in their new order.
    ///
    /// # Errors
    ///
    /// `StoreFailure` on the first failed write; members written before
    /// it keep their new order.
    pub async fn sort_phase_by_roll(&self, phase: Phase) -> Result<Vec<ParticipantId>, TrackerError> {
        let mut members: Vec<Entry> = self
            .roster()
            .into_iter()
            .filter(|e| e.record.phase == phase)
            .collect();
        rank_by_reaction(&mut members, |e| &e.record);

        let orders = spaced_orders(members.len(), self.config.ordering);
        let patches = members
            .iter()
            .zip(orders)
            .map(|(entry, order)| {
                (
                    entry.id().clone(),
                    RecordPatch {
                        order: Some(order),
                        ..RecordPatch::default()
                    },
                )
            })
            .collect();

        let result = self.apply_patches("sort_phase_by_roll", patches).await;
        let sorted: Vec<ParticipantId> = members.iter().map(|e| e.id().clone()).collect();
        if result.is_ok() {
            info!(%phase, count = sorted.len(), "phase sorted by reaction result");
            self.events.emit(TrackerEvent::PhaseSortedByRoll {
                timestamp: Utc::now(),
                phase,
                participants: sorted.clone(),
            });
        }
        observe("sort_phase_by_roll", result.map(|()| sorted))
    }

    // ========================================================================
    // Rounds
    // ========================================================================

    /// Moves the encounter to `round`, resetting every assignment first
    /// when `reset_on_round_advance` is configured.
    ///
    /// Returns whether a reset was performed.
    ///
    /// # Errors
    ///
    /// `InvalidState` if `round` is lower than the current round,
    /// `StoreFailure` if the reset fails (the round counter still moves).
    pub async fn advance_round(&mut self, round: u64) -> Result<bool, TrackerError> {
        if round < self.encounter.round {
            return observe(
                "advance_round",
                Err(TrackerError::InvalidState(format!(
                    "round cannot go back from {} to {round}",
                    self.encounter.round
                ))),
            );
        }

        self.encounter.round = round;
        let reset = self.config.reset_on_round_advance;
        if reset {
            self.reset_all().await?;
        }

        info!(encounter = %self.encounter.id, round, reset, "round advanced");
        self.events.emit(TrackerEvent::RoundAdvanced {
            timestamp: Utc::now(),
            encounter: self.encounter.id.clone(),
            round,
            reset,
        });
        observe("advance_round", Ok(reset))
    }

    // ========================================================================
    // Engagement views
    // ========================================================================

    /// Live engagement groups (two or more melee members).
    #[must_use]
    pub fn engaged_groups(&self) -> Vec<EngagedGroup> {
        engaged_groups(&self.roster())
    }

    /// The opponent of `participant` in a 1v1 engagement.
    ///
    /// Returns `None` when the participant is unengaged, alone in its
    /// group, or part of a larger group.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown participant.
    pub fn partner_of(&self, participant: &ParticipantId) -> Result<Option<Participant>, TrackerError> {
        self.encounter.require(participant)?;
        let roster = self.roster();
        let Some(group) = roster
            .iter()
            .find(|e| e.id() == participant)
            .filter(|e| e.record.phase == Phase::Melee)
            .and_then(|e| e.record.engagement_group_id.clone())
        else {
            return Ok(None);
        };

        match engagement::members_of(&roster, &group).as_slice() {
            [a, b] => {
                let other = if a.id() == participant { b } else { a };
                Ok(Some(other.participant.clone()))
            }
            _ => Ok(None),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Applies per-participant patches as independent store requests, in
    /// order. Patches that change nothing are skipped.
    ///
    /// A failure stops the sequence; earlier writes are not rolled back.
    async fn apply_patches(
        &self,
        operation: &'static str,
        patches: Vec<(ParticipantId, RecordPatch)>,
    ) -> Result<(), TrackerError> {
        let total = patches.len();
        for (applied, (participant, patch)) in patches.into_iter().enumerate() {
            if patch.is_empty() {
                continue;
            }
            metrics::record_store_write("participant");
            if let Err(error) = self
                .store
                .bulk_set(&self.encounter, patch.to_updates(&participant))
                .await
            {
                warn!(
                    operation,
                    %participant,
                    applied,
                    total,
                    %error,
                    "store write failed; earlier writes stay applied"
                );
                return Err(error.into());
            }
        }
        Ok(())
    }
}

/// Records the outcome of a public operation.
fn observe<T>(operation: &'static str, result: Result<T, TrackerError>) -> Result<T, TrackerError> {
    match &result {
        Ok(_) => metrics::record_operation(operation, "ok"),
        Err(error) => {
            debug!(operation, %error, "operation rejected");
            metrics::record_operation(operation, error.label());
        }
    }
    result
}
