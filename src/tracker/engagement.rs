//! Engagement planning
//!
//! Melee engagement transitions as pure functions over a roster. Each
//! planner checks every precondition first and either fails without
//! side effects or returns the full list of per-participant patches.
//! [`PhaseTracker`](super::PhaseTracker) then writes those patches one
//! participant at a time.
//!
//! Group membership is always derived: the members of a group are the
//! melee participants currently referencing its id.

use std::collections::HashSet;

use chrono::Utc;
use tracing::{debug, info};

use crate::error::TrackerError;
use crate::model::{GroupId, MeleeRole, ParticipantId, Phase, RecordPatch};
use crate::observability::TrackerEvent;
use crate::reaction::rank_by_reaction;
use crate::store::FlagStore;

use super::grouping::Entry;
use super::{PhaseTracker, observe};

/// What an engagement transition did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngagementOutcome {
    /// A fresh group was created.
    Formed {
        /// New group id
        group_id: GroupId,
        /// Highest reaction result
        attacker: ParticipantId,
        /// Every member, in encounter order
        members: Vec<ParticipantId>,
    },
    /// A participant joined an existing group.
    Joined {
        /// Joined group
        group_id: GroupId,
        /// Newcomer, now the attacker
        joiner: ParticipantId,
        /// Pre-existing members, now defenders
        defenders: Vec<ParticipantId>,
    },
    /// A role was flipped.
    Toggled {
        /// Invoking participant
        participant: ParticipantId,
        /// Its new role
        role: MeleeRole,
        /// Opponent flipped alongside it in a 1v1
        partner: Option<ParticipantId>,
    },
    /// A participant left its group.
    Disengaged {
        /// Participant that left
        participant: ParticipantId,
        /// Group it referenced
        group_id: Option<GroupId>,
        /// Members still referencing that group
        remaining: usize,
    },
}

/// Planned writes for one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct EngagementPlan {
    /// Result reported once the writes complete
    pub outcome: EngagementOutcome,
    /// Participants released because their group would drop to one member
    pub released: Vec<(ParticipantId, GroupId)>,
    /// Per-participant patches, in write order
    pub patches: Vec<(ParticipantId, RecordPatch)>,
}

// ============================================================================
// Roster helpers
// ============================================================================

fn find<'a>(roster: &'a [Entry], id: &ParticipantId) -> Result<&'a Entry, TrackerError> {
    roster
        .iter()
        .find(|e| e.id() == id)
        .ok_or_else(|| TrackerError::participant(id.as_str()))
}

fn require_melee(entry: &Entry, action: &str) -> Result<(), TrackerError> {
    if entry.record.phase == Phase::Melee {
        Ok(())
    } else {
        Err(TrackerError::InvalidState(format!(
            "cannot {action}: '{}' is in phase '{}', not melee",
            entry.id(),
            entry.record.phase
        )))
    }
}

/// Current members of `group`, in encounter order.
#[must_use]
pub fn members_of<'a>(roster: &'a [Entry], group: &GroupId) -> Vec<&'a Entry> {
    roster.iter().filter(|e| e.in_group(group)).collect()
}

/// Finds members that would be left alone in their old group once
/// `leaving` move elsewhere.
fn stranded_partners(
    roster: &[Entry],
    leaving: &[&Entry],
    destination: Option<&GroupId>,
) -> Vec<(ParticipantId, GroupId)> {
    let leaving_ids: HashSet<&ParticipantId> = leaving.iter().map(|e| e.id()).collect();
    let mut seen: HashSet<&GroupId> = HashSet::new();
    let mut stranded = Vec::new();

    for entry in leaving {
        let Some(old) = entry.record.engagement_group_id.as_ref() else {
            continue;
        };
        if Some(old) == destination || !seen.insert(old) {
            continue;
        }
        let remaining: Vec<&Entry> = members_of(roster, old)
            .into_iter()
            .filter(|m| !leaving_ids.contains(m.id()))
            .collect();
        if let [alone] = remaining.as_slice() {
            stranded.push((alone.id().clone(), old.clone()));
        }
    }

    stranded
}

fn push_patch(
    patches: &mut Vec<(ParticipantId, RecordPatch)>,
    entry: &Entry,
    patch: RecordPatch,
) {
    if entry.record.patched(&patch) != entry.record {
        patches.push((entry.id().clone(), patch));
    }
}

// ============================================================================
// Planners
// ============================================================================

/// Plans `initiator` engaging `target`.
///
/// Joins the target's group if it has one, otherwise forms a new group of two.
///
/// # Errors
///
/// `NotFound` for unknown participants; `InvalidState` if either is not in
/// melee, they are the same participant, or they already share a group.
pub fn plan_engage(
    roster: &[Entry],
    initiator: &ParticipantId,
    target: &ParticipantId,
) -> Result<EngagementPlan, TrackerError> {
    let init = find(roster, initiator)?;
    let tgt = find(roster, target)?;
    if initiator == target {
        return Err(TrackerError::InvalidState(format!(
            "'{initiator}' cannot engage itself"
        )));
    }
    require_melee(init, "engage")?;
    require_melee(tgt, "engage")?;

    match &tgt.record.engagement_group_id {
        Some(group) if init.record.engagement_group_id.as_ref() == Some(group) => {
            Err(TrackerError::InvalidState(format!(
                "'{initiator}' and '{target}' are already engaged in group {group}"
            )))
        }
        Some(group) => plan_join_group(roster, initiator, group),
        None => plan_form_group(roster, &[initiator.clone(), target.clone()], GroupId::generate()),
    }
}

/// Plans a new group from `members` under `group_id`.
///
/// Members are ranked by reaction result (missing = 0, ties by encounter
/// order); the top one attacks, everyone else defends.
///
/// # Errors
///
/// `NotFound` for unknown participants; `InvalidState` for fewer than two
/// distinct members or any member outside melee.
pub fn plan_form_group(
    roster: &[Entry],
    members: &[ParticipantId],
    group_id: GroupId,
) -> Result<EngagementPlan, TrackerError> {
    let mut unique: HashSet<&ParticipantId> = HashSet::new();
    for id in members {
        find(roster, id)?;
        if !unique.insert(id) {
            return Err(TrackerError::InvalidState(format!(
                "'{id}' listed more than once"
            )));
        }
    }
    if unique.len() < 2 {
        return Err(TrackerError::InvalidState(
            "an engagement group needs at least two members".to_string(),
        ));
    }

    // Encounter order, then by reaction.
    let mut forming: Vec<&Entry> = roster.iter().filter(|e| unique.contains(e.id())).collect();
    for entry in &forming {
        require_melee(entry, "form a group")?;
    }
    let released = stranded_partners(roster, &forming, None);

    let encounter_order: Vec<ParticipantId> = forming.iter().map(|e| e.id().clone()).collect();
    rank_by_reaction(&mut forming, |e| &e.record);
    let attacker = forming[0].id().clone();

    let mut patches = Vec::new();
    for (id, group) in &released {
        let entry = find(roster, id)?;
        push_patch(&mut patches, entry, RecordPatch::clear_engagement());
        debug!(participant = %id, %group, "releasing partner of dissolved pair");
    }
    for entry in roster.iter().filter(|e| unique.contains(e.id())) {
        let role = if *entry.id() == attacker {
            MeleeRole::Attacker
        } else {
            MeleeRole::Defender
        };
        push_patch(&mut patches, entry, RecordPatch::engage(group_id.clone(), role));
    }

    Ok(EngagementPlan {
        outcome: EngagementOutcome::Formed {
            group_id,
            attacker,
            members: encounter_order,
        },
        released,
        patches,
    })
}

/// Plans `joiner` entering `group_id` as the attacker.
///
/// Every existing member becomes a defender. If the joiner leaves a group
/// where only one other member would remain, that member is released.
///
/// # Errors
///
/// `NotFound` for an unknown joiner or a group with no other melee members;
/// `InvalidState` if the joiner is not in melee or already in the group.
pub fn plan_join_group(
    roster: &[Entry],
    joiner: &ParticipantId,
    group_id: &GroupId,
) -> Result<EngagementPlan, TrackerError> {
    let entry = find(roster, joiner)?;
    require_melee(entry, "join a group")?;
    if entry.record.engagement_group_id.as_ref() == Some(group_id) {
        return Err(TrackerError::InvalidState(format!(
            "'{joiner}' is already in group {group_id}"
        )));
    }

    let incumbents = members_of(roster, group_id);
    if incumbents.is_empty() {
        return Err(TrackerError::NotFound {
            kind: "group",
            id: group_id.to_string(),
            suggestion: None,
        });
    }

    let released = stranded_partners(roster, &[entry], Some(group_id));

    let mut patches = Vec::new();
    for (id, _) in &released {
        push_patch(&mut patches, find(roster, id)?, RecordPatch::clear_engagement());
    }
    push_patch(
        &mut patches,
        entry,
        RecordPatch::engage(group_id.clone(), MeleeRole::Attacker),
    );
    for member in &incumbents {
        push_patch(&mut patches, member, RecordPatch::role(MeleeRole::Defender));
    }

    Ok(EngagementPlan {
        outcome: EngagementOutcome::Joined {
            group_id: group_id.clone(),
            joiner: joiner.clone(),
            defenders: incumbents.iter().map(|m| m.id().clone()).collect(),
        },
        released,
        patches,
    })
}

/// Plans flipping `participant`'s role.
///
/// In a group of exactly two, the opponent is set to the opposite role so a
/// 1v1 always has one attacker and one defender. Larger groups only change
/// the invoking participant.
///
/// # Errors
///
/// `NotFound` for an unknown participant; `InvalidState` if it is not in
/// melee or has no role.
pub fn plan_toggle_role(
    roster: &[Entry],
    participant: &ParticipantId,
) -> Result<EngagementPlan, TrackerError> {
    let entry = find(roster, participant)?;
    require_melee(entry, "toggle role")?;
    let Some(current) = entry.record.melee_role else {
        return Err(TrackerError::InvalidState(format!(
            "'{participant}' has no melee role to toggle"
        )));
    };
    let role = current.flipped();

    let mut patches = vec![(participant.clone(), RecordPatch::role(role))];
    let mut partner = None;

    if let Some(group) = &entry.record.engagement_group_id {
        let members = members_of(roster, group);
        if members.len() == 2 {
            if let Some(other) = members.iter().find(|m| m.id() != participant) {
                push_patch(&mut patches, other, RecordPatch::role(role.flipped()));
                partner = Some(other.id().clone());
            }
        }
    }

    Ok(EngagementPlan {
        outcome: EngagementOutcome::Toggled {
            participant: participant.clone(),
            role,
            partner,
        },
        released: Vec::new(),
        patches,
    })
}

/// Plans clearing `participant`'s group and role.
///
/// Other members are left untouched, even if only one of them remains.
///
/// # Errors
///
/// `NotFound` for an unknown participant; `InvalidState` if it is not in
/// melee or carries no engagement state.
pub fn plan_disengage(
    roster: &[Entry],
    participant: &ParticipantId,
) -> Result<EngagementPlan, TrackerError> {
    let entry = find(roster, participant)?;
    require_melee(entry, "disengage")?;
    if !entry.record.has_engagement() {
        return Err(TrackerError::InvalidState(format!(
            "'{participant}' is not engaged"
        )));
    }

    let group_id = entry.record.engagement_group_id.clone();
    let remaining = group_id.as_ref().map_or(0, |g| {
        members_of(roster, g)
            .iter()
            .filter(|m| m.id() != participant)
            .count()
    });

    Ok(EngagementPlan {
        outcome: EngagementOutcome::Disengaged {
            participant: participant.clone(),
            group_id,
            remaining,
        },
        released: Vec::new(),
        patches: vec![(participant.clone(), RecordPatch::clear_engagement())],
    })
}

// ============================================================================
// Tracker operations
// ============================================================================

impl<S: FlagStore> PhaseTracker<S> {
    /// `initiator` engages `target`: joins the target's group, or forms a
    /// new pair if the target is unengaged.
    ///
    /// # Errors
    ///
    /// See [`plan_engage`]; `StoreFailure` if a write fails part way.
    pub async fn engage(
        &self,
        initiator: &ParticipantId,
        target: &ParticipantId,
    ) -> Result<EngagementOutcome, TrackerError> {
        let plan = plan_engage(&self.roster(), initiator, target);
        self.execute("engage", plan).await
    }

    /// Forms a fresh group from `members`.
    ///
    /// # Errors
    ///
    /// See [`plan_form_group`]; `StoreFailure` if a write fails part way.
    pub async fn form_group(
        &self,
        members: &[ParticipantId],
    ) -> Result<EngagementOutcome, TrackerError> {
        let plan = plan_form_group(&self.roster(), members, GroupId::generate());
        self.execute("form_group", plan).await
    }

    /// Adds `joiner` to `group_id` as the new attacker.
    ///
    /// # Errors
    ///
    /// See [`plan_join_group`]; `StoreFailure` if a write fails part way.
    pub async fn join_group(
        &self,
        joiner: &ParticipantId,
        group_id: &GroupId,
    ) -> Result<EngagementOutcome, TrackerError> {
        let plan = plan_join_group(&self.roster(), joiner, group_id);
        self.execute("join_group", plan).await
    }

    /// Flips a participant's role, and its opponent's in a 1v1.
    ///
    /// # Errors
    ///
    /// See [`plan_toggle_role`]; `StoreFailure` if a write fails part way.
    pub async fn toggle_role(
        &self,
        participant: &ParticipantId,
    ) -> Result<EngagementOutcome, TrackerError> {
        let plan = plan_toggle_role(&self.roster(), participant);
        self.execute("toggle_role", plan).await
    }

    /// Removes a participant from its group.
    ///
    /// # Errors
    ///
    /// See [`plan_disengage`]; `StoreFailure` if the write fails.
    pub async fn disengage(
        &self,
        participant: &ParticipantId,
    ) -> Result<EngagementOutcome, TrackerError> {
        let plan = plan_disengage(&self.roster(), participant);
        self.execute("disengage", plan).await
    }

    async fn execute(
        &self,
        operation: &'static str,
        plan: Result<EngagementPlan, TrackerError>,
    ) -> Result<EngagementOutcome, TrackerError> {
        let result = match plan {
            Ok(plan) => self.commit(operation, plan).await,
            Err(error) => Err(error),
        };
        observe(operation, result)
    }

    async fn commit(
        &self,
        operation: &'static str,
        plan: EngagementPlan,
    ) -> Result<EngagementOutcome, TrackerError> {
        let EngagementPlan {
            outcome,
            released,
            patches,
        } = plan;
        self.apply_patches(operation, patches).await?;

        let timestamp = Utc::now();
        let mut events: Vec<TrackerEvent> = released
            .into_iter()
            .map(|(participant, group_id)| TrackerEvent::PartnerReleased {
                timestamp,
                participant,
                group_id,
            })
            .collect();

        let event = match &outcome {
            EngagementOutcome::Formed {
                group_id,
                attacker,
                members,
            } => {
                info!(%group_id, %attacker, members = members.len(), "engagement group formed");
                TrackerEvent::GroupFormed {
                    timestamp,
                    group_id: group_id.clone(),
                    attacker: attacker.clone(),
                    members: members.clone(),
                }
            }
            EngagementOutcome::Joined {
                group_id,
                joiner,
                defenders,
            } => {
                info!(%group_id, %joiner, defenders = defenders.len(), "joined engagement group");
                TrackerEvent::GroupJoined {
                    timestamp,
                    group_id: group_id.clone(),
                    joiner: joiner.clone(),
                    defenders: defenders.clone(),
                }
            }
            EngagementOutcome::Toggled {
                participant,
                role,
                partner,
            } => {
                info!(%participant, %role, ?partner, "melee role toggled");
                TrackerEvent::RoleToggled {
                    timestamp,
                    participant: participant.clone(),
                    role: *role,
                    partner: partner.clone(),
                }
            }
            EngagementOutcome::Disengaged {
                participant,
                group_id,
                remaining,
            } => {
                info!(%participant, ?group_id, "disengaged");
                if *remaining == 1 {
                    debug!(?group_id, "group left with a single member");
                }
                TrackerEvent::Disengaged {
                    timestamp,
                    participant: participant.clone(),
                    group_id: group_id.clone(),
                }
            }
        };
        events.push(event);
        self.events.emit_all(events);

        Ok(outcome)
    }
}
