//! Derived views over a roster of records
//!
//! Nothing here is cached: every view is rebuilt from the records read a
//! moment earlier, and every view tolerates half-applied multi-writes
//! (for example a group id referenced by a single participant).

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use crate::model::{AssignmentRecord, GroupId, MeleeRole, Participant, ParticipantId, Phase};
use crate::observability::metrics;
use crate::ordering::compare_orders;

/// A participant together with its current record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Entry {
    /// Participant identity
    pub participant: Participant,
    /// Record as read from the store
    pub record: AssignmentRecord,
}

impl Entry {
    /// Participant id shortcut.
    #[must_use]
    pub const fn id(&self) -> &ParticipantId {
        &self.participant.id
    }

    /// Whether the entry is in melee and references `group`.
    #[must_use]
    pub fn in_group(&self, group: &GroupId) -> bool {
        self.record.phase == Phase::Melee && self.record.engagement_group_id.as_ref() == Some(group)
    }
}

/// Participants partitioned by phase, each sequence sorted by order key.
///
/// All four phases are always present, in taxonomy order, even when empty.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PhaseGroups {
    groups: IndexMap<Phase, Vec<Entry>>,
}

impl PhaseGroups {
    /// Partitions `roster` (in encounter order) by phase.
    ///
    /// Sorting is stable: equal order keys keep encounter order.
    #[must_use]
    pub fn from_roster(roster: &[Entry]) -> Self {
        let mut groups: IndexMap<Phase, Vec<Entry>> =
            Phase::ALL.iter().map(|p| (*p, Vec::new())).collect();

        for entry in roster {
            if let Some(seq) = groups.get_mut(&entry.record.phase) {
                seq.push(entry.clone());
            }
        }
        for seq in groups.values_mut() {
            seq.sort_by(|a, b| compare_orders(a.record.order, b.record.order));
        }

        Self { groups }
    }

    /// Sequence for one phase.
    #[must_use]
    pub fn get(&self, phase: Phase) -> &[Entry] {
        self.groups.get(&phase).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Participant ids of one phase, in display order.
    #[must_use]
    pub fn ids(&self, phase: Phase) -> Vec<&ParticipantId> {
        self.get(phase).iter().map(Entry::id).collect()
    }

    /// Order keys of one phase, ascending.
    #[must_use]
    pub fn orders(&self, phase: Phase) -> Vec<f64> {
        self.get(phase).iter().map(|e| e.record.order).collect()
    }

    /// Iterates `(phase, sequence)` in taxonomy order.
    pub fn iter(&self) -> impl Iterator<Item = (Phase, &[Entry])> {
        self.groups.iter().map(|(p, seq)| (*p, seq.as_slice()))
    }

    /// Total number of participants across all phases.
    #[must_use]
    pub fn total(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

/// A live engagement: a group id shared by at least two melee participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EngagedGroup {
    /// Group id
    pub id: GroupId,
    /// Members in encounter order with their roles
    pub members: Vec<(ParticipantId, Option<MeleeRole>)>,
}

impl EngagedGroup {
    /// Members holding `role`.
    #[must_use]
    pub fn with_role(&self, role: MeleeRole) -> Vec<&ParticipantId> {
        self.members
            .iter()
            .filter(|(_, r)| *r == Some(role))
            .map(|(id, _)| id)
            .collect()
    }
}

/// Collects engagement groups from `roster`.
///
/// Groups referenced by fewer than two melee participants are left out:
/// a lone reference is a leftover from a disengage and means nothing.
#[must_use]
pub fn engaged_groups(roster: &[Entry]) -> Vec<EngagedGroup> {
    let mut by_id: BTreeMap<&GroupId, Vec<(ParticipantId, Option<MeleeRole>)>> = BTreeMap::new();
    for entry in roster {
        if entry.record.phase != Phase::Melee {
            continue;
        }
        if let Some(group) = &entry.record.engagement_group_id {
            by_id
                .entry(group)
                .or_default()
                .push((entry.id().clone(), entry.record.melee_role));
        }
    }

    let ghosts = by_id.values().filter(|m| m.len() < 2).count();
    if ghosts > 0 {
        debug!(ghosts, "skipping single-member engagement groups");
    }
    metrics::record_ghost_groups(ghosts);

    by_id
        .into_iter()
        .filter(|(_, members)| members.len() >= 2)
        .map(|(id, members)| EngagedGroup {
            id: id.clone(),
            members,
        })
        .collect()
}
