//! Participant assignment record and phase taxonomy
//!
//! The host persists one flat key/value bag per participant. This module
//! is the only place that knows those keys: reads merge stored values over
//! [`AssignmentRecord::default`], writes go out as [`RecordPatch`]es.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::TrackerError;
use crate::store::FlagUpdate;

use super::encounter::ParticipantId;

// ============================================================================
// Phase Taxonomy
// ============================================================================

/// Combat phase a participant is assigned to for the current round.
///
/// The declaration order is the display order and is significant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Ranged exchanges
    Ranged,
    /// Close combat; the only phase with engagement groups
    Melee,
    /// Spellcasting and other mystic actions
    Mystic,
    /// Not yet assigned this round
    #[default]
    #[serde(rename = "none")]
    Unassigned,
}

impl Phase {
    /// Every phase, in taxonomy order.
    pub const ALL: [Self; 4] = [Self::Ranged, Self::Melee, Self::Mystic, Self::Unassigned];

    /// Persisted name of the phase.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ranged => "ranged",
            Self::Melee => "melee",
            Self::Mystic => "mystic",
            Self::Unassigned => "none",
        }
    }

    /// Returns the closest phase name to `input`, if any is within
    /// Damerau-Levenshtein distance 2.
    #[must_use]
    pub fn suggest(input: &str) -> Option<&'static str> {
        let lowered = input.to_ascii_lowercase();
        Self::ALL
            .iter()
            .map(|p| (p.as_str(), strsim::damerau_levenshtein(&lowered, p.as_str())))
            .filter(|(_, dist)| *dist <= 2)
            .min_by_key(|(_, dist)| *dist)
            .map(|(name, _)| name)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| TrackerError::NotFound {
                kind: "phase",
                id: s.to_string(),
                suggestion: Self::suggest(s).map(str::to_string),
            })
    }
}

// ============================================================================
// Melee Role / Group Id
// ============================================================================

/// Attacker/defender designation inside an engagement group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeleeRole {
    /// Holds the initiative in the exchange
    Attacker,
    /// Receives the attack
    Defender,
}

impl MeleeRole {
    /// The opposite role.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Attacker => Self::Defender,
            Self::Defender => Self::Attacker,
        }
    }

    /// Persisted name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Attacker => "attacker",
            Self::Defender => "defender",
        }
    }
}

impl fmt::Display for MeleeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque engagement group identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(pub String);

impl GroupId {
    /// Generates a fresh, random group id.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    /// Creates a `GroupId` from an existing identifier.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Borrow the raw identifier.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Flag Keys
// ============================================================================

/// Keys of the flat per-participant flag bag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlagKey {
    /// `phase`
    Phase,
    /// `order`
    Order,
    /// `round`
    Round,
    /// `meleeRole`
    MeleeRole,
    /// `engagementGroupId`
    EngagementGroupId,
    /// `reactionRollResult`
    ReactionRollResult,
}

impl FlagKey {
    /// Every persisted key.
    pub const ALL: [Self; 6] = [
        Self::Phase,
        Self::Order,
        Self::Round,
        Self::MeleeRole,
        Self::EngagementGroupId,
        Self::ReactionRollResult,
    ];

    /// Key name as stored by the host.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Phase => "phase",
            Self::Order => "order",
            Self::Round => "round",
            Self::MeleeRole => "meleeRole",
            Self::EngagementGroupId => "engagementGroupId",
            Self::ReactionRollResult => "reactionRollResult",
        }
    }

    /// Resolves a stored key name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }
}

impl fmt::Display for FlagKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Assignment Record
// ============================================================================

/// One participant's assignment for the current encounter.
///
/// `melee_role` and `engagement_group_id` only carry meaning while
/// `phase` is [`Phase::Melee`]; they are cleared when the phase changes,
/// not continuously.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentRecord {
    /// Assigned phase
    pub phase: Phase,
    /// Relative sort key within the phase; not unique
    pub order: f64,
    /// Round at which the assignment was made
    pub round: u64,
    /// Attacker/defender designation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub melee_role: Option<MeleeRole>,
    /// Engagement group membership
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engagement_group_id: Option<GroupId>,
    /// Last recorded reaction check result
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reaction_roll_result: Option<f64>,
}

impl Default for AssignmentRecord {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl AssignmentRecord {
    /// Record returned for a participant that was never assigned.
    pub const DEFAULT: Self = Self {
        phase: Phase::Unassigned,
        order: 0.0,
        round: 0,
        melee_role: None,
        engagement_group_id: None,
        reaction_roll_result: None,
    };

    /// Builds a record from stored flags, falling back to the default
    /// value for every missing or malformed field.
    pub fn from_flags(participant: &ParticipantId, get: impl Fn(FlagKey) -> Option<Value>) -> Self {
        let mut record = Self::DEFAULT;

        if let Some(v) = present(get(FlagKey::Phase)) {
            match serde_json::from_value::<Phase>(v.clone()) {
                Ok(phase) => record.phase = phase,
                Err(_) => malformed(participant, FlagKey::Phase, &v),
            }
        }
        if let Some(v) = present(get(FlagKey::Order)) {
            match finite(&v) {
                Some(order) => record.order = order,
                None => malformed(participant, FlagKey::Order, &v),
            }
        }
        if let Some(v) = present(get(FlagKey::Round)) {
            match whole(&v) {
                Some(round) => record.round = round,
                None => malformed(participant, FlagKey::Round, &v),
            }
        }
        if let Some(v) = present(get(FlagKey::MeleeRole)) {
            match serde_json::from_value::<MeleeRole>(v.clone()) {
                Ok(role) => record.melee_role = Some(role),
                Err(_) => malformed(participant, FlagKey::MeleeRole, &v),
            }
        }
        if let Some(v) = present(get(FlagKey::EngagementGroupId)) {
            match v.as_str() {
                Some(id) if !id.is_empty() => record.engagement_group_id = Some(GroupId::new(id)),
                _ => malformed(participant, FlagKey::EngagementGroupId, &v),
            }
        }
        if let Some(v) = present(get(FlagKey::ReactionRollResult)) {
            match finite(&v) {
                Some(roll) => record.reaction_roll_result = Some(roll),
                None => malformed(participant, FlagKey::ReactionRollResult, &v),
            }
        }

        record
    }

    /// Whether the participant carries any engagement state.
    #[must_use]
    pub const fn has_engagement(&self) -> bool {
        self.melee_role.is_some() || self.engagement_group_id.is_some()
    }

    /// Reaction result used for ranking; missing counts as `0`.
    #[must_use]
    pub fn reaction_or_zero(&self) -> f64 {
        self.reaction_roll_result.unwrap_or(0.0)
    }

    /// Returns this record with `patch` applied.
    #[must_use]
    pub fn patched(&self, patch: &RecordPatch) -> Self {
        let mut next = self.clone();
        if let Some(phase) = patch.phase {
            next.phase = phase;
        }
        if let Some(order) = patch.order {
            next.order = order;
        }
        if let Some(round) = patch.round {
            next.round = round;
        }
        patch.melee_role.apply_to(&mut next.melee_role);
        patch.engagement_group_id.apply_to(&mut next.engagement_group_id);
        patch.reaction_roll_result.apply_to(&mut next.reaction_roll_result);
        next
    }
}

fn present(value: Option<Value>) -> Option<Value> {
    value.filter(|v| !v.is_null())
}

fn finite(value: &Value) -> Option<f64> {
    value.as_f64().filter(|f| f.is_finite())
}

/// Non-negative integer, also accepting integral floats such as `3.0`.
#[allow(clippy::float_cmp, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole(value: &Value) -> Option<u64> {
    value.as_u64().or_else(|| {
        value
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn malformed(participant: &ParticipantId, key: FlagKey, value: &Value) {
    warn!(%participant, key = key.as_str(), %value, "ignoring malformed flag value");
}

// ============================================================================
// Patches
// ============================================================================

/// Change to an optional field.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum FieldChange<T> {
    /// Leave the stored value alone
    #[default]
    Keep,
    /// Overwrite with a value
    Set(T),
    /// Remove the stored value
    Clear,
}

impl<T: Clone> FieldChange<T> {
    fn apply_to(&self, slot: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(v) => *slot = Some(v.clone()),
            Self::Clear => *slot = None,
        }
    }

    /// Whether this change touches the stored value.
    #[must_use]
    pub const fn is_keep(&self) -> bool {
        matches!(self, Self::Keep)
    }
}

/// Partial update of one participant's record.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordPatch {
    /// New phase
    pub phase: Option<Phase>,
    /// New order key
    pub order: Option<f64>,
    /// New round
    pub round: Option<u64>,
    /// Role change
    pub melee_role: FieldChange<MeleeRole>,
    /// Group membership change
    pub engagement_group_id: FieldChange<GroupId>,
    /// Reaction result change
    pub reaction_roll_result: FieldChange<f64>,
}

impl RecordPatch {
    /// Patch overwriting phase, order, and round.
    #[must_use]
    pub const fn assignment(phase: Phase, order: f64, round: u64) -> Self {
        Self {
            phase: Some(phase),
            order: Some(order),
            round: Some(round),
            melee_role: FieldChange::Keep,
            engagement_group_id: FieldChange::Keep,
            reaction_roll_result: FieldChange::Keep,
        }
    }

    /// Patch clearing role and group membership.
    #[must_use]
    pub fn clear_engagement() -> Self {
        Self {
            melee_role: FieldChange::Clear,
            engagement_group_id: FieldChange::Clear,
            ..Self::default()
        }
    }

    /// Patch placing the participant in `group` with `role`.
    #[must_use]
    pub fn engage(group: GroupId, role: MeleeRole) -> Self {
        Self {
            melee_role: FieldChange::Set(role),
            engagement_group_id: FieldChange::Set(group),
            ..Self::default()
        }
    }

    /// Patch changing only the role.
    #[must_use]
    pub fn role(role: MeleeRole) -> Self {
        Self {
            melee_role: FieldChange::Set(role),
            ..Self::default()
        }
    }

    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.phase.is_none()
            && self.order.is_none()
            && self.round.is_none()
            && self.melee_role.is_keep()
            && self.engagement_group_id.is_keep()
            && self.reaction_roll_result.is_keep()
    }

    /// Flattens the patch into store writes. Cleared fields become `null`.
    #[must_use]
    pub fn to_updates(&self, participant: &ParticipantId) -> Vec<FlagUpdate> {
        let mut updates = Vec::new();
        let mut push = |key: FlagKey, value: Value| {
            updates.push(FlagUpdate {
                participant: participant.clone(),
                key,
                value,
            });
        };

        if let Some(phase) = self.phase {
            push(FlagKey::Phase, Value::from(phase.as_str()));
        }
        if let Some(order) = self.order {
            push(FlagKey::Order, Value::from(order));
        }
        if let Some(round) = self.round {
            push(FlagKey::Round, Value::from(round));
        }
        match &self.melee_role {
            FieldChange::Keep => {}
            FieldChange::Set(role) => push(FlagKey::MeleeRole, Value::from(role.as_str())),
            FieldChange::Clear => push(FlagKey::MeleeRole, Value::Null),
        }
        match &self.engagement_group_id {
            FieldChange::Keep => {}
            FieldChange::Set(id) => push(FlagKey::EngagementGroupId, Value::from(id.as_str())),
            FieldChange::Clear => push(FlagKey::EngagementGroupId, Value::Null),
        }
        match &self.reaction_roll_result {
            FieldChange::Keep => {}
            FieldChange::Set(roll) => push(FlagKey::ReactionRollResult, Value::from(*roll)),
            FieldChange::Clear => push(FlagKey::ReactionRollResult, Value::Null),
        }

        updates
    }
}
