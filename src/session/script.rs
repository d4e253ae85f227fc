//! Action scripts
//!
//! A script is an ordered list of user actions replayed against a
//! tracker, the way the view layer would issue them one click at a time.
//!
//! ```yaml
//! actions:
//!   - action: assign
//!     participant: kara
//!     phase: melee
//!   - action: engage
//!     initiator: kara
//!     target: orc
//!   - action: toggle_role
//!     participant: orc
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, PhaseKeeperError, TrackerError};
use crate::model::{GroupId, ParticipantId, Phase};
use crate::store::FlagStore;
use crate::tracker::PhaseTracker;

use super::file::FileFormat;

/// Ordered list of actions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Script {
    /// Actions in execution order
    #[serde(default)]
    pub actions: Vec<Action>,
}

/// One user action.
///
/// Phases are kept as strings so an unknown name surfaces as a tracker
/// `NotFound` (with a suggestion) rather than a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Move or reorder a participant.
    Assign {
        /// Participant to move
        participant: ParticipantId,
        /// Target phase name
        phase: String,
        /// Visual position; appends when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<usize>,
        /// Round stamp; the encounter's current round when absent
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u64>,
    },
    /// `initiator` engages `target`.
    Engage {
        /// Engaging participant
        initiator: ParticipantId,
        /// Engaged participant
        target: ParticipantId,
    },
    /// Form a fresh group.
    FormGroup {
        /// Members, at least two
        members: Vec<ParticipantId>,
    },
    /// Join an existing group, named directly or through one of its members.
    JoinGroup {
        /// Joining participant
        participant: ParticipantId,
        /// Group id
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group: Option<GroupId>,
        /// Any current member of the group
        #[serde(default, skip_serializing_if = "Option::is_none")]
        group_of: Option<ParticipantId>,
    },
    /// Flip a participant's role.
    ToggleRole {
        /// Invoking participant
        participant: ParticipantId,
    },
    /// Leave the current group.
    Disengage {
        /// Leaving participant
        participant: ParticipantId,
    },
    /// Move everyone back to `none`.
    ResetAll,
    /// Store or clear a reaction result.
    RecordReaction {
        /// Participant
        participant: ParticipantId,
        /// Result; clears when absent
        #[serde(default)]
        result: Option<f64>,
    },
    /// Re-sort a phase by reaction result.
    SortByRoll {
        /// Phase name
        phase: String,
    },
    /// Move to a new round; the next one when absent.
    AdvanceRound {
        /// Target round
        #[serde(default, skip_serializing_if = "Option::is_none")]
        round: Option<u64>,
    },
}

impl Action {
    /// Action kind as written in scripts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Engage { .. } => "engage",
            Self::FormGroup { .. } => "form_group",
            Self::JoinGroup { .. } => "join_group",
            Self::ToggleRole { .. } => "toggle_role",
            Self::Disengage { .. } => "disengage",
            Self::ResetAll => "reset_all",
            Self::RecordReaction { .. } => "record_reaction",
            Self::SortByRoll { .. } => "sort_by_roll",
            Self::AdvanceRound { .. } => "advance_round",
        }
    }
}

impl Script {
    /// Reads a script file (YAML or JSON by extension).
    ///
    /// # Errors
    ///
    /// `Io` if the file cannot be read, `Config` if it does not parse.
    pub fn load(path: &Path) -> Result<Self, PhaseKeeperError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(Self::parse(&raw, FileFormat::from_path(path), path)?)
    }

    /// Parses script text.
    ///
    /// # Errors
    ///
    /// `ConfigError::ParseError` for malformed input.
    pub fn parse(raw: &str, format: FileFormat, origin: &Path) -> Result<Self, ConfigError> {
        let parsed = match format {
            FileFormat::Yaml => serde_yaml::from_str::<Self>(raw).map_err(|e| e.to_string()),
            FileFormat::Json => serde_json::from_str::<Self>(raw).map_err(|e| e.to_string()),
        };
        parsed.map_err(|message| ConfigError::ParseError {
            path: origin.to_path_buf(),
            message,
        })
    }
}

/// Summary of a completed script run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptReport {
    /// Number of actions executed
    pub applied: usize,
}

/// Executes `script` in order, stopping at the first failing action.
///
/// Actions before the failing one stay applied.
///
/// # Errors
///
/// `PhaseKeeperError::Script` carrying the zero-based index of the failing
/// action and its tracker error.
pub async fn run_script<S: FlagStore>(
    tracker: &mut PhaseTracker<S>,
    script: &Script,
) -> Result<ScriptReport, PhaseKeeperError> {
    for (index, action) in script.actions.iter().enumerate() {
        debug!(index, action = action.name(), "running action");
        run_action(tracker, action)
            .await
            .map_err(|source| PhaseKeeperError::Script {
                index,
                action: action.name().to_string(),
                source,
            })?;
    }

    info!(applied = script.actions.len(), "script completed");
    Ok(ScriptReport {
        applied: script.actions.len(),
    })
}

async fn run_action<S: FlagStore>(
    tracker: &mut PhaseTracker<S>,
    action: &Action,
) -> Result<(), TrackerError> {
    match action {
        Action::Assign {
            participant,
            phase,
            index,
            round,
        } => {
            let phase: Phase = phase.parse()?;
            let round = round.unwrap_or(tracker.encounter().round);
            tracker.assign_phase(participant, phase, *index, round).await?;
        }
        Action::Engage { initiator, target } => {
            tracker.engage(initiator, target).await?;
        }
        Action::FormGroup { members } => {
            tracker.form_group(members).await?;
        }
        Action::JoinGroup {
            participant,
            group,
            group_of,
        } => {
            let group = resolve_group(tracker, group.as_ref(), group_of.as_ref())?;
            tracker.join_group(participant, &group).await?;
        }
        Action::ToggleRole { participant } => {
            tracker.toggle_role(participant).await?;
        }
        Action::Disengage { participant } => {
            tracker.disengage(participant).await?;
        }
        Action::ResetAll => tracker.reset_all().await?,
        Action::RecordReaction {
            participant,
            result,
        } => tracker.record_reaction(participant, *result).await?,
        Action::SortByRoll { phase } => {
            tracker.sort_phase_by_roll(phase.parse()?).await?;
        }
        Action::AdvanceRound { round } => {
            let next = round.unwrap_or_else(|| tracker.encounter().round.saturating_add(1));
            tracker.advance_round(next).await?;
        }
    }
    Ok(())
}

fn resolve_group<S: FlagStore>(
    tracker: &PhaseTracker<S>,
    group: Option<&GroupId>,
    group_of: Option<&ParticipantId>,
) -> Result<GroupId, TrackerError> {
    match (group, group_of) {
        (Some(group), None) => Ok(group.clone()),
        (None, Some(member)) => {
            tracker.encounter().require(member)?;
            tracker
                .read_assignment(member)
                .engagement_group_id
                .ok_or_else(|| {
                    TrackerError::InvalidState(format!("'{member}' is not in an engagement group"))
                })
        }
        _ => Err(TrackerError::InvalidState(
            "join_group needs exactly one of 'group' or 'group_of'".to_string(),
        )),
    }
}
