//! Text and JSON rendering of the derived grouping

use std::fmt::Write as _;

use serde::Serialize;

use crate::error::PhaseKeeperError;
use crate::model::{Encounter, Phase};
use crate::tracker::{EngagedGroup, PhaseGroups};

use super::args::OutputFormat;

#[derive(Serialize)]
struct GroupingView<'a> {
    encounter: &'a str,
    round: u64,
    phases: &'a PhaseGroups,
    engagements: &'a [EngagedGroup],
}

/// Renders the grouping in the requested format.
///
/// # Errors
///
/// Returns `PhaseKeeperError::Json` if JSON serialization fails.
pub fn render(
    format: OutputFormat,
    encounter: &Encounter,
    groups: &PhaseGroups,
    engagements: &[EngagedGroup],
) -> Result<String, PhaseKeeperError> {
    match format {
        OutputFormat::Human => Ok(render_human(encounter, groups, engagements)),
        OutputFormat::Json => {
            let view = GroupingView {
                encounter: &encounter.id,
                round: encounter.round,
                phases: groups,
                engagements,
            };
            let mut out = serde_json::to_string_pretty(&view)?;
            out.push('\n');
            Ok(out)
        }
    }
}

fn render_human(encounter: &Encounter, groups: &PhaseGroups, engagements: &[EngagedGroup]) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{} (round {})", encounter.id, encounter.round);

    for (phase, members) in groups.iter() {
        let _ = writeln!(out, "\n{phase} ({})", members.len());
        for entry in members {
            let _ = write!(out, "  {:<20} order {:>10}", entry.participant.name, entry.record.order);
            if phase == Phase::Melee {
                if let Some(role) = entry.record.melee_role {
                    let _ = write!(out, "  {role}");
                }
            }
            out.push('\n');
        }
    }

    if !engagements.is_empty() {
        let _ = writeln!(out, "\nengagements");
        for group in engagements {
            let members: Vec<String> = group
                .members
                .iter()
                .map(|(id, role)| match role {
                    Some(role) => format!("{id} ({role})"),
                    None => id.to_string(),
                })
                .collect();
            let _ = writeln!(out, "  {}: {}", group.id, members.join(", "));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AssignmentRecord, GroupId, MeleeRole, Participant, ParticipantId};
    use crate::tracker::{Entry, engaged_groups};

    fn roster() -> (Encounter, Vec<Entry>) {
        let encounter = Encounter::new(
            "bridge",
            2,
            vec![Participant::named("kara"), Participant::named("orc")],
        );
        let entries = encounter
            .participants
            .iter()
            .enumerate()
            .map(|(i, p)| Entry {
                participant: p.clone(),
                record: AssignmentRecord {
                    phase: Phase::Melee,
                    order: if i == 0 { 1000.0 } else { 2000.0 },
                    engagement_group_id: Some(GroupId::new("g1")),
                    melee_role: Some(if i == 0 {
                        MeleeRole::Attacker
                    } else {
                        MeleeRole::Defender
                    }),
                    ..AssignmentRecord::DEFAULT
                },
            })
            .collect();
        (encounter, entries)
    }

    #[test]
    fn test_human_lists_phases_and_engagements() {
        let (encounter, entries) = roster();
        let groups = PhaseGroups::from_roster(&entries);
        let text = render(OutputFormat::Human, &encounter, &groups, &engaged_groups(&entries)).unwrap();

        assert!(text.starts_with("bridge (round 2)"));
        assert!(text.contains("melee (2)"));
        assert!(text.contains("none (0)"));
        assert!(text.contains("g1: kara (attacker), orc (defender)"));
    }

    #[test]
    fn test_json_shape() {
        let (encounter, entries) = roster();
        let groups = PhaseGroups::from_roster(&entries);
        let text = render(OutputFormat::Json, &encounter, &groups, &engaged_groups(&entries)).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();

        assert_eq!(value["round"], 2);
        for phase in Phase::ALL {
            assert!(value["phases"][phase.as_str()].is_array(), "missing {phase}");
        }
        assert_eq!(value["phases"]["melee"][0]["participant"]["id"], "kara");
        assert_eq!(value["engagements"][0]["id"], "g1");
        assert_eq!(
            value["engagements"][0]["members"][1],
            serde_json::json!([ParticipantId::new("orc"), "defender"])
        );
    }
}
