mod common;

use common::{EventSink, pid, tracker};
use phasekeeper::TrackerError;
use phasekeeper::model::{AssignmentRecord, FlagKey, GroupId, MeleeRole, Phase};
use phasekeeper::store::FlagStore;
use serde_json::json;

// ============================================================================
// Phase State Model
// ============================================================================

#[test]
fn never_assigned_reads_as_default() {
    let t = tracker(&["a"]);
    let record = t.read_assignment(&pid("a"));
    assert_eq!(record, AssignmentRecord::DEFAULT);
    assert_eq!(record.phase, Phase::Unassigned);
    assert!(record.melee_role.is_none());
    assert!(record.engagement_group_id.is_none());
    assert!(record.reaction_roll_result.is_none());
}

#[tokio::test]
async fn malformed_flags_fall_back_to_defaults() {
    let t = tracker(&["a"]);
    let a = pid("a");
    let store = t.store();
    store.set(&a, FlagKey::Phase, json!("flying")).await.unwrap();
    store.set(&a, FlagKey::Order, json!("soon")).await.unwrap();
    store.set(&a, FlagKey::Round, json!(4)).await.unwrap();
    store.set(&a, FlagKey::MeleeRole, json!(7)).await.unwrap();

    let record = t.read_assignment(&a);
    assert_eq!(record.phase, Phase::Unassigned);
    assert!(record.order.abs() < f64::EPSILON);
    assert_eq!(record.round, 4);
    assert_eq!(record.melee_role, None);
    assert_eq!(t.group_by_phase().ids(Phase::Unassigned), [&a]);
}

#[tokio::test]
async fn integral_float_round_is_kept() {
    let t = tracker(&["a", "b"]);
    let (a, b) = (pid("a"), pid("b"));
    let store = t.store();
    store.set(&a, FlagKey::Round, json!(3.0)).await.unwrap();
    store.set(&b, FlagKey::Round, json!(2.5)).await.unwrap();

    assert_eq!(t.read_assignment(&a).round, 3);
    assert_eq!(t.read_assignment(&b).round, 0);

    store.set(&b, FlagKey::Round, json!(-1.0)).await.unwrap();
    assert_eq!(t.read_assignment(&b).round, 0);
}

#[tokio::test]
async fn grouping_is_stable_on_equal_orders() {
    let t = tracker(&["A", "B", "C"]);
    for (id, order) in [("A", 100.0), ("B", 50.0), ("C", 100.0)] {
        t.write_assignment(&pid(id), Phase::Melee, order, 1).await.unwrap();
    }

    let groups = t.group_by_phase();
    let melee: Vec<&str> = groups.ids(Phase::Melee).into_iter().map(|p| p.as_str()).collect();
    assert_eq!(melee, ["B", "A", "C"]);
}

#[tokio::test]
async fn grouping_covers_every_phase_in_order() {
    let t = tracker(&["a", "b", "c"]);
    t.assign_phase(&pid("a"), Phase::Mystic, None, 1).await.unwrap();
    t.assign_phase(&pid("b"), Phase::Ranged, None, 1).await.unwrap();

    let groups = t.group_by_phase();
    let phases: Vec<Phase> = groups.iter().map(|(phase, _)| phase).collect();
    assert_eq!(phases, [Phase::Ranged, Phase::Melee, Phase::Mystic, Phase::Unassigned]);
    assert_eq!(groups.total(), 3);
    assert!(groups.get(Phase::Melee).is_empty());
    assert_eq!(groups.ids(Phase::Unassigned), [&pid("c")]);
}

#[tokio::test]
async fn reset_all_stamps_round_and_keeps_engagement() {
    let t = tracker(&["x", "y", "z"]);
    for id in ["x", "y"] {
        t.assign_phase(&pid(id), Phase::Melee, None, 1).await.unwrap();
    }
    t.engage(&pid("x"), &pid("y")).await.unwrap();
    let group = t.read_assignment(&pid("x")).engagement_group_id;

    t.reset_all().await.unwrap();

    for id in ["x", "y", "z"] {
        let record = t.read_assignment(&pid(id));
        assert_eq!(record.phase, Phase::Unassigned);
        assert!(record.order.abs() < f64::EPSILON);
        assert_eq!(record.round, t.encounter().round);
    }
    assert_eq!(t.read_assignment(&pid("x")).engagement_group_id, group);
    assert_eq!(t.read_assignment(&pid("x")).melee_role, Some(MeleeRole::Attacker));
    // no longer in melee, so no live groups
    assert!(t.engaged_groups().is_empty());
}

// ============================================================================
// Ordering through assign_phase
// ============================================================================

#[tokio::test]
async fn midpoint_insertion_examples() {
    let t = tracker(&["a", "b", "c"]);

    let first = t.assign_phase(&pid("a"), Phase::Ranged, Some(0), 1).await.unwrap();
    assert!((first.record.order - 1000.0).abs() < f64::EPSILON);

    let head = t.assign_phase(&pid("b"), Phase::Ranged, Some(0), 1).await.unwrap();
    assert!((head.record.order - 500.0).abs() < f64::EPSILON);

    // between b (500) and a (1000)
    let middle = t.assign_phase(&pid("c"), Phase::Ranged, Some(1), 1).await.unwrap();
    assert!((middle.record.order - 750.0).abs() < f64::EPSILON);

    assert_eq!(
        t.group_by_phase().ids(Phase::Ranged),
        [&pid("b"), &pid("c"), &pid("a")]
    );
}

#[tokio::test]
async fn reorder_to_front_within_phase() {
    let t = tracker(&["a", "b", "c"]);
    for id in ["a", "b", "c"] {
        t.assign_phase(&pid(id), Phase::Mystic, None, 1).await.unwrap();
    }

    t.assign_phase(&pid("c"), Phase::Mystic, Some(0), 1).await.unwrap();

    assert_eq!(
        t.group_by_phase().ids(Phase::Mystic),
        [&pid("c"), &pid("a"), &pid("b")]
    );
}

// ============================================================================
// Phase-change side effects
// ============================================================================

#[tokio::test]
async fn leaving_melee_clears_engagement() {
    let sink = EventSink::default();
    let t = tracker(&["x", "y"]).with_events(sink.emitter());
    for id in ["x", "y"] {
        t.assign_phase(&pid(id), Phase::Melee, None, 1).await.unwrap();
    }
    t.engage(&pid("x"), &pid("y")).await.unwrap();

    let moved = t.assign_phase(&pid("x"), Phase::Ranged, None, 2).await.unwrap();

    assert!(moved.engagement_cleared);
    assert_eq!(moved.previous.phase, Phase::Melee);
    assert_eq!(moved.record.phase, Phase::Ranged);
    assert_eq!(moved.record.round, 2);
    assert_eq!(moved.record.melee_role, None);
    assert_eq!(moved.record.engagement_group_id, None);
    assert_eq!(
        sink.kinds(),
        ["PhaseAssigned", "PhaseAssigned", "GroupFormed", "PhaseAssigned", "EngagementCleared"]
    );
}

#[tokio::test]
async fn reorder_within_melee_keeps_engagement() {
    let t = tracker(&["x", "y"]);
    t.write_assignment(&pid("x"), Phase::Melee, 100.0, 1).await.unwrap();
    t.write_assignment(&pid("y"), Phase::Melee, 200.0, 1).await.unwrap();
    t.engage(&pid("x"), &pid("y")).await.unwrap();
    let before = t.read_assignment(&pid("x"));

    let moved = t.assign_phase(&pid("x"), Phase::Melee, None, 1).await.unwrap();

    assert!(!moved.engagement_cleared);
    assert!((moved.record.order - 1200.0).abs() < f64::EPSILON);
    assert_eq!(moved.record.melee_role, before.melee_role);
    assert_eq!(moved.record.engagement_group_id, before.engagement_group_id);
}

#[tokio::test]
async fn clearing_also_removes_stale_values() {
    let t = tracker(&["x"]);
    let x = pid("x");
    t.write_assignment(&x, Phase::Mystic, 1000.0, 1).await.unwrap();
    // stale role from an earlier engagement that was never cleaned up
    t.store().set(&x, FlagKey::MeleeRole, json!("defender")).await.unwrap();

    t.assign_phase(&x, Phase::Ranged, None, 1).await.unwrap();
    assert!(t.store().get(&x, FlagKey::MeleeRole).is_none());
}

#[test]
fn unknown_phase_name_suggests_closest() {
    let err = "mele".parse::<Phase>().unwrap_err();
    match &err {
        TrackerError::NotFound { kind, suggestion, .. } => {
            assert_eq!(*kind, "phase");
            assert_eq!(suggestion.as_deref(), Some("melee"));
        }
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert!(err.to_string().contains("did you mean 'melee'"));
}

#[tokio::test]
async fn partner_only_in_one_on_one() {
    let t = tracker(&["x", "y", "z"]);
    for id in ["x", "y", "z"] {
        t.assign_phase(&pid(id), Phase::Melee, None, 1).await.unwrap();
    }
    assert_eq!(t.partner_of(&pid("x")).unwrap(), None);

    t.engage(&pid("x"), &pid("y")).await.unwrap();
    assert_eq!(t.partner_of(&pid("x")).unwrap().map(|p| p.id), Some(pid("y")));

    t.engage(&pid("z"), &pid("y")).await.unwrap();
    assert_eq!(t.partner_of(&pid("x")).unwrap(), None);
    assert!(t.partner_of(&pid("ghost")).is_err());

    let groups = t.engaged_groups();
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].with_role(MeleeRole::Attacker), [&pid("z")]);
    assert_ne!(groups[0].id, GroupId::new(""));
}
