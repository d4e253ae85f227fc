mod common;

use std::collections::HashSet;

use common::{pid, tracker};
use phasekeeper::model::Phase;
use phasekeeper::ordering::{OrderingParams, order_for_insert};
use proptest::prelude::*;

fn phase_strategy() -> impl Strategy<Value = Phase> {
    prop::sample::select(Phase::ALL.to_vec())
}

/// Strictly increasing, positive order keys with room between neighbours.
fn sequence_strategy() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(1u32..10_000, 0..12).prop_map(|steps| {
        let mut acc = 0.0;
        steps
            .into_iter()
            .map(|step| {
                acc += f64::from(step);
                acc
            })
            .collect()
    })
}

proptest! {
    #[test]
    fn insert_lands_strictly_between_neighbours(
        sequence in sequence_strategy(),
        raw_index in 0usize..16,
    ) {
        let params = OrderingParams::default();
        let order = order_for_insert(&sequence, raw_index, params);

        if sequence.is_empty() {
            prop_assert!((order - params.seed).abs() < f64::EPSILON);
        } else {
            let index = raw_index.min(sequence.len());
            if index > 0 {
                prop_assert!(order > sequence[index - 1]);
            } else {
                prop_assert!(order > 0.0);
            }
            if let Some(next) = sequence.get(index) {
                prop_assert!(order < *next);
            }

            // inserting and re-sorting puts the new key at `index`
            let mut merged = sequence.clone();
            merged.push(order);
            merged.sort_by(f64::total_cmp);
            prop_assert_eq!(merged.iter().position(|o| *o == order), Some(index));
        }
    }

    #[test]
    fn grouping_partitions_every_participant(
        placements in prop::collection::vec((phase_strategy(), 0u32..5), 0..10),
    ) {
        let ids: Vec<String> = (0..placements.len()).map(|i| format!("p{i}")).collect();
        let id_refs: Vec<&str> = ids.iter().map(String::as_str).collect();
        let t = tracker(&id_refs);

        tokio_test::block_on(async {
            for (id, (phase, order)) in ids.iter().zip(&placements) {
                t.write_assignment(&pid(id), *phase, f64::from(*order), 1)
                    .await
                    .unwrap();
            }
        });

        let groups = t.group_by_phase();
        prop_assert_eq!(groups.total(), ids.len());

        let mut seen = HashSet::new();
        for (phase, members) in groups.iter() {
            for entry in members {
                prop_assert!(seen.insert(entry.id().clone()), "duplicate {}", entry.id());
                prop_assert_eq!(entry.record.phase, phase);
            }
            let orders = groups.orders(phase);
            prop_assert!(orders.windows(2).all(|w| w[0] <= w[1]));

            // equal orders keep encounter order
            for pair in members.windows(2) {
                if pair[0].record.order == pair[1].record.order {
                    let pos = |e: &phasekeeper::tracker::Entry| t.encounter().position(e.id());
                    prop_assert!(pos(&pair[0]) < pos(&pair[1]));
                }
            }
        }
    }
}
