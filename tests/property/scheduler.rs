use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use proptest::prelude::*;
use rollout::dag::{RunContext, RunOptions, UnitName, UnitSpec, run_in_dependency_order};
use rollout::types::Direction;
use rollout_test_utils::builders::UnitSetBuilder;
use rollout_test_utils::recorder::CallbackRecorder;

/// A random DAG plus a per-unit callback delay in milliseconds.
///
/// Acyclic by construction: unit N may only depend on units 0..N-1.
fn dag_strategy(max_units: usize) -> impl Strategy<Value = (BTreeMap<UnitName, UnitSpec>, Vec<u64>)> {
    (1..=max_units).prop_flat_map(|num_units| {
        let deps = proptest::collection::vec(
            proptest::collection::vec(any::<usize>(), 0..4),
            num_units,
        );
        let delays = proptest::collection::vec(0u64..4, num_units);

        (deps, delays).prop_map(move |(raw_deps, delays)| {
            let mut builder = UnitSetBuilder::new();
            for (i, potential) in raw_deps.into_iter().enumerate() {
                let valid: BTreeSet<String> = if i == 0 {
                    BTreeSet::new()
                } else {
                    potential.into_iter().map(|d| unit_name(d % i)).collect()
                };
                let valid: Vec<&str> = valid.iter().map(String::as_str).collect();
                builder = builder.unit(&unit_name(i), &valid);
            }
            (builder.build(), delays)
        })
    })
}

fn unit_name(i: usize) -> String {
    format!("unit_{i:02}")
}

fn direction_strategy() -> impl Strategy<Value = Direction> {
    prop_oneof![Just(Direction::Deploy), Just(Direction::Destroy)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_unit_runs_once_and_after_its_predecessors(
        (units, delays) in dag_strategy(12),
        direction in direction_strategy(),
        limit in proptest::option::of(1usize..4),
    ) {
        let mut recorder = CallbackRecorder::new();
        for (i, delay) in delays.iter().enumerate() {
            recorder = recorder.with_delay(&unit_name(i), Duration::from_millis(*delay));
        }

        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .unwrap();

        let options = RunOptions { max_concurrency: limit, fail_stop: false };
        let result = runtime.block_on(run_in_dependency_order(
            &RunContext::new(),
            &units,
            direction,
            options,
            recorder.callback(),
        ));
        prop_assert!(result.is_ok(), "run failed: {:?}", result);

        prop_assert_eq!(recorder.total_invocations(), units.len());
        for name in units.keys() {
            prop_assert_eq!(recorder.invocations(name), 1, "unit {} ran more than once", name);
        }

        for (name, spec) in units.iter() {
            for dep in spec.depends_on.iter() {
                let (first, second) = match direction {
                    Direction::Deploy => (dep.as_str(), name.as_str()),
                    Direction::Destroy => (name.as_str(), dep.as_str()),
                };
                prop_assert!(
                    recorder.finished_before(first, second),
                    "{} must finish before {} starts ({:?})", first, second, direction
                );
            }
        }

        if let Some(limit) = limit {
            prop_assert!(recorder.peak_concurrency() <= limit);
        }
    }
}
