//! End-to-end simulation runs

use std::{sync::Arc, thread};

use asert_chainspec::SimParams;
use asert_consensus::compact_to_work;
use asert_sim::{RunConfig, SharedSimulation, SimulationContext, block_times, registry};
use proptest::prelude::*;

fn context(num_blocks: u64) -> SimulationContext {
    SimulationContext::new(SimParams::default().with_num_blocks(num_blocks)).unwrap()
}

#[test]
fn test_same_seed_same_bits() {
    let config = RunConfig::from_ids("aserti3-416", "stable", 1234).unwrap();

    let first: Vec<u32> = context(100).run(&config).unwrap().iter().map(|s| s.bits).collect();
    let second: Vec<u32> = context(100).run(&config).unwrap().iter().map(|s| s.bits).collect();
    assert_eq!(first.len(), 100);
    assert_eq!(first, second);
}

#[test]
fn test_reused_context_is_deterministic() {
    let mut ctx = context(60);
    let config = RunConfig::from_ids("aserti3-mo3-208", "default", 99).unwrap();

    let first = ctx.run(&config).unwrap();
    let _ = ctx.run(&config.with_seed(100)).unwrap();
    let again = ctx.run(&config).unwrap();
    assert_eq!(first, again);
}

#[test]
fn test_different_seeds_diverge() {
    let config = RunConfig::from_ids("aserti3-416", "default", 1).unwrap();
    let a = context(50).run_block_times(&config).unwrap();
    let b = context(50).run_block_times(&config.with_seed(2)).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_block_times_match_states() {
    let config = RunConfig::from_ids("aserti2-288", "fxramp", 5).unwrap();
    let states = context(40).run(&config).unwrap();
    let times = context(40).run_block_times(&config).unwrap();
    assert_eq!(times, block_times(&states));
    assert_eq!(times.len(), 39);
}

#[test]
fn test_every_pure_algorithm_runs() {
    let scenario = registry::scenario("default").unwrap();
    for descriptor in registry::ALGORITHMS.values().filter(|d| !d.algorithm.is_reference()) {
        let config = RunConfig { algorithm: descriptor, scenario, seed: 7 };
        let states = context(30).run(&config).unwrap();
        assert_eq!(states.len(), 30, "{}", descriptor.id);
    }
}

#[test]
fn test_every_scenario_runs() {
    let algorithm = registry::algorithm("aserti3-416").unwrap();
    for scenario in registry::SCENARIOS.values() {
        let config = RunConfig { algorithm, scenario, seed: 11 };
        let states = context(200).run(&config).unwrap();
        assert!(states.windows(2).all(|w| w[1].wall_time >= w[0].wall_time), "{}", scenario.id);
    }
}

#[test]
fn test_shared_history_serializes_runs() {
    let sim = Arc::new(SharedSimulation::new(context(50)));
    let config = RunConfig::from_ids("aserti3-416", "stable", 21).unwrap();
    let expected = context(50).run(&config).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let sim = Arc::clone(&sim);
            thread::spawn(move || sim.run(&config).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn prop_chainwork_strictly_increases(seed in any::<u64>(), scenario in prop::sample::select(vec!["default", "dr100", "ft50", "price10x"])) {
        let config = RunConfig::from_ids("aserti3-416", scenario, seed).unwrap();
        let mut ctx = context(120);
        let states = ctx.run(&config).unwrap();

        let prefix_tip = &ctx.history()[ctx.params().prefix_blocks - 1];
        prop_assert!(states[0].chainwork > prefix_tip.chainwork);
        for pair in states.windows(2) {
            prop_assert!(pair[1].chainwork > pair[0].chainwork);
            prop_assert_eq!(pair[1].chainwork - pair[0].chainwork, compact_to_work(pair[1].bits).unwrap());
            prop_assert_eq!(pair[1].height, pair[0].height + 1);
        }
    }
}
