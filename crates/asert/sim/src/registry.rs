//! Algorithm and scenario registries
//!
//! Both tables are built once on first use and shared read-only by every run.

use std::collections::BTreeMap;

use asert_consensus::{Approximation, AsertParams};
use asert_miner::HashratePressure;
use once_cell::sync::Lazy;

use crate::{
    SimError, SimResult,
    scenario::{FxJumpSchedule, FxUpdate},
};

/// How next bits are computed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    /// Pure fixed-point engine
    Asert(AsertParams),
    /// Same parameters, evaluated by the attached consensus oracle
    Reference(AsertParams),
}

impl Algorithm {
    /// Engine parameters
    pub const fn params(&self) -> &AsertParams {
        match self {
            Self::Asert(params) | Self::Reference(params) => params,
        }
    }

    /// Whether the algorithm needs a consensus oracle
    pub const fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

/// Registered algorithm
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlgorithmDescriptor {
    /// Registry key
    pub id: &'static str,
    /// Retarget strategy and its parameters
    pub algorithm: Algorithm,
}

/// Registered scenario
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScenarioDescriptor {
    /// Registry key
    pub id: &'static str,
    /// Exchange-rate strategy
    pub fx_update: FxUpdate,
    /// Scripted exchange-rate shocks
    pub fx_jumps: FxJumpSchedule,
    /// Ramp hashrate and pump threshold
    pub pressure: HashratePressure,
}

/// Every registered algorithm, keyed by id
pub static ALGORITHMS: Lazy<BTreeMap<&'static str, AlgorithmDescriptor>> = Lazy::new(|| {
    use Approximation::{Cubic, Linear, Quadratic};

    let mut table = BTreeMap::new();
    let mut add = |id: &'static str, half_life: u64, approximation, median_of_three, reference: bool| {
        let params = AsertParams {
            tau: AsertParams::tau_for_half_life(half_life),
            approximation,
            median_of_three,
        };
        let algorithm = if reference { Algorithm::Reference(params) } else { Algorithm::Asert(params) };
        table.insert(id, AlgorithmDescriptor { id, algorithm });
    };

    add("aserti1-144", 144, Linear, false, false);
    add("aserti1-288", 288, Linear, false, false);
    add("aserti1-576", 576, Linear, false, false);

    add("aserti2-144", 144, Quadratic, false, false);
    add("aserti2-288", 288, Quadratic, false, false);
    add("aserti2-576", 576, Quadratic, false, false);

    add("aserti3-072", 72, Cubic, false, false);
    add("aserti3-144", 144, Cubic, false, false);
    add("aserti3-200", 200, Cubic, false, false);
    add("aserti3-208", 208, Cubic, false, false);
    add("aserti3-288", 288, Cubic, false, false);
    add("aserti3-416", 416, Cubic, false, false);
    add("aserti3-576", 576, Cubic, false, false);

    add("aserti3-mo3-072", 72, Cubic, true, false);
    add("aserti3-mo3-144", 144, Cubic, true, false);
    add("aserti3-mo3-200", 200, Cubic, true, false);
    add("aserti3-mo3-208", 208, Cubic, true, false);
    add("aserti3-mo3-288", 288, Cubic, true, false);
    add("aserti3-mo3-416", 416, Cubic, true, false);
    add("aserti3-mo3-576", 576, Cubic, true, false);

    add("aserti3-416-cpp", 416, Cubic, false, true);
    add("aserti3-mo3-416-cpp", 416, Cubic, true, true);

    table
});

/// Every registered scenario, keyed by id
pub static SCENARIOS: Lazy<BTreeMap<&'static str, ScenarioDescriptor>> = Lazy::new(|| {
    let mut table = BTreeMap::new();
    let mut add = |id: &'static str, fx_update, fx_jumps, ramp_hashrate: f64, pump_threshold: i64| {
        let pressure = HashratePressure { ramp_hashrate, pump_threshold };
        table.insert(id, ScenarioDescriptor { id, fx_update, fx_jumps, pressure });
    };

    add("default", FxUpdate::RandomWalk, FxJumpSchedule::Mild, 0.0, 0);
    add("stable", FxUpdate::Constant, FxJumpSchedule::None, 0.0, 0);
    add("fxramp", FxUpdate::Ramp, FxJumpSchedule::Mild, 0.0, 0);
    // Difficulty rampers adding hashrate
    add("dr50", FxUpdate::RandomWalk, FxJumpSchedule::Mild, 50.0, 0);
    add("dr75", FxUpdate::RandomWalk, FxJumpSchedule::Mild, 75.0, 0);
    add("dr100", FxUpdate::RandomWalk, FxJumpSchedule::Mild, 100.0, 0);
    add("pump-osc", FxUpdate::Ramp, FxJumpSchedule::Mild, 0.0, 8000);
    // Withdrawing miners stamping blocks in the future
    add("ft50", FxUpdate::RandomWalk, FxJumpSchedule::Mild, -50.0, 0);
    add("ft100", FxUpdate::RandomWalk, FxJumpSchedule::Mild, -100.0, 0);
    add("price10x", FxUpdate::RandomWalk, FxJumpSchedule::Extreme, 0.0, 0);

    table
});

/// Look up an algorithm by key
pub fn algorithm(id: &str) -> SimResult<&'static AlgorithmDescriptor> {
    ALGORITHMS.get(id).ok_or_else(|| SimError::UnknownAlgorithm(id.to_string()))
}

/// Look up a scenario by key
pub fn scenario(id: &str) -> SimResult<&'static ScenarioDescriptor> {
    SCENARIOS.get(id).ok_or_else(|| SimError::UnknownScenario(id.to_string()))
}

/// Registered algorithm keys, sorted
pub fn algorithm_ids() -> impl Iterator<Item = &'static str> {
    ALGORITHMS.keys().copied()
}

/// Registered scenario keys, sorted
pub fn scenario_ids() -> impl Iterator<Item = &'static str> {
    SCENARIOS.keys().copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_sizes() {
        assert_eq!(ALGORITHMS.len(), 22);
        assert_eq!(SCENARIOS.len(), 10);
    }

    #[test]
    fn test_default_algorithm() {
        let descriptor = algorithm("aserti3-416").unwrap();
        assert_eq!(descriptor.id, "aserti3-416");
        assert_eq!(
            descriptor.algorithm,
            Algorithm::Asert(AsertParams { tau: 173_009, approximation: Approximation::Cubic, median_of_three: false })
        );
    }

    #[test]
    fn test_median_of_three_variants() {
        let params = algorithm("aserti3-mo3-208").unwrap().algorithm.params().to_owned();
        assert!(params.median_of_three);
        assert_eq!(params.tau, 86_504);

        let reference = algorithm("aserti3-mo3-416-cpp").unwrap().algorithm;
        assert!(reference.is_reference());
        assert!(reference.params().median_of_three);
    }

    #[test]
    fn test_taus_follow_half_life() {
        assert_eq!(algorithm("aserti3-072").unwrap().algorithm.params().tau, 29_943);
        assert_eq!(algorithm("aserti1-288").unwrap().algorithm.params().tau, 119_775);
        assert_eq!(algorithm("aserti2-144").unwrap().algorithm.params().tau, 59_887);
    }

    #[test]
    fn test_scenarios() {
        let stable = scenario("stable").unwrap();
        assert_eq!(stable.fx_update, FxUpdate::Constant);
        assert_eq!(stable.fx_jumps, FxJumpSchedule::None);

        assert_eq!(scenario("ft100").unwrap().pressure.ramp_hashrate, -100.0);
        assert_eq!(scenario("pump-osc").unwrap().pressure.pump_threshold, 8000);
        assert_eq!(scenario("price10x").unwrap().fx_jumps, FxJumpSchedule::Extreme);
    }

    #[test]
    fn test_unknown_keys() {
        assert!(matches!(algorithm("k-1"), Err(SimError::UnknownAlgorithm(id)) if id == "k-1"));
        assert!(matches!(scenario("crash"), Err(SimError::UnknownScenario(_))));
    }

    #[test]
    fn test_ids_sorted() {
        let ids: Vec<_> = scenario_ids().collect();
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
        assert!(algorithm_ids().any(|id| id == "aserti3-mo3-416-cpp"));
    }
}
