//! Registry key parsers

use asert_sim::{AlgorithmDescriptor, ScenarioDescriptor, registry};

/// Default algorithm key
pub const DEFAULT_ALGORITHM: &str = "aserti3-416";

/// Default scenario key
pub const DEFAULT_SCENARIO: &str = "default";

/// Parse an algorithm key into its registry entry
pub fn algorithm_value_parser(s: &str) -> eyre::Result<&'static AlgorithmDescriptor> {
    registry::algorithm(s).map_err(|_| {
        eyre::eyre!("unknown algorithm `{s}`, expected one of: {}", registry::algorithm_ids().collect::<Vec<_>>().join(", "))
    })
}

/// Parse a scenario key into its registry entry
pub fn scenario_value_parser(s: &str) -> eyre::Result<&'static ScenarioDescriptor> {
    registry::scenario(s).map_err(|_| {
        eyre::eyre!("unknown scenario `{s}`, expected one of: {}", registry::scenario_ids().collect::<Vec<_>>().join(", "))
    })
}
