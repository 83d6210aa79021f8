//! Simulation parameter record

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::{ChainSpecError, MEDIAN_TIME_SPAN, MIN_ANCHOR_HISTORY};

/// Parameters of one simulation run.
///
/// `Default` is the August 2017 chain-split setup: a minority chain
/// (`bcc`) competing for hashrate with a majority chain (`swc`) whose target
/// stays fixed. Hashrates are in PH/s, fees and rewards in coins per block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimParams {
    /// Compact target of the simulated chain at the start of the run
    pub initial_bcc_bits: u32,
    /// Compact target of the competing chain (held constant)
    pub initial_swc_bits: u32,
    /// Initial exchange rate of the simulated coin against the competing coin
    pub initial_fx: f64,
    /// Timestamp of the last warm-up block
    pub initial_timestamp: i64,
    /// Hashrate recorded on warm-up blocks
    pub initial_hashrate: f64,
    /// Height of the first simulated block
    pub initial_height: u64,
    /// Upper bound of random fees on the competing chain
    pub btc_fees: f64,
    /// Upper bound of random fees on the simulated chain
    pub bch_fees: f64,
    /// Block subsidy on both chains
    pub block_reward: f64,
    /// Number of simulated blocks after the warm-up prefix
    pub num_blocks: u64,
    /// Number of synthetic steady-state blocks seeded before the run
    pub prefix_blocks: usize,

    /// Hashrate that always mines the simulated chain
    pub steady_hashrate: f64,

    /// Hashrate split across both chains by relative revenue
    pub variable_hashrate: f64,
    /// Width of the linear switching band, in percent
    pub variable_pct: f64,
    /// Number of blocks averaged to determine the revenue ratio
    pub variable_window: usize,
    /// Exponent applied to the mean revenue ratio
    pub variable_exponent: f64,
    /// Gain of the hysteresis term: a ratio of 1.01 lifts the next block's
    /// variable share by `0.01 * memory_gain`
    pub memory_gain: f64,

    /// Hashrate that switches chains wholesale once one is consistently
    /// more profitable
    pub greedy_hashrate: f64,
    /// Profitability margin greedy miners wait for, in percent
    pub greedy_pct: f64,
    /// Number of blocks greedy miners average over
    pub greedy_window: usize,

    /// How many blocks back the pump detector looks
    pub pump_lookback: usize,
    /// Span of blocks whose timestamp gap the pump detector measures
    pub pump_span: usize,
}

impl Default for SimParams {
    fn default() -> Self {
        Self {
            initial_bcc_bits: 0x1808_4bb7,
            initial_swc_bits: 0x1801_3ce9,
            initial_fx: 0.19,
            initial_timestamp: 1_503_430_225,
            initial_hashrate: 1000.0,
            initial_height: 481_824,
            btc_fees: 0.02,
            bch_fees: 0.002,
            block_reward: 12.5,
            num_blocks: 10_000,
            prefix_blocks: 2020,
            steady_hashrate: 300.0,
            variable_hashrate: 2000.0,
            variable_pct: 15.0,
            variable_window: 6,
            variable_exponent: 1.0,
            memory_gain: 0.01,
            greedy_hashrate: 2000.0,
            greedy_pct: 10.0,
            greedy_window: 6,
            pump_lookback: 144,
            pump_span: 5,
        }
    }
}

impl SimParams {
    /// Parse parameters from a TOML document. Missing keys keep their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, ChainSpecError> {
        let params: Self = toml::from_str(s)?;
        params.validate()?;
        Ok(params)
    }

    /// Load parameters from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ChainSpecError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Override the number of simulated blocks
    pub fn with_num_blocks(mut self, num_blocks: u64) -> Self {
        self.num_blocks = num_blocks;
        self
    }

    /// Shortest warm-up prefix that satisfies every look-back window
    pub fn min_prefix_blocks(&self) -> usize {
        [
            self.variable_window,
            self.greedy_window,
            self.pump_lookback + 1,
            MEDIAN_TIME_SPAN,
            MIN_ANCHOR_HISTORY,
        ]
        .into_iter()
        .max()
        .unwrap_or(MIN_ANCHOR_HISTORY)
    }

    /// Validate the parameters
    pub fn validate(&self) -> Result<(), ChainSpecError> {
        fn invalid(name: &'static str, reason: impl Into<String>) -> ChainSpecError {
            ChainSpecError::InvalidParam { name, reason: reason.into() }
        }

        if self.variable_window == 0 {
            return Err(invalid("variable_window", "must be at least 1"));
        }
        if self.greedy_window == 0 {
            return Err(invalid("greedy_window", "must be at least 1"));
        }
        if self.variable_pct <= 0.0 {
            return Err(invalid("variable_pct", "must be positive"));
        }
        if self.greedy_pct <= 0.0 {
            return Err(invalid("greedy_pct", "must be positive"));
        }
        if self.initial_fx <= 0.0 {
            return Err(invalid("initial_fx", "must be positive"));
        }
        if self.initial_hashrate <= 0.0 {
            return Err(invalid("initial_hashrate", "must be positive"));
        }
        if self.pump_span > self.pump_lookback {
            return Err(invalid(
                "pump_span",
                format!("{} exceeds pump_lookback {}", self.pump_span, self.pump_lookback),
            ));
        }
        let min_prefix = self.min_prefix_blocks();
        if self.prefix_blocks < min_prefix {
            return Err(invalid(
                "prefix_blocks",
                format!("{} is shorter than the {min_prefix} blocks the look-back windows need", self.prefix_blocks),
            ));
        }
        if i64::try_from(self.prefix_blocks).is_err() || i64::try_from(self.num_blocks).is_err() {
            return Err(invalid("num_blocks", "run length does not fit the simulated clock"));
        }

        Ok(())
    }
}
