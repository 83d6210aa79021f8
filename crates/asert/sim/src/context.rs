//! Simulation engine
//!
//! A [`SimulationContext`] owns one append-only history. A run clears it,
//! seeds a steady-state warm-up prefix, then advances one block at a time:
//! allocate hashrate, retarget, sample the arrival time, resolve the block
//! timestamp, move the exchange rate and append the new state.

use alloy_primitives::U256;
use asert_chainspec::{ChainSpecError, FUTURE_TIMESTAMP_OFFSET, IDEAL_BLOCK_TIME, MEDIAN_TIME_SPAN, SimParams};
use asert_consensus::{
    AsertCalculator, ConsensusError, ConsensusOracle, OracleBlock, OracleError, UnavailableOracle, compact_to_work,
    decode_compact, median_time_past, select_anchors,
};
use asert_miner::{HashrateModel, RevenueModel, mean_block_time, sample_block_time};
use asert_primitives::{BlockState, block_times};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, info, warn};

use crate::{
    SimResult,
    registry::{self, Algorithm, AlgorithmDescriptor, ScenarioDescriptor},
};

/// Upper bound on the simulated blocks reserved up front; longer runs grow
/// the history as they go
const RESERVED_BLOCKS: u64 = 1 << 16;

/// Algorithm, scenario and seed of one run
#[derive(Debug, Clone, Copy)]
pub struct RunConfig {
    /// Retarget algorithm
    pub algorithm: &'static AlgorithmDescriptor,
    /// Hashrate and exchange-rate scenario
    pub scenario: &'static ScenarioDescriptor,
    /// Seed of the run's random generator
    pub seed: u64,
}

impl RunConfig {
    /// Resolve registry keys into a run configuration
    pub fn from_ids(algorithm: &str, scenario: &str, seed: u64) -> SimResult<Self> {
        Ok(Self { algorithm: registry::algorithm(algorithm)?, scenario: registry::scenario(scenario)?, seed })
    }

    /// Same selection with another seed
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Owner of a simulation history and the models that extend it
#[derive(Debug)]
pub struct SimulationContext {
    params: SimParams,
    calculator: AsertCalculator,
    hashrate: HashrateModel,
    revenue: RevenueModel,
    oracle: Box<dyn ConsensusOracle>,
    history: Vec<BlockState>,
    rng: StdRng,
}

impl SimulationContext {
    /// Create a context for `params` with no consensus oracle attached
    pub fn new(params: SimParams) -> SimResult<Self> {
        params.validate()?;
        // Validates the competing chain's bits as well
        let revenue = RevenueModel::from_params(&params)?;
        decode_compact(params.initial_bcc_bits)?;

        Ok(Self {
            calculator: AsertCalculator::new(),
            hashrate: HashrateModel::from_params(&params),
            revenue,
            oracle: Box::new(UnavailableOracle),
            history: Vec::new(),
            rng: StdRng::seed_from_u64(0),
            params,
        })
    }

    /// Attach a consensus oracle for reference algorithms
    pub fn with_oracle(mut self, oracle: Box<dyn ConsensusOracle>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Run parameters
    pub const fn params(&self) -> &SimParams {
        &self.params
    }

    /// Full history of the last run, warm-up prefix included
    pub fn history(&self) -> &[BlockState] {
        &self.history
    }

    /// Attached consensus oracle
    pub fn oracle(&self) -> &dyn ConsensusOracle {
        self.oracle.as_ref()
    }

    /// Run `config` and return its blocks without the warm-up prefix.
    ///
    /// Any failure clears the history before it is returned.
    pub fn run(&mut self, config: &RunConfig) -> SimResult<Vec<BlockState>> {
        let result = self.run_inner(config);
        if result.is_err() {
            self.history.clear();
        }
        result
    }

    /// Run `config` and return its inter-block times
    pub fn run_block_times(&mut self, config: &RunConfig) -> SimResult<Vec<i64>> {
        Ok(block_times(&self.run(config)?))
    }

    fn run_inner(&mut self, config: &RunConfig) -> SimResult<Vec<BlockState>> {
        info!(
            target: "asert::sim",
            algorithm = config.algorithm.id,
            scenario = config.scenario.id,
            seed = config.seed,
            blocks = self.params.num_blocks,
            "Starting simulation"
        );

        self.rng = StdRng::seed_from_u64(config.seed);
        self.seed_prefix()?;

        let jumps = config.scenario.fx_jumps.generate(self.params.num_blocks, &mut self.rng);
        for n in 0..self.params.num_blocks {
            let fx_jump = jumps.get(&n).copied().unwrap_or(1.0);
            self.advance(config, fx_jump)?;
        }

        let simulated = self.history[self.params.prefix_blocks..].to_vec();
        info!(
            target: "asert::sim",
            algorithm = config.algorithm.id,
            scenario = config.scenario.id,
            tip = simulated.last().map(|state| state.height),
            "Finished simulation"
        );
        Ok(simulated)
    }

    /// Replace the history with the steady-state warm-up prefix.
    ///
    /// Prefix blocks sit exactly on schedule at the initial target, ending one
    /// interval before the initial timestamp and one block below the initial
    /// height.
    pub fn seed_prefix(&mut self) -> SimResult<()> {
        let p = &self.params;
        let prefix = p.prefix_blocks;
        let work = compact_to_work(p.initial_bcc_bits)?;

        self.history.clear();
        self.history.reserve(prefix + p.num_blocks.min(RESERVED_BLOCKS) as usize);

        for i in 0..prefix {
            // Blocks before the initial height, counting down to -1
            let back = (prefix - i) as u64;
            let height = p.initial_height.checked_sub(back).ok_or_else(|| ChainSpecError::InvalidParam {
                name: "initial_height",
                reason: format!("below the {prefix} block warm-up prefix"),
            })?;
            let timestamp = p.initial_timestamp - back as i64 * IDEAL_BLOCK_TIME;

            self.history.push(BlockState {
                height,
                wall_time: timestamp,
                timestamp,
                bits: p.initial_bcc_bits,
                chainwork: work * U256::from((i + 1) as u64),
                fx: p.initial_fx,
                hashrate: p.initial_hashrate,
                rev_ratio: 0.0,
                var_frac: 0.5,
                memory_frac: 0.0,
                greedy_frac: 0.0,
                msg: String::new(),
            });
        }
        Ok(())
    }

    /// Append one simulated block.
    ///
    /// `fx_jump` multiplies the new exchange rate; `1.0` means no jump.
    pub fn advance(&mut self, config: &RunConfig, fx_jump: f64) -> SimResult<&BlockState> {
        let scenario = config.scenario;
        let allocation = self.hashrate.next_hashrate(&self.history, &scenario.pressure)?;
        let mut msg = allocation.events;

        let bits = self.next_bits(&config.algorithm.algorithm)?;
        let target = decode_compact(bits)?;

        let mean = mean_block_time(target, allocation.hashrate)?;
        let elapsed = sample_block_time(mean, &mut self.rng);

        let Some(last) = self.history.last() else {
            return Err(ConsensusError::AnchorIndexOutOfRange { index: 0, len: 0 }.into());
        };
        let wall_time = last.wall_time + elapsed;

        let ramp = scenario.pressure.ramp_hashrate;
        let timestamp = if self.rng.random::<f64>() < ramp.abs() / allocation.hashrate {
            if ramp > 0.0 {
                let window = &self.history[self.history.len().saturating_sub(MEDIAN_TIME_SPAN)..];
                let mtp = median_time_past(window).unwrap_or(last.timestamp);
                debug!(target: "asert::sim", height = last.height + 1, mtp, "Ramp miner pinned timestamp");
                mtp + 1
            } else {
                debug!(target: "asert::sim", height = last.height + 1, wall_time, "Withdrawing miner stamped a future time");
                wall_time + FUTURE_TIMESTAMP_OFFSET
            }
        } else {
            wall_time
        };

        let mut fx = scenario.fx_update.next_fx(last.fx, self.rng.random());
        if fx_jump != 1.0 {
            debug!(target: "asert::sim", height = last.height + 1, factor = fx_jump, "FX jump");
            msg.push(format!("FX jumped by factor {fx_jump:.2}"));
            fx *= fx_jump;
        }
        let rev_ratio = self.revenue.revenue_ratio(fx, target, &mut self.rng);

        let chainwork = last
            .chainwork
            .checked_add(compact_to_work(bits)?)
            .ok_or(ConsensusError::WorkOverflow { bits })?;

        let state = BlockState {
            height: last.height + 1,
            wall_time,
            timestamp,
            bits,
            chainwork,
            fx,
            hashrate: allocation.hashrate,
            rev_ratio,
            var_frac: allocation.var_frac,
            memory_frac: allocation.memory_frac,
            greedy_frac: allocation.greedy_frac,
            msg: msg.join(" / "),
        };
        debug!(
            target: "asert::sim",
            height = state.height,
            bits = %format!("{bits:#010x}"),
            elapsed,
            hashrate = state.hashrate,
            "Advanced block"
        );

        self.history.push(state);
        Ok(&self.history[self.history.len() - 1])
    }

    fn next_bits(&self, algorithm: &Algorithm) -> SimResult<u32> {
        match algorithm {
            Algorithm::Asert(params) => Ok(self.calculator.next_bits(&self.history, params)?),
            Algorithm::Reference(params) => {
                let anchors = select_anchors(&self.history, params.median_of_three)?;
                let window: Vec<OracleBlock> =
                    self.history[anchors.first..=anchors.last].iter().map(OracleBlock::from_header).collect();
                let fork_height = self.history[0].height;
                self.oracle.reference_next_bits(&window, fork_height).map_err(|err| {
                    if matches!(err, OracleError::Unavailable(_)) {
                        warn!(target: "asert::sim", oracle = self.oracle.name(), "No consensus oracle for reference algorithm");
                    }
                    err.into()
                })
            }
        }
    }
}
