//! Primitive types of the retarget simulator
//!
//! One [`BlockState`] is recorded per simulated block. States are appended to
//! a history by the simulation engine and only ever read afterwards.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

use alloy_primitives::U256;

/// Snapshot of the simulated chain after one block
#[derive(Debug, Clone, PartialEq)]
pub struct BlockState {
    /// Block height
    pub height: u64,
    /// Simulated clock when the block was found (seconds)
    pub wall_time: i64,
    /// Timestamp written into the block; may lag or lead `wall_time`
    pub timestamp: i64,
    /// Compact target the block was mined at
    pub bits: u32,
    /// Cumulative work up to and including this block
    pub chainwork: U256,
    /// Exchange rate of the simulated coin against the competing coin
    pub fx: f64,
    /// Total hashrate mining the chain (PH/s)
    pub hashrate: f64,
    /// Competing-chain revenue rate over simulated-chain revenue rate
    pub rev_ratio: f64,
    /// Share of variable hashrate on this chain, in `[0, 1]`
    pub var_frac: f64,
    /// Unbounded hysteresis accumulator of the variable miners
    pub memory_frac: f64,
    /// Greedy miners present: exactly `0.0` or `1.0`
    pub greedy_frac: f64,
    /// Notable events of this block, joined with `" / "`
    pub msg: String,
}

impl BlockState {
    /// Whether greedy miners were on this chain for the block
    pub fn is_greedy(&self) -> bool {
        self.greedy_frac == 1.0
    }

    /// Seconds between the parent's timestamp and this block's timestamp
    pub fn block_time(&self, parent: &Self) -> i64 {
        self.timestamp - parent.timestamp
    }
}

/// Inter-block times of a run: the differences between consecutive timestamps
pub fn block_times(states: &[BlockState]) -> Vec<i64> {
    states.windows(2).map(|pair| pair[1].block_time(&pair[0])).collect()
}
