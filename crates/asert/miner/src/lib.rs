//! Simulated miners
//!
//! This crate models who mines the simulated chain and how fast blocks arrive:
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                      SIMULATED MINERS                           │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Revenue                                                 │   │
//! │   │  • Reward plus random fees on both chains                │   │
//! │   │  • Scaled by exchange rate and relative difficulty       │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Hashrate allocation                                     │   │
//! │   │  • Steady miners never leave                             │   │
//! │   │  • Variable miners follow revenue with hysteresis        │   │
//! │   │  • Greedy miners switch wholesale past a deadband        │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                              │                                  │
//! │   ┌─────────────────────────────────────────────────────────┐   │
//! │   │  Block arrival                                           │   │
//! │   │  • Exponential inter-block time from target + hashrate   │   │
//! │   └─────────────────────────────────────────────────────────┘   │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod arrival;
pub mod hashrate;
pub mod revenue;

pub use arrival::{mean_block_time, sample_block_time};
pub use hashrate::{HashrateAllocation, HashrateModel, HashratePressure};
pub use revenue::RevenueModel;

use asert_consensus::ConsensusError;
use thiserror::Error;

/// Result alias for miner models
pub type MiningResult<T> = Result<T, MiningError>;

/// Mining model errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiningError {
    /// The history is too short for a look-back window
    #[error("History has {have} blocks, {need} needed")]
    InsufficientHistory {
        /// Blocks required
        need: usize,
        /// Blocks available
        have: usize,
    },

    /// Total hashrate must stay positive for blocks to be found
    #[error("Hashrate must be positive")]
    InvalidHashrate,

    /// Consensus error
    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),
}
