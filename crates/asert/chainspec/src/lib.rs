//! Chain specification for the retarget simulator
//!
//! Defines the consensus constants of the simulated chain and the parameter
//! record that drives a simulation run:
//! - Ideal block spacing: 600 seconds
//! - Maximum target: compact `0x1d00ffff`
//! - Warm-up prefix: 2020 steady-state blocks

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod config;

pub use config::SimParams;

use thiserror::Error;

/// Ideal spacing between blocks in seconds
pub const IDEAL_BLOCK_TIME: i64 = 600;

/// Compact encoding of the maximum (easiest) target
pub const MAX_BITS: u32 = 0x1d00_ffff;

/// Number of trailing blocks used for median-time-past
pub const MEDIAN_TIME_SPAN: usize = 11;

/// How far ahead of wall time a withdrawing miner stamps its blocks (2 hours)
pub const FUTURE_TIMESTAMP_OFFSET: i64 = 2 * 60 * 60;

/// Smallest history a median-of-three anchor lookup can work with
pub const MIN_ANCHOR_HISTORY: usize = 3;

/// Chain specification errors
#[derive(Debug, Error)]
pub enum ChainSpecError {
    /// A parameter is out of its allowed range
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParam {
        /// Parameter name
        name: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}
