//! Simulation errors

use asert_chainspec::ChainSpecError;
use asert_consensus::{ConsensusError, OracleError};
use asert_miner::MiningError;
use thiserror::Error;

/// Result alias for simulation operations
pub type SimResult<T> = Result<T, SimError>;

/// Simulation errors
#[derive(Debug, Error)]
pub enum SimError {
    /// No algorithm registered under this key
    #[error("Unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// No scenario registered under this key
    #[error("Unknown scenario: {0}")]
    UnknownScenario(String),

    /// Another run holds the shared history
    #[error("Simulation busy: another run holds the shared history")]
    Busy,

    /// Parameter error
    #[error("Parameter error: {0}")]
    Params(#[from] ChainSpecError),

    /// Consensus error
    #[error("Consensus error: {0}")]
    Consensus(#[from] ConsensusError),

    /// Mining model error
    #[error("Mining error: {0}")]
    Mining(#[from] MiningError),

    /// Reference implementation error
    #[error("Oracle error: {0}")]
    Oracle(#[from] OracleError),
}
