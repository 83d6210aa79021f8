//! ASERT Difficulty Retargeting
//!
//! This crate provides the consensus side of the retarget simulator:
//! - Compact target codec (`bits` <-> 256-bit target, chainwork)
//! - Anchor selection, including the median-of-three smoothing mode
//! - The ASERT engine in 16-bit fixed point with linear, quadratic and
//!   cubic approximations of `2^x`
//! - An adapter for cross-checking against a native reference implementation

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod anchor;
pub mod compact;
pub mod difficulty;
pub mod oracle;

pub use anchor::{AnchorPair, median_time_past, select_anchors, suitable_block_index};
pub use compact::{MAX_TARGET, compact_to_work, decode_compact, encode_compact, encode_compact_clamped};
pub use difficulty::{Approximation, AsertCalculator, AsertParams, calculate_next_bits};
pub use oracle::{ConsensusOracle, CrossCheck, OracleBlock, OracleError, UnavailableOracle, cross_validate};

#[cfg(feature = "native-oracle")]
pub use oracle::NativeOracle;

use asert_primitives::BlockState;
use thiserror::Error;

/// Result alias for consensus operations
pub type ConsensusResult<T> = Result<T, ConsensusError>;

/// Contract violations of the retargeting layer.
///
/// These indicate a malformed input or an algorithm defect; they are never
/// recovered inside a simulation run. Clamping a target to the ceiling is not
/// an error and is reported through logging instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsensusError {
    /// Compact value outside the accepted encoding
    #[error("malformed compact target {bits:#010x}: {reason}")]
    MalformedCompact {
        /// Offending compact value
        bits: u32,
        /// Which precondition failed
        reason: &'static str,
    },

    /// The evaluation block is not above the reference block
    #[error("height delta must be positive: first {first}, last {last}")]
    NonPositiveHeightDelta {
        /// Height of the reference block
        first: u64,
        /// Height of the evaluation block
        last: u64,
    },

    /// A target of zero cannot be encoded or mined
    #[error("target must be positive")]
    NonPositiveTarget,

    /// Work of a target does not fit 256 bits
    #[error("work of compact target {bits:#010x} overflows 256 bits")]
    WorkOverflow {
        /// Offending compact value
        bits: u32,
    },

    /// Median-of-three lookup outside the history
    #[error("anchor index {index} out of range for history of {len} blocks")]
    AnchorIndexOutOfRange {
        /// Requested index
        index: usize,
        /// History length
        len: usize,
    },

    /// Unknown approximation order
    #[error("invalid approximation mode {0}, expected 1, 2 or 3")]
    InvalidApproximation(u8),

    /// Time constant of zero
    #[error("tau must be positive")]
    InvalidTau,
}

/// Header fields the retargeting engine reads.
///
/// Implemented by the simulator's [`BlockState`] and by the flat
/// [`OracleBlock`] handed to the reference implementation.
pub trait RetargetHeader {
    /// Block height
    fn height(&self) -> u64;
    /// Block timestamp in seconds
    fn timestamp(&self) -> i64;
    /// Compact target
    fn bits(&self) -> u32;
}

impl RetargetHeader for BlockState {
    fn height(&self) -> u64 {
        self.height
    }

    fn timestamp(&self) -> i64 {
        self.timestamp
    }

    fn bits(&self) -> u32 {
        self.bits
    }
}
