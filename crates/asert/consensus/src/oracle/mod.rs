//! Cross-validation against a reference implementation
//!
//! A [`ConsensusOracle`] computes the next compact target independently of
//! this crate, typically through a prebuilt native library. Oracles are never
//! part of normal simulation control flow: an unavailable or failing oracle is
//! reported to the caller and the pure engine keeps running.

#[cfg(feature = "native-oracle")]
mod native;

#[cfg(feature = "native-oracle")]
pub use native::NativeOracle;

use std::fmt::Debug;

use thiserror::Error;
use tracing::warn;

use crate::{AsertCalculator, AsertParams, ConsensusError, RetargetHeader, select_anchors};

/// Flat header record handed to an oracle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OracleBlock {
    /// Block height
    pub height: u64,
    /// Block timestamp
    pub timestamp: i64,
    /// Compact target
    pub bits: u32,
}

impl OracleBlock {
    /// Copy the retarget fields out of any header
    pub fn from_header<H: RetargetHeader>(header: &H) -> Self {
        Self { height: header.height(), timestamp: header.timestamp(), bits: header.bits() }
    }
}

impl RetargetHeader for OracleBlock {
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

/// Oracle failures. None of these abort a simulation.
#[derive(Debug, Error)]
pub enum OracleError {
    /// No reference implementation is linked into this build
    #[error("consensus oracle unavailable: {0}")]
    Unavailable(String),

    /// The reference implementation rejected the call
    #[error("consensus oracle call failed: {0}")]
    CallFailed(String),

    /// Nothing to evaluate
    #[error("empty block window")]
    EmptyWindow,

    /// A height or timestamp does not fit the reference implementation's types
    #[error("block field out of range for the reference implementation")]
    FieldOverflow,

    /// The pure engine failed on the same input
    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}

/// Independent source of next-bits values
pub trait ConsensusOracle: Send + Sync + Debug {
    /// Human readable name for logs
    fn name(&self) -> &'static str;

    /// Next compact target after `window`, whose first block is the
    /// reference block and whose last block is the tip.
    fn reference_next_bits(&self, window: &[OracleBlock], fork_height: u64) -> Result<u32, OracleError>;
}

/// Oracle used when no reference implementation is linked
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableOracle;

impl ConsensusOracle for UnavailableOracle {
    fn name(&self) -> &'static str {
        "unavailable"
    }

    fn reference_next_bits(&self, _window: &[OracleBlock], _fork_height: u64) -> Result<u32, OracleError> {
        Err(OracleError::Unavailable("built without the `native-oracle` feature".to_string()))
    }
}

/// Outcome of one cross-validation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CrossCheck {
    /// Bits from the pure engine
    pub pure: u32,
    /// Bits from the oracle
    pub reference: u32,
}

impl CrossCheck {
    /// Whether both implementations agree
    pub const fn matches(&self) -> bool {
        self.pure == self.reference
    }
}

/// Compute the next bits with both the pure engine and `oracle`.
///
/// The oracle sees the blocks between the selected anchors, and the height of
/// the first history block as fork height. Disagreement is logged and
/// returned, not raised.
pub fn cross_validate<H: RetargetHeader>(
    oracle: &dyn ConsensusOracle,
    history: &[H],
    params: &AsertParams,
    calculator: &AsertCalculator,
) -> Result<CrossCheck, OracleError> {
    let first_block = history.first().ok_or(OracleError::EmptyWindow)?;
    let anchors = select_anchors(history, params.median_of_three)?;
    let pure = calculator.next_bits(history, params)?;

    let window: Vec<OracleBlock> =
        history[anchors.first..=anchors.last].iter().map(OracleBlock::from_header).collect();
    let reference = oracle.reference_next_bits(&window, first_block.height())?;

    let check = CrossCheck { pure, reference };
    if !check.matches() {
        warn!(
            target: "asert::oracle",
            oracle = oracle.name(),
            height = history[anchors.last].height(),
            pure = %format!("{pure:#010x}"),
            reference = %format!("{reference:#010x}"),
            "Pure engine disagrees with reference implementation"
        );
    }
    Ok(check)
}
