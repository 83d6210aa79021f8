//! Anchor block selection
//!
//! The engine measures schedule drift between a reference (`first`) block and
//! an evaluation (`last`) block. In median-of-three mode each of the two is
//! replaced by the block with the middle timestamp among itself and its two
//! predecessors, so a single miner cannot move either end by lying about time.

use crate::{ConsensusError, ConsensusResult, RetargetHeader};

/// History indices of the reference and evaluation blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPair {
    /// Reference block
    pub first: usize,
    /// Evaluation block
    pub last: usize,
}

/// Index of the block with the median timestamp among `index - 2..=index`.
///
/// Uses a fixed three-comparison sort network that compares timestamps only,
/// so equal timestamps resolve the same way on every call: `[1, 1, 1]`
/// yields `index - 1`.
pub fn suitable_block_index<H: RetargetHeader>(history: &[H], index: usize) -> ConsensusResult<usize> {
    if index < 2 || index >= history.len() {
        return Err(ConsensusError::AnchorIndexOutOfRange { index, len: history.len() });
    }

    let ts = |i: usize| history[i].timestamp();
    let mut blocks = [index - 2, index - 1, index];

    if ts(blocks[0]) > ts(blocks[2]) {
        blocks.swap(0, 2);
    }
    if ts(blocks[0]) > ts(blocks[1]) {
        blocks.swap(0, 1);
    }
    if ts(blocks[1]) > ts(blocks[2]) {
        blocks.swap(1, 2);
    }

    Ok(blocks[1])
}

/// Pick the anchors for a retarget over `history`.
///
/// Direct mode spans the whole history. Median-of-three mode needs at least
/// three blocks.
pub fn select_anchors<H: RetargetHeader>(history: &[H], median_of_three: bool) -> ConsensusResult<AnchorPair> {
    let Some(tip) = history.len().checked_sub(1) else {
        return Err(ConsensusError::AnchorIndexOutOfRange { index: 0, len: 0 });
    };

    if median_of_three {
        Ok(AnchorPair {
            first: suitable_block_index(history, 2)?,
            last: suitable_block_index(history, tip)?,
        })
    } else {
        Ok(AnchorPair { first: 0, last: tip })
    }
}

/// Median of the window's timestamps, taking the lower median on even sizes.
///
/// Returns `None` for an empty window.
pub fn median_time_past<H: RetargetHeader>(window: &[H]) -> Option<i64> {
    if window.is_empty() {
        return None;
    }
    let mut times: Vec<i64> = window.iter().map(RetargetHeader::timestamp).collect();
    times.sort_unstable();
    Some(times[(times.len() - 1) / 2])
}
