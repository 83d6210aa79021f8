//! CSV projection of block states

use asert_chainspec::IDEAL_BLOCK_TIME;
use asert_consensus::compact::{MAX_TARGET, decode_compact, difficulty, target_to_f64};
use asert_primitives::BlockState;
use chrono::DateTime;

/// Column names, in row order
pub const CSV_HEADER: &str = "Height, FX, Block Time, Unix, Timestamp, Difficulty (bn), Implied Difficulty (bn), \
                              Hashrate (PH/s), Rev Ratio, Greedy?, Comments";

/// Difficulty that `hashrate` PH/s would need to average the ideal block time
pub fn implied_difficulty(hashrate: f64) -> f64 {
    let hashes_per_block = hashrate * 1e15 * IDEAL_BLOCK_TIME as f64;
    target_to_f64(MAX_TARGET) * hashes_per_block / 2f64.powi(256)
}

/// One CSV row for `state`, whose block time is measured from `parent`
pub fn csv_row(state: &BlockState, parent: &BlockState) -> eyre::Result<String> {
    let difficulty = difficulty(decode_compact(state.bits)?);
    let timestamp = DateTime::from_timestamp(state.timestamp, 0)
        .ok_or_else(|| eyre::eyre!("timestamp {} out of range", state.timestamp))?;

    Ok([
        state.height.to_string(),
        format!("{:.8}", state.fx),
        state.block_time(parent).to_string(),
        state.timestamp.to_string(),
        timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        format!("{:.2}", difficulty / 1e9),
        format!("{:.2}", implied_difficulty(state.hashrate) / 1e9),
        format!("{:.0}", state.hashrate),
        format!("{:.3}", state.rev_ratio),
        if state.is_greedy() { "Yes" } else { "No" }.to_string(),
        state.msg.clone(),
    ]
    .join(", "))
}
