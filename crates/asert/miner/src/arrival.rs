//! Block arrival process

use alloy_primitives::U256;
use asert_consensus::compact::{expected_hashes, wide_to_f64};
use rand::Rng;

use crate::{MiningError, MiningResult};

/// Hashes per second in one PH/s
const HASHES_PER_PETAHASH: f64 = 1e15;

/// Expected seconds to find a block at `target` with `hashrate` PH/s
pub fn mean_block_time(target: U256, hashrate: f64) -> MiningResult<f64> {
    if !(hashrate.is_finite() && hashrate > 0.0) {
        return Err(MiningError::InvalidHashrate);
    }
    let mean_hashes = wide_to_f64(expected_hashes(target)?);
    Ok(mean_hashes / (hashrate * HASHES_PER_PETAHASH))
}

/// Draw an exponentially distributed block time, rounded to whole seconds.
///
/// Consumes exactly one uniform draw.
pub fn sample_block_time<R: Rng + ?Sized>(mean: f64, rng: &mut R) -> i64 {
    let sample: f64 = rng.random();
    let lambda = 1.0 / mean;
    ((1.0 - sample).ln() / -lambda + 0.5) as i64
}

#[cfg(test)]
mod tests {
    use super::*;
    use asert_consensus::decode_compact;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_mean_block_time() {
        // 2^200 target needs 2^56 hashes on average
        let target = U256::from(1u64) << 200usize;
        let mean = mean_block_time(target, 1.0).unwrap();
        assert!((mean - 2f64.powi(56) / 1e15).abs() < 1e-9);
    }

    #[test]
    fn test_split_chain_start_is_fast() {
        // 1300 PH/s at the post-split target finds a block every seven minutes
        let target = decode_compact(0x1808_4bb7).unwrap();
        let mean = mean_block_time(target, 1300.0).unwrap();
        assert!((mean - 437.885).abs() < 0.01, "mean {mean}");
    }

    #[test]
    fn test_invalid_hashrate() {
        let target = U256::from(1u64) << 200usize;
        assert_eq!(mean_block_time(target, 0.0), Err(MiningError::InvalidHashrate));
        assert_eq!(mean_block_time(target, f64::NAN), Err(MiningError::InvalidHashrate));
    }

    #[test]
    fn test_sample_mean_converges() {
        let mut rng = StdRng::seed_from_u64(3);
        let n = 20_000;
        let total: i64 = (0..n).map(|_| sample_block_time(600.0, &mut rng)).sum();
        let mean = total as f64 / n as f64;
        assert!((mean - 600.0).abs() < 20.0, "mean {mean}");
    }

    #[test]
    fn test_samples_are_non_negative() {
        let mut rng = StdRng::seed_from_u64(11);
        assert!((0..1000).all(|_| sample_block_time(1.0, &mut rng) >= 0));
    }
}
