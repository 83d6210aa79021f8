//! ASERT difficulty adjustment
//!
//! The next target is the anchor target scaled by
//! `2^((time_delta - ideal * height_delta) / tau)`, evaluated in Q16.16 fixed
//! point: the integer part of the exponent becomes a shift and the fractional
//! part is approximated by a low-order polynomial.

use alloy_primitives::{U256, U512};
use asert_chainspec::IDEAL_BLOCK_TIME;
use tracing::debug;

use crate::{
    ConsensusError, ConsensusResult, RetargetHeader,
    anchor::select_anchors,
    compact::{MAX_TARGET, decode_compact, encode_compact, narrow, widen},
};

/// Fractional bits of the fixed-point exponent
const RBITS: u32 = 16;

/// `1 << RBITS`
const RADIX: i128 = 1 << RBITS;

/// Cubic coefficients of `2^x - 1` on `[0, 1)`, scaled by `2^48`
const CUBIC: [u128; 3] = [195_766_423_245_049, 971_821_376, 5_127];

/// Polynomial used for the fractional part of the exponent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Approximation {
    /// `1 + x`
    Linear = 1,
    /// `1 + 2x/3 + x^2/3`
    Quadratic = 2,
    /// Minimax cubic fit
    Cubic = 3,
}

impl TryFrom<u8> for Approximation {
    type Error = ConsensusError;

    fn try_from(mode: u8) -> Result<Self, Self::Error> {
        match mode {
            1 => Ok(Self::Linear),
            2 => Ok(Self::Quadratic),
            3 => Ok(Self::Cubic),
            other => Err(ConsensusError::InvalidApproximation(other)),
        }
    }
}

/// Parameters of one ASERT variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AsertParams {
    /// Time constant in seconds
    pub tau: u64,
    /// Approximation order
    pub approximation: Approximation,
    /// Use median-of-three anchors
    pub median_of_three: bool,
}

impl AsertParams {
    /// Create parameters with direct anchors
    pub fn new(tau: u64, approximation: Approximation) -> ConsensusResult<Self> {
        if tau == 0 {
            return Err(ConsensusError::InvalidTau);
        }
        Ok(Self { tau, approximation, median_of_three: false })
    }

    /// Time constant for a half-life of `blocks` ideal block intervals,
    /// `floor(ln 2 * 600 * blocks)`.
    pub fn tau_for_half_life(blocks: u64) -> u64 {
        (std::f64::consts::LN_2 * IDEAL_BLOCK_TIME as f64 * blocks as f64) as u64
    }

    /// Switch to median-of-three anchors
    pub const fn with_median_of_three(mut self) -> Self {
        self.median_of_three = true;
        self
    }
}

/// Stateless ASERT engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AsertCalculator {
    ideal_block_time: i64,
}

impl AsertCalculator {
    /// Create an engine targeting the chain's ideal block spacing
    pub const fn new() -> Self {
        Self { ideal_block_time: IDEAL_BLOCK_TIME }
    }

    /// Create an engine with a custom ideal block spacing
    pub const fn with_ideal_block_time(ideal_block_time: i64) -> Self {
        Self { ideal_block_time }
    }

    /// Ideal block spacing in seconds
    pub const fn ideal_block_time(&self) -> i64 {
        self.ideal_block_time
    }

    /// Compact target of the block following `history`.
    ///
    /// The anchor target is always taken from `history[0]`; the anchors only
    /// choose which timestamps and heights are compared.
    pub fn next_bits<H: RetargetHeader>(&self, history: &[H], params: &AsertParams) -> ConsensusResult<u32> {
        let anchors = select_anchors(history, params.median_of_three)?;
        let (first, last) = (&history[anchors.first], &history[anchors.last]);

        if last.height() <= first.height() {
            return Err(ConsensusError::NonPositiveHeightDelta { first: first.height(), last: last.height() });
        }
        let time_delta = last.timestamp() - first.timestamp();
        let height_delta = last.height() - first.height();

        let anchor_target = decode_compact(history[0].bits())?;
        let target = self.next_target(anchor_target, time_delta, height_delta, params)?;
        let bits = encode_compact(target)?;

        debug!(
            target: "asert::consensus",
            first = anchors.first,
            last = anchors.last,
            time_delta,
            height_delta,
            tau = params.tau,
            bits = %format!("{bits:#010x}"),
            "Computed next bits"
        );
        Ok(bits)
    }

    /// Scale `anchor_target` by the schedule drift.
    ///
    /// The exponent uses floor division, so a block one second behind
    /// schedule already shifts the target down by a whole step. Targets that
    /// overflow the ceiling are returned unclamped; [`encode_compact`] clamps.
    pub fn next_target(
        &self,
        anchor_target: U256,
        time_delta: i64,
        height_delta: u64,
        params: &AsertParams,
    ) -> ConsensusResult<U256> {
        if params.tau == 0 {
            return Err(ConsensusError::InvalidTau);
        }
        if height_delta == 0 {
            return Err(ConsensusError::NonPositiveHeightDelta { first: 0, last: 0 });
        }

        let drift = i128::from(time_delta) - i128::from(self.ideal_block_time) * i128::from(height_delta);
        let exponent = (drift * RADIX).div_euclid(i128::from(params.tau));

        let shifts = exponent >> RBITS;
        let target = shift_target(anchor_target, shifts);
        if target > MAX_TARGET {
            return Ok(target);
        }

        let frac = (exponent - (shifts << RBITS)) as u128;
        Ok(apply_fraction(target, frac, params.approximation))
    }
}

impl Default for AsertCalculator {
    fn default() -> Self {
        Self::new()
    }
}

/// Compact target of the block following `history` with the default engine
pub fn calculate_next_bits<H: RetargetHeader>(history: &[H], params: &AsertParams) -> ConsensusResult<u32> {
    AsertCalculator::new().next_bits(history, params)
}

/// `target * 2^shifts`, saturating on the way up
fn shift_target(target: U256, shifts: i128) -> U256 {
    if shifts < 0 {
        match usize::try_from(-shifts) {
            Ok(s) if s < 256 => target >> s,
            _ => U256::ZERO,
        }
    } else {
        match usize::try_from(shifts) {
            Ok(s) if target.bit_len() + s <= 256 => target << s,
            _ if target.is_zero() => U256::ZERO,
            _ => U256::MAX,
        }
    }
}

/// `target * 2^(frac / RADIX)` for `frac` in `[0, RADIX)`
fn apply_fraction(target: U256, frac: u128, approximation: Approximation) -> U256 {
    let t = widen(target);
    let e = U512::from(frac);

    let increment = match approximation {
        Approximation::Linear => (t * e) >> RBITS as usize,
        Approximation::Quadratic => {
            let radix = U512::from(RADIX as u128);
            let three = U512::from(3u64);
            let two = U512::from(2u64);
            (t * two * e * radix / three + t * e * e / three) >> (2 * RBITS) as usize
        }
        Approximation::Cubic => {
            let factor = (CUBIC[0] * frac + CUBIC[1] * frac * frac + CUBIC[2] * frac * frac * frac + (1u128 << 47))
                >> (3 * RBITS);
            (t * U512::from(factor)) >> RBITS as usize
        }
    };

    narrow(t + increment).unwrap_or(U256::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OracleBlock;
    use asert_chainspec::MAX_BITS;
    use proptest::prelude::*;

    const ANCHOR_BITS: u32 = 0x1808_4bb7;
    const TAU_416: u64 = 173_009;

    fn params(mode: u8) -> AsertParams {
        AsertParams::new(TAU_416, Approximation::try_from(mode).unwrap()).unwrap()
    }

    /// Anchor at height 1000, tip `height_delta` blocks later and `time_delta`
    /// seconds after it
    fn window(height_delta: u64, time_delta: i64, bits: u32) -> Vec<OracleBlock> {
        vec![
            OracleBlock { height: 1000, timestamp: 0, bits },
            OracleBlock { height: 1000 + height_delta, timestamp: time_delta, bits },
        ]
    }

    fn next(height_delta: u64, time_delta: i64, mode: u8) -> u32 {
        calculate_next_bits(&window(height_delta, time_delta, ANCHOR_BITS), &params(mode)).unwrap()
    }

    #[test]
    fn test_tau_for_half_life() {
        assert_eq!(AsertParams::tau_for_half_life(416), TAU_416);
        assert_eq!(AsertParams::tau_for_half_life(288), 119_775);
        assert_eq!(AsertParams::tau_for_half_life(144), 59_887);
        assert_eq!(AsertParams::tau_for_half_life(72), 29_943);
    }

    #[test]
    fn test_invalid_params() {
        assert_eq!(AsertParams::new(0, Approximation::Cubic), Err(ConsensusError::InvalidTau));
        assert_eq!(Approximation::try_from(4), Err(ConsensusError::InvalidApproximation(4)));
    }

    #[test]
    fn test_on_schedule_keeps_bits() {
        let history: Vec<_> = (0..5)
            .map(|i| OracleBlock { height: 1000 + i, timestamp: 600 * i as i64, bits: ANCHOR_BITS })
            .collect();
        for mode in 1..=3 {
            assert_eq!(calculate_next_bits(&history, &params(mode)).unwrap(), ANCHOR_BITS);
        }
    }

    #[test]
    fn test_one_tau_doubles_or_halves() {
        for mode in 1..=3 {
            assert_eq!(next(4, 2400 + TAU_416 as i64, mode), 0x1810_976e);
            assert_eq!(next(4, 2400 - TAU_416 as i64, mode), 0x1804_25db);
        }
    }

    #[test]
    fn test_half_tau_per_mode() {
        let ahead = 2400 + (TAU_416 / 2) as i64;
        let behind = 2400 - (TAU_416 / 2) as i64;

        assert_eq!(next(4, ahead, 1), 0x180c_718a);
        assert_eq!(next(4, ahead, 2), 0x180b_c090);
        assert_eq!(next(4, ahead, 3), 0x180b_bb19);

        assert_eq!(next(4, behind, 1), 0x1806_38c9);
        assert_eq!(next(4, behind, 2), 0x1805_e04c);
        assert_eq!(next(4, behind, 3), 0x1805_dd90);
    }

    #[test]
    fn test_custom_ideal_block_time() {
        let calculator = AsertCalculator::with_ideal_block_time(300);
        assert_eq!(calculator.ideal_block_time(), 300);

        let on_schedule = window(4, 1200, ANCHOR_BITS);
        assert_eq!(calculator.next_bits(&on_schedule, &params(3)).unwrap(), ANCHOR_BITS);

        // Same drift as a 600 second engine one tau ahead
        let ahead = window(4, 1200 + TAU_416 as i64, ANCHOR_BITS);
        assert_eq!(calculator.next_bits(&ahead, &params(3)).unwrap(), 0x1810_976e);
        assert_ne!(AsertCalculator::new().next_bits(&ahead, &params(3)).unwrap(), 0x1810_976e);
    }

    #[test]
    fn test_long_window() {
        assert_eq!(next(100, 63_600, 1), 0x1808_77e2);
        assert_eq!(next(100, 63_600, 2), 0x1808_6977);
        assert_eq!(next(100, 63_600, 3), 0x1808_6aa1);
    }

    #[test]
    fn test_one_second_behind_floors() {
        // drift of -1s floors to exponent -1, i.e. one whole shift down then
        // a fraction just under 1
        assert_eq!(next(100, 59_999, 1), 0x1808_4bb2);
        assert_eq!(next(100, 59_999, 2), 0x1808_4bb1);
        assert_eq!(next(100, 59_999, 3), 0x1808_4bb2);
    }

    #[test]
    fn test_clamps_to_max_target() {
        let huge = 6000 + TAU_416 as i64 * 100;
        assert_eq!(next(10, huge, 3), MAX_BITS);

        let history = window(10, huge, MAX_BITS);
        assert_eq!(calculate_next_bits(&history, &params(3)).unwrap(), MAX_BITS);

        let history = window(10, 6000 - 3 * TAU_416 as i64, MAX_BITS);
        assert_eq!(calculate_next_bits(&history, &params(3)).unwrap(), 0x1c1f_ffe0);
    }

    #[test]
    fn test_non_positive_height_delta() {
        let history = window(0, 600, ANCHOR_BITS);
        assert_eq!(
            calculate_next_bits(&history, &params(3)),
            Err(ConsensusError::NonPositiveHeightDelta { first: 1000, last: 1000 })
        );
    }

    #[test]
    fn test_malformed_anchor_bits() {
        let history = window(4, 2400, 0x1e00_ffff);
        assert!(matches!(
            calculate_next_bits(&history, &params(3)),
            Err(ConsensusError::MalformedCompact { .. })
        ));
    }

    #[test]
    fn test_median_of_three_uses_middle_timestamps() {
        // Out-of-order timestamps at both ends
        let timestamps = [1200, 0, 600, 1800, 2400, 4000, 3000];
        let history: Vec<_> = timestamps
            .iter()
            .enumerate()
            .map(|(i, &timestamp)| OracleBlock { height: 1000 + i as u64, timestamp, bits: ANCHOR_BITS })
            .collect();

        let mo3 = params(3).with_median_of_three();
        // first: median of [1200, 0, 600] is index 2
        // last: median of [2400, 4000, 3000] is index 6
        let expected = AsertCalculator::new()
            .next_target(decode_compact(ANCHOR_BITS).unwrap(), 3000 - 600, 4, &mo3)
            .unwrap();
        assert_eq!(calculate_next_bits(&history, &mo3).unwrap(), encode_compact(expected).unwrap());
    }

    #[test]
    fn test_shift_target_saturates() {
        assert_eq!(shift_target(U256::from(1u64), -300), U256::ZERO);
        assert_eq!(shift_target(U256::from(1u64), 255), U256::from(1u64) << 255usize);
        assert_eq!(shift_target(U256::from(1u64), 256), U256::MAX);
        assert_eq!(shift_target(U256::ZERO, 1000), U256::ZERO);
    }

    proptest! {
        #[test]
        fn prop_later_blocks_never_get_harder(
            mode in 1u8..=3,
            height_delta in 1u64..2000,
            time_delta in -500_000i64..500_000,
            extra in 1i64..50_000,
        ) {
            let earlier = next(height_delta, time_delta, mode);
            let later = next(height_delta, time_delta + extra, mode);
            prop_assert!(decode_compact(later).unwrap() >= decode_compact(earlier).unwrap());
        }

        #[test]
        fn prop_one_tau_ahead_doubles(mode in 1u8..=3, height_delta in 1u64..2000) {
            let base = 600 * height_delta as i64;
            prop_assert_eq!(next(height_delta, base + TAU_416 as i64, mode), 0x1810_976e);
        }
    }
}
