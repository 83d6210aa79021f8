//! Compact target codec
//!
//! A compact target packs a 256-bit threshold into 32 bits: one exponent byte
//! (`size`, the byte length of the target) and a 24-bit mantissa whose top bit
//! is reserved as a sign and must stay clear.

use alloy_primitives::{U256, U512};
use tracing::warn;

use crate::{ConsensusError, ConsensusResult};

/// Largest exponent byte accepted by [`decode_compact`]
pub const MAX_COMPACT_SIZE: u32 = 0x1d;

/// Smallest mantissa accepted by [`decode_compact`]
const MIN_MANTISSA: u32 = 0x8000;

/// Largest mantissa (sign bit clear)
const MAX_MANTISSA: u32 = 0x7f_ffff;

/// Mantissa sign bit
const SIGN_BIT: u64 = 0x0080_0000;

/// Target of [`asert_chainspec::MAX_BITS`]: `0xffff << 208`
pub const MAX_TARGET: U256 = U256::from_limbs([0, 0, 0, 0x0000_0000_ffff_0000]);

/// Decode a compact value into its full-width target.
///
/// Fails when the exponent exceeds `0x1d` or the mantissa lies outside
/// `[0x8000, 0x7fffff]`.
pub fn decode_compact(bits: u32) -> ConsensusResult<U256> {
    let size = bits >> 24;
    if size > MAX_COMPACT_SIZE {
        return Err(ConsensusError::MalformedCompact { bits, reason: "exponent above 0x1d" });
    }

    let word = bits & 0x00ff_ffff;
    if !(MIN_MANTISSA..=MAX_MANTISSA).contains(&word) {
        return Err(ConsensusError::MalformedCompact {
            bits,
            reason: "mantissa outside [0x8000, 0x7fffff]",
        });
    }

    let word = U256::from(word);
    Ok(if size <= 3 { word >> (8 * (3 - size) as usize) } else { word << (8 * (size - 3) as usize) })
}

/// Encode a target, clamping anything above [`MAX_TARGET`]
pub fn encode_compact(target: U256) -> ConsensusResult<u32> {
    encode_compact_clamped(target).map(|(bits, _)| bits)
}

/// Encode a target and report whether it had to be clamped to the ceiling.
///
/// Clamping emits a warning and is otherwise not an error. A zero target is.
pub fn encode_compact_clamped(target: U256) -> ConsensusResult<(u32, bool)> {
    if target.is_zero() {
        return Err(ConsensusError::NonPositiveTarget);
    }

    let clamped = target > MAX_TARGET;
    let target = if clamped {
        warn!(
            target: "asert::consensus",
            requested = %target,
            ceiling = %MAX_TARGET,
            "Target went above maximum, clamping"
        );
        MAX_TARGET
    } else {
        target
    };

    let mut size = target.bit_len().div_ceil(8);
    let mut compact = if size <= 3 {
        low_u64(target) << (8 * (3 - size))
    } else {
        low_u64(target >> (8 * (size - 3)))
    };

    // Keep the sign bit clear by moving one byte into the exponent
    if compact & SIGN_BIT != 0 {
        compact >>= 8;
        size += 1;
    }
    debug_assert_eq!(compact & !u64::from(MAX_MANTISSA), 0);

    Ok((compact as u32 | (size as u32) << 24, clamped))
}

/// Expected work of a block at `bits`: `floor(2^256 / (target + 1))`
pub fn compact_to_work(bits: u32) -> ConsensusResult<U256> {
    let target = decode_compact(bits)?;
    let numerator = U512::from_limbs([0, 0, 0, 0, 1, 0, 0, 0]);
    let work = numerator / (widen(target) + U512::from(1u64));
    narrow(work).ok_or(ConsensusError::WorkOverflow { bits })
}

/// Expected number of hashes to find a block at `target`: `2^256 / target`
pub fn expected_hashes(target: U256) -> ConsensusResult<U512> {
    if target.is_zero() {
        return Err(ConsensusError::NonPositiveTarget);
    }
    Ok(U512::from_limbs([0, 0, 0, 0, 1, 0, 0, 0]) / widen(target))
}

/// Difficulty relative to [`MAX_TARGET`], as a float
pub fn difficulty(target: U256) -> f64 {
    to_f64(MAX_TARGET.as_limbs()) / to_f64(target.as_limbs())
}

/// Lossy conversion of a target to `f64`
pub fn target_to_f64(target: U256) -> f64 {
    to_f64(target.as_limbs())
}

/// Lossy conversion of a 512-bit value to `f64`
pub fn wide_to_f64(value: U512) -> f64 {
    to_f64(value.as_limbs())
}

fn to_f64(limbs: &[u64]) -> f64 {
    limbs.iter().rev().fold(0.0, |acc, &limb| acc * 18_446_744_073_709_551_616.0 + limb as f64)
}

fn low_u64(value: U256) -> u64 {
    value.as_limbs()[0]
}

/// Zero-extend a target to 512 bits
pub(crate) fn widen(value: U256) -> U512 {
    let l = value.as_limbs();
    U512::from_limbs([l[0], l[1], l[2], l[3], 0, 0, 0, 0])
}

/// Truncate a 512-bit value back to 256 bits, `None` if it does not fit
pub(crate) fn narrow(value: U512) -> Option<U256> {
    let l = value.as_limbs();
    if l[4..].iter().any(|&limb| limb != 0) {
        return None;
    }
    Some(U256::from_limbs([l[0], l[1], l[2], l[3]]))
}
