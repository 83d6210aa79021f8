//! Exchange-rate strategies of a scenario

use std::collections::BTreeMap;

use rand::{Rng, seq::IndexedRandom};

/// Per-block growth of [`FxUpdate::Ramp`], about 5.6x over 10,000 blocks
const FX_RAMP_FACTOR: f64 = 1.000_171_494_54;

/// Factors of [`FxJumpSchedule::Mild`]
const MILD_FACTORS: [f64; 4] = [0.85, 0.9, 1.1, 1.15];

/// Factors of [`FxJumpSchedule::Extreme`]
const EXTREME_FACTORS: [f64; 6] = [0.1, 0.25, 0.5, 2.0, 4.0, 10.0];

/// How the exchange rate moves from one block to the next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxUpdate {
    /// Up to a quarter percent either way per block
    RandomWalk,
    /// Unchanged
    Constant,
    /// Fixed geometric growth
    Ramp,
}

impl FxUpdate {
    /// Next exchange rate given the previous one and a uniform draw in `[0, 1)`.
    ///
    /// The draw is taken for every strategy so all scenarios consume the
    /// same random sequence.
    pub fn next_fx(&self, fx: f64, draw: f64) -> f64 {
        match self {
            Self::RandomWalk => fx * (1.0 + (draw - 0.5) / 200.0),
            Self::Constant => fx,
            Self::Ramp => fx * FX_RAMP_FACTOR,
        }
    }
}

/// Scripted one-off exchange-rate shocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FxJumpSchedule {
    /// No shocks
    None,
    /// Ten shocks of 10-15% either way
    Mild,
    /// Four shocks between 0.1x and 10x
    Extreme,
}

impl FxJumpSchedule {
    /// Draw the shocks of a run as a sparse map from block index to factor.
    ///
    /// Each shock draws its block index in `[0, num_blocks)` and then its
    /// factor. A later shock at the same index replaces the earlier one.
    pub fn generate<R: Rng + ?Sized>(&self, num_blocks: u64, rng: &mut R) -> BTreeMap<u64, f64> {
        let (count, factors): (usize, &[f64]) = match self {
            Self::None => return BTreeMap::new(),
            Self::Mild => (10, &MILD_FACTORS),
            Self::Extreme => (4, &EXTREME_FACTORS),
        };

        let mut jumps = BTreeMap::new();
        if num_blocks == 0 {
            return jumps;
        }
        for _ in 0..count {
            let index = rng.random_range(0..num_blocks);
            if let Some(&factor) = factors.choose(rng) {
                jumps.insert(index, factor);
            }
        }
        jumps
    }
}
