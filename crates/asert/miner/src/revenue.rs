//! Relative profitability of the two chains

use alloy_primitives::U256;
use asert_chainspec::SimParams;
use asert_consensus::compact::{decode_compact, target_to_f64};
use rand::Rng;

use crate::MiningResult;

/// Revenue comparison between the simulated chain and the competing chain
#[derive(Debug, Clone, PartialEq)]
pub struct RevenueModel {
    /// Fixed target of the competing chain, as a float
    competing_target: f64,
    block_reward: f64,
    competing_fees: f64,
    local_fees: f64,
}

impl RevenueModel {
    /// Create a model from the run parameters
    pub fn from_params(params: &SimParams) -> MiningResult<Self> {
        let competing_target = target_to_f64(decode_compact(params.initial_swc_bits)?);
        Ok(Self {
            competing_target,
            block_reward: params.block_reward,
            competing_fees: params.btc_fees,
            local_fees: params.bch_fees,
        })
    }

    /// Competing-chain revenue rate over simulated-chain revenue rate.
    ///
    /// Below 1.0 the simulated chain at `target` pays better. Draws one fee
    /// perturbation for the competing chain, then one for the simulated chain.
    pub fn revenue_ratio<R: Rng + ?Sized>(&self, fx: f64, target: U256, rng: &mut R) -> f64 {
        let competing_revenue = self.block_reward + self.competing_fees * rng.random::<f64>();
        let local_revenue = (self.block_reward + self.local_fees * rng.random::<f64>()) * fx;

        let difficulty_ratio = target_to_f64(target) / self.competing_target;
        competing_revenue / difficulty_ratio / local_revenue
    }
}
