//! Hashrate allocation
//!
//! Total hashrate on the simulated chain is the sum of four groups:
//! - steady miners, always present
//! - a scenario's ramp miners, who may add or withdraw a fixed amount
//! - variable miners, split by recent revenue with a hysteresis term
//! - greedy miners, all in or all out

use asert_chainspec::SimParams;
use asert_primitives::BlockState;
use tracing::debug;

use crate::{MiningError, MiningResult};

/// Scenario-driven forces on the hashrate
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct HashratePressure {
    /// Signed hashrate added by a difficulty-ramp attacker (PH/s)
    pub ramp_hashrate: f64,
    /// Timestamp gap over the pump span that triggers a variable-miner
    /// influx. Zero disables the detector.
    pub pump_threshold: i64,
}

/// Outcome of one allocation step
#[derive(Debug, Clone, PartialEq)]
pub struct HashrateAllocation {
    /// Total hashrate (PH/s)
    pub hashrate: f64,
    /// Share of variable miners on this chain, in `[0, 1]`
    pub var_frac: f64,
    /// Updated hysteresis accumulator
    pub memory_frac: f64,
    /// Greedy miners present, `0.0` or `1.0`
    pub greedy_frac: f64,
    /// Greedy join/leave messages
    pub events: Vec<String>,
}

/// Miner population of a run
#[derive(Debug, Clone, PartialEq)]
pub struct HashrateModel {
    steady_hashrate: f64,
    variable_hashrate: f64,
    variable_pct: f64,
    variable_window: usize,
    variable_exponent: f64,
    memory_gain: f64,
    greedy_hashrate: f64,
    greedy_pct: f64,
    greedy_window: usize,
    pump_lookback: usize,
    pump_span: usize,
}

impl HashrateModel {
    /// Create a model from the run parameters
    pub fn from_params(params: &SimParams) -> Self {
        Self {
            steady_hashrate: params.steady_hashrate,
            variable_hashrate: params.variable_hashrate,
            variable_pct: params.variable_pct,
            variable_window: params.variable_window,
            variable_exponent: params.variable_exponent,
            memory_gain: params.memory_gain,
            greedy_hashrate: params.greedy_hashrate,
            greedy_pct: params.greedy_pct,
            greedy_window: params.greedy_window,
            pump_lookback: params.pump_lookback,
            pump_span: params.pump_span,
        }
    }

    /// Blocks of history [`Self::next_hashrate`] reads under `pressure`
    pub fn required_history(&self, pressure: &HashratePressure) -> usize {
        let pump = if pressure.pump_threshold > 0 { self.pump_lookback + 1 } else { 1 };
        self.variable_window.max(self.greedy_window).max(pump)
    }

    /// Allocate hashrate for the block after `history`
    pub fn next_hashrate(
        &self,
        history: &[BlockState],
        pressure: &HashratePressure,
    ) -> MiningResult<HashrateAllocation> {
        let need = self.required_history(pressure);
        let Some(last) = history.last().filter(|_| history.len() >= need) else {
            return Err(MiningError::InsufficientHistory { need, have: history.len() });
        };

        let (var_frac, memory_frac) = self.variable_share(history, last);
        let var_frac = if self.pump_detected(history, pressure) { var_frac.max(0.25) } else { var_frac };

        let mut events = Vec::new();
        let greedy_frac = self.greedy_share(history, last, &mut events);

        let hashrate = self.steady_hashrate +
            pressure.ramp_hashrate +
            self.variable_hashrate * var_frac +
            self.greedy_hashrate * greedy_frac;
        if !(hashrate.is_finite() && hashrate > 0.0) {
            return Err(MiningError::InvalidHashrate);
        }

        Ok(HashrateAllocation { hashrate, var_frac, memory_frac, greedy_frac, events })
    }

    /// Linear share between `1 +- pct`, plus the accumulated memory term
    fn variable_share(&self, history: &[BlockState], last: &BlockState) -> (f64, f64) {
        let high = 1.0 + self.variable_pct / 100.0;
        let scale = 50.0 / self.variable_pct;
        let mean = mean_rev_ratio(history, self.variable_window);

        let raw = (high - mean.powf(self.variable_exponent)) * scale;
        let memory_frac = last.memory_frac + (raw - 0.5) * self.memory_gain;
        ((raw + memory_frac).clamp(0.0, 1.0), memory_frac)
    }

    fn pump_detected(&self, history: &[BlockState], pressure: &HashratePressure) -> bool {
        if pressure.pump_threshold <= 0 {
            return false;
        }
        let start = history.len() - 1 - self.pump_lookback;
        history[start + self.pump_span].timestamp - history[start].timestamp > pressure.pump_threshold
    }

    /// Bang-bang switch: leave at `>= 1 + pct`, join at `<= 1 - pct`, hold
    /// in between
    fn greedy_share(&self, history: &[BlockState], last: &BlockState, events: &mut Vec<String>) -> f64 {
        let mean = mean_rev_ratio(history, self.greedy_window);
        let margin = self.greedy_pct / 100.0;

        if mean >= 1.0 + margin {
            if last.greedy_frac != 0.0 {
                debug!(target: "asert::miner", height = last.height + 1, mean, "Greedy miners left");
                events.push("Greedy miners left".to_string());
            }
            0.0
        } else if mean <= 1.0 - margin {
            if last.greedy_frac != 1.0 {
                debug!(target: "asert::miner", height = last.height + 1, mean, "Greedy miners joined");
                events.push("Greedy miners joined".to_string());
            }
            1.0
        } else {
            last.greedy_frac
        }
    }
}

/// Mean revenue ratio of the trailing `window` blocks
fn mean_rev_ratio(history: &[BlockState], window: usize) -> f64 {
    let tail = &history[history.len() - window..];
    tail.iter().map(|state| state.rev_ratio).sum::<f64>() / window as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::U256;

    fn state(height: u64, timestamp: i64, rev_ratio: f64) -> BlockState {
        BlockState {
            height,
            wall_time: timestamp,
            timestamp,
            bits: 0x1808_4bb7,
            chainwork: U256::from(height),
            fx: 0.19,
            hashrate: 1000.0,
            rev_ratio,
            var_frac: 0.5,
            memory_frac: 0.0,
            greedy_frac: 0.0,
            msg: String::new(),
        }
    }

    fn steady_history(len: usize, rev_ratio: f64) -> Vec<BlockState> {
        (0..len).map(|i| state(i as u64, 600 * i as i64, rev_ratio)).collect()
    }

    #[test]
    fn test_break_even_splits_variable_miners() {
        let model = HashrateModel::from_params(&SimParams::default());
        let history = steady_history(10, 1.0);

        let alloc = model.next_hashrate(&history, &HashratePressure::default()).unwrap();
        assert!((alloc.var_frac - 0.5).abs() < 1e-12);
        assert!(alloc.memory_frac.abs() < 1e-12);
        assert_eq!(alloc.greedy_frac, 0.0);
        assert!((alloc.hashrate - 1300.0).abs() < 1e-9);
        assert!(alloc.events.is_empty());
    }

    #[test]
    fn test_memory_accumulates() {
        let model = HashrateModel::from_params(&SimParams::default());
        let mut history = steady_history(10, 0.97);

        // raw share (1.15 - 0.97) * 50 / 15 = 0.6
        let first = model.next_hashrate(&history, &HashratePressure::default()).unwrap();
        assert!((first.memory_frac - 0.001).abs() < 1e-9);

        history.last_mut().unwrap().memory_frac = first.memory_frac;
        let second = model.next_hashrate(&history, &HashratePressure::default()).unwrap();
        assert!((second.memory_frac - 0.002).abs() < 1e-9);
        assert!(second.var_frac > first.var_frac);
    }

    #[test]
    fn test_variable_share_is_clamped() {
        let model = HashrateModel::from_params(&SimParams::default());

        let alloc = model.next_hashrate(&steady_history(10, 0.5), &HashratePressure::default()).unwrap();
        assert_eq!(alloc.var_frac, 1.0);

        let alloc = model.next_hashrate(&steady_history(10, 1.5), &HashratePressure::default()).unwrap();
        assert_eq!(alloc.var_frac, 0.0);
    }

    #[test]
    fn test_greedy_deadband() {
        let model = HashrateModel::from_params(&SimParams::default());
        let mut greedy = 0.0;
        let mut flips = Vec::new();

        for (step, ratio) in [1.20, 1.00, 0.80, 1.00, 1.20].into_iter().enumerate() {
            let mut history = steady_history(10, ratio);
            history.last_mut().unwrap().greedy_frac = greedy;

            let alloc = model.next_hashrate(&history, &HashratePressure::default()).unwrap();
            if alloc.greedy_frac != greedy {
                flips.push((step, alloc.greedy_frac, alloc.events.clone()));
            }
            greedy = alloc.greedy_frac;
        }

        assert_eq!(
            flips,
            vec![
                (2, 1.0, vec!["Greedy miners joined".to_string()]),
                (4, 0.0, vec!["Greedy miners left".to_string()]),
            ]
        );
    }

    #[test]
    fn test_ramp_hashrate_added() {
        let model = HashrateModel::from_params(&SimParams::default());
        let history = steady_history(10, 1.0);

        let pressure = HashratePressure { ramp_hashrate: 100.0, pump_threshold: 0 };
        let alloc = model.next_hashrate(&history, &pressure).unwrap();
        assert!((alloc.hashrate - 1400.0).abs() < 1e-9);

        let pressure = HashratePressure { ramp_hashrate: -50.0, pump_threshold: 0 };
        let alloc = model.next_hashrate(&history, &pressure).unwrap();
        assert!((alloc.hashrate - 1250.0).abs() < 1e-9);
    }

    #[test]
    fn test_pump_forces_minimum_share() {
        let model = HashrateModel::from_params(&SimParams::default());
        let pressure = HashratePressure { ramp_hashrate: 0.0, pump_threshold: 8000 };

        // Variable miners have left entirely
        let mut history = steady_history(200, 1.5);
        let alloc = model.next_hashrate(&history, &pressure).unwrap();
        assert_eq!(alloc.var_frac, 0.0);

        // Stretch the five blocks that start 144 blocks before the tip
        let start = history.len() - 1 - 144;
        for state in &mut history[start + 1..] {
            state.timestamp += 6000;
        }
        let alloc = model.next_hashrate(&history, &pressure).unwrap();
        assert_eq!(alloc.var_frac, 0.25);
    }

    #[test]
    fn test_insufficient_history() {
        let model = HashrateModel::from_params(&SimParams::default());
        let err = model.next_hashrate(&steady_history(3, 1.0), &HashratePressure::default()).unwrap_err();
        assert_eq!(err, MiningError::InsufficientHistory { need: 6, have: 3 });

        let pump = HashratePressure { ramp_hashrate: 0.0, pump_threshold: 8000 };
        assert_eq!(model.required_history(&pump), 145);
        assert!(model.next_hashrate(&steady_history(100, 1.0), &pump).is_err());
    }

    #[test]
    fn test_withdrawn_hashrate_must_stay_positive() {
        let params = SimParams { steady_hashrate: 10.0, ..Default::default() };
        let model = HashrateModel::from_params(&params);
        let pressure = HashratePressure { ramp_hashrate: -100.0, pump_threshold: 0 };

        let err = model.next_hashrate(&steady_history(10, 1.5), &pressure).unwrap_err();
        assert_eq!(err, MiningError::InvalidHashrate);
    }
}
