//! Shared-history runner
//!
//! Call sites that reuse one history take turns: a run holds the lock from
//! clearing the history until the trimmed result is copied out. The guard is
//! scoped to the call, so errors and panics release it too.

use std::sync::Arc;

use asert_primitives::BlockState;
use parking_lot::Mutex;

use crate::{RunConfig, SimError, SimResult, SimulationContext};

/// A [`SimulationContext`] shared between call sites
#[derive(Debug, Clone)]
pub struct SharedSimulation {
    inner: Arc<Mutex<SimulationContext>>,
}

impl SharedSimulation {
    /// Share `context`
    pub fn new(context: SimulationContext) -> Self {
        Self { inner: Arc::new(Mutex::new(context)) }
    }

    /// Run `config`, waiting for any run in progress to finish
    pub fn run(&self, config: &RunConfig) -> SimResult<Vec<BlockState>> {
        self.inner.lock().run(config)
    }

    /// Run `config`, or fail with [`SimError::Busy`] if a run is in progress
    pub fn try_run(&self, config: &RunConfig) -> SimResult<Vec<BlockState>> {
        let mut context = self.inner.try_lock().ok_or(SimError::Busy)?;
        context.run(config)
    }

    /// Inter-block times of a run of `config`
    pub fn run_block_times(&self, config: &RunConfig) -> SimResult<Vec<i64>> {
        self.inner.lock().run_block_times(config)
    }

    /// Length of the shared history, prefix included
    pub fn history_len(&self) -> usize {
        self.inner.lock().history().len()
    }

    /// Run `f` with exclusive access to the context
    pub fn with_context<T>(&self, f: impl FnOnce(&mut SimulationContext) -> T) -> T {
        f(&mut self.inner.lock())
    }
}
