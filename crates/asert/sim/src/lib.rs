//! ASERT retarget simulator
//!
//! Runs a chosen retarget algorithm against a chosen hashrate and
//! exchange-rate scenario and records one [`BlockState`] per block.
//!
//! ```text
//! registry ──► RunConfig ──► SimulationContext::run
//!                              │
//!                              ├─ seed warm-up prefix
//!                              ├─ draw fx jump schedule
//!                              └─ advance × num_blocks
//!                                   ├─ hashrate allocation
//!                                   ├─ next bits (engine or oracle)
//!                                   ├─ arrival time + timestamp
//!                                   └─ fx update, revenue, chainwork
//! ```

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod context;
pub mod error;
pub mod registry;
pub mod scenario;
pub mod shared;

pub use asert_primitives::{BlockState, block_times};
pub use context::{RunConfig, SimulationContext};
pub use error::{SimError, SimResult};
pub use registry::{Algorithm, AlgorithmDescriptor, ScenarioDescriptor};
pub use scenario::{FxJumpSchedule, FxUpdate};
pub use shared::SharedSimulation;
