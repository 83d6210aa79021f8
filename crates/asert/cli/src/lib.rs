//! ASERT simulator CLI utilities
//!
//! Provides registry-key parsing, the CSV projection of block states and
//! block-time statistics for the `asert-sim` binary.

#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod parser;
pub mod report;
pub mod stats;

pub use parser::{algorithm_value_parser, scenario_value_parser};
pub use report::{CSV_HEADER, csv_row};
pub use stats::{BlockTimeStats, Spread, describe};
