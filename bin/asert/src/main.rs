//! ASERT Retarget Simulator
//!
//! Runs mining simulations against a chosen retarget algorithm and scenario.
//! A single run writes one CSV row per block to stdout; block-time statistics
//! go to the log on stderr.
//!
//! Usage:
//!   asert-sim -a aserti3-mo3-416 -s dr100 -r 42 -n 20

#![allow(missing_docs)]

use std::{
    io::Write,
    path::PathBuf,
    time::{SystemTime, UNIX_EPOCH},
};

use asert_chainspec::SimParams;
use asert_cli::{
    BlockTimeStats, CSV_HEADER, algorithm_value_parser, csv_row, describe,
    parser::{DEFAULT_ALGORITHM, DEFAULT_SCENARIO},
    scenario_value_parser,
};
use asert_sim::{AlgorithmDescriptor, RunConfig, ScenarioDescriptor, SimulationContext, block_times};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// ASERT retarget simulator
#[derive(Debug, Parser)]
#[command(name = "asert-sim")]
#[command(about = "Run a mining simulation")]
struct Args {
    /// Algorithm choice
    #[arg(short = 'a', long = "algo", value_parser = algorithm_value_parser, default_value = DEFAULT_ALGORITHM)]
    algorithm: &'static AlgorithmDescriptor,

    /// Scenario choice
    #[arg(short = 's', long, value_parser = scenario_value_parser, default_value = DEFAULT_SCENARIO)]
    scenario: &'static ScenarioDescriptor,

    /// Random seed (defaults to the current unix time)
    #[arg(short = 'r', long)]
    seed: Option<u64>,

    /// Count of simulations to run, with consecutive seeds
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u64,

    /// Number of blocks per simulation (overrides the config file)
    #[arg(long)]
    blocks: Option<u64>,

    /// TOML file of simulation parameters
    #[arg(long, env = "ASERT_SIM_CONFIG")]
    config: Option<PathBuf>,
}

fn main() -> eyre::Result<()> {
    // Logs go to stderr so the CSV on stdout stays clean
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let args = Args::parse();
    let count = args.count.max(1);

    let mut params = match &args.config {
        Some(path) => SimParams::from_file(path)?,
        None => SimParams::default(),
    };
    if let Some(blocks) = args.blocks {
        params = params.with_num_blocks(blocks);
    }

    let seed = match args.seed {
        Some(seed) => seed,
        None => SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs(),
    };
    info!(target: "asert::cli", seed, count, "Starting seed {seed} for {count} simuls");

    #[allow(unused_mut)]
    let mut context = SimulationContext::new(params)?;
    #[cfg(feature = "native-oracle")]
    {
        context = context.with_oracle(Box::new(asert_consensus::NativeOracle));
    }

    let config = RunConfig { algorithm: args.algorithm, scenario: args.scenario, seed };
    let mut stdout = std::io::stdout().lock();
    let (mut means, mut std_devs, mut medians, mut maxs) = (Vec::new(), Vec::new(), Vec::new(), Vec::new());

    for run in 0..count {
        let states = context.run(&config.with_seed(seed.wrapping_add(run)))?;

        if count == 1 {
            writeln!(stdout, "{CSV_HEADER}")?;
            let mut parent = &context.history()[context.params().prefix_blocks - 1];
            for state in &states {
                writeln!(stdout, "{}", csv_row(state, parent)?)?;
                parent = state;
            }
        }

        match BlockTimeStats::from_block_times(&block_times(&states)) {
            Some(stats) => {
                means.push(stats.mean);
                std_devs.push(stats.std_dev);
                medians.push(stats.median as f64);
                maxs.push(stats.max as f64);
            }
            None => warn!(target: "asert::cli", blocks = states.len(), "Too few blocks for statistics"),
        }
    }

    for (label, values) in [
        ("Mean   block time", &means),
        ("StdDev block time", &std_devs),
        ("Median block time", &medians),
        ("Max    block time", &maxs),
    ] {
        if !values.is_empty() {
            info!(target: "asert::cli", "{}", describe(label, values));
        }
    }

    Ok(())
}
