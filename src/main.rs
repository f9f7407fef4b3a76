//! Gridlife - headless runner
//!
//! Loads a TOML configuration (or the built-in defaults), runs a number of
//! ticks and logs population statistics along the way.

use std::path::PathBuf;

use clap::Parser;
use gridlife::core::error::Result;
use gridlife::simulation::population::PopulationFile;
use gridlife::{Simulation, SimulationConfig};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "gridlife")]
#[command(about = "Run a grid agent simulation headless and report statistics")]
struct Args {
    /// TOML configuration file; defaults are used when omitted
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Number of ticks to run
    #[arg(long, default_value_t = 1000)]
    ticks: u64,

    /// Override the configured random seed
    #[arg(long)]
    seed: Option<u64>,

    /// Number of agent types when running without a config file
    #[arg(long, default_value_t = 2)]
    types: usize,

    /// Log statistics every N ticks
    #[arg(long, default_value_t = 100)]
    report_every: u64,

    /// Load agents from a population file before running
    #[arg(long)]
    import: Option<PathBuf>,

    /// Write the final population to this file
    #[arg(long)]
    export: Option<PathBuf>,

    /// Print the final statistics as JSON on stdout
    #[arg(long)]
    json: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gridlife=info")),
        )
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_toml_file(path)?,
        None => SimulationConfig::with_agent_types(args.types),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    let mut sim = match &args.import {
        Some(path) => {
            let mut sim = Simulation::empty(config)?;
            let file = PopulationFile::load_from_file(path)?;
            sim.import_population_file(file)?;
            sim
        }
        None => Simulation::new(config)?,
    };

    let report_every = args.report_every.max(1);
    for _ in 0..args.ticks {
        sim.tick()?;
        if sim.current_tick() % report_every == 0 {
            let stats = sim.stats();
            info!(
                tick = stats.tick,
                agents = ?stats.agents,
                sick = ?stats.sick,
                food = stats.food_cells,
                products = stats.products,
                avg_energy = stats.average_energy,
                "progress"
            );
        }
        if sim.agent_count() == 0 {
            warn!(tick = sim.current_tick(), "population died out");
            break;
        }
    }

    let stats = sim.stats();
    info!(
        tick = stats.tick,
        agents = stats.total_agents(),
        sick = stats.total_sick(),
        "run finished"
    );

    if let Some(path) = &args.export {
        sim.export_population_file()?.save_to_file(path)?;
        info!(path = %path.display(), "population exported");
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&stats)?);
    }
    Ok(())
}
