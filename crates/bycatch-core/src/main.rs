//! Porpoise Bycatch Simulation
//!
//! Command-line runner: reads the configuration, landscape and optional
//! fishing effort, runs the simulation and writes records and statistics
//! to an output directory.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use bycatch_core::gear::EffortSampler;
use bycatch_core::output::STATS_FILE_NAME;
use bycatch_core::{io, HistoricalEffort, JsonlSink, NoEffort, SimConfig, SimError, Simulation};

/// Records file name inside the output directory
const RECORDS_FILE_NAME: &str = "records.jsonl";

/// Command line arguments for the simulation
#[derive(Parser, Debug)]
#[command(name = "bycatch_sim")]
#[command(about = "Individual-based porpoise population model with gillnet bycatch")]
struct Args {
    /// Configuration file (TOML); defaults are used when absent
    #[arg(long)]
    config: Option<PathBuf>,

    /// Landscape file
    #[arg(long)]
    landscape: PathBuf,

    /// Historical haul counts; requires --effort
    #[arg(long, requires = "effort")]
    hauls: Option<PathBuf>,

    /// Soak time and net length samples; requires --hauls
    #[arg(long, requires = "hauls")]
    effort: Option<PathBuf>,

    /// Number of half-hour steps, overriding the configuration
    #[arg(long)]
    steps: Option<u64>,

    /// Random seed, overriding the configuration
    #[arg(long)]
    seed: Option<u64>,

    /// Worker threads for the agent pass, overriding the configuration
    #[arg(long)]
    threads: Option<usize>,

    /// Directory for records and statistics
    #[arg(long, default_value = "output")]
    output_dir: PathBuf,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), SimError> {
    let mut config = match &args.config {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig::load_or_default(),
    };
    if let Some(steps) = args.steps {
        config.simulation.steps = steps;
    }
    if let Some(seed) = args.seed {
        config.simulation.seed = Some(seed);
    }
    if let Some(threads) = args.threads {
        config.simulation.threads = threads;
    }

    let landscape = io::read_landscape(&args.landscape)?;
    let sampler: Box<dyn EffortSampler> = match (&args.hauls, &args.effort) {
        (Some(hauls), Some(effort)) => {
            let mut historical = HistoricalEffort::new(config.gear.sample_years);
            let zones = landscape.fishery_zones;
            let h = io::read_hauls(hauls, zones, &mut historical)?;
            let e = io::read_effort(effort, zones, &mut historical)?;
            tracing::info!(hauls = h.accepted, effort = e.accepted, "fishing effort loaded");
            Box::new(historical)
        }
        _ => {
            tracing::info!("no effort data, gear deployment disabled");
            Box::new(NoEffort)
        }
    };

    fs::create_dir_all(&args.output_dir).map_err(bycatch_core::SinkError::from)?;
    let sink = JsonlSink::create(args.output_dir.join(RECORDS_FILE_NAME))?;

    let mut simulation = Simulation::new(config, landscape)?
        .with_effort(sampler)
        .with_sink(Box::new(sink));

    let outcome = simulation.run()?;

    let stats_path = args.output_dir.join(STATS_FILE_NAME);
    simulation.stats().write(&stats_path)?;
    tracing::info!(
        ?outcome,
        population = simulation.stats().final_population,
        bycatch = simulation.stats().bycatch,
        stats = %stats_path.display(),
        "done"
    );
    Ok(())
}
