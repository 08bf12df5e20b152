//! Monte Carlo sensitivity runs of the dam capacity model, recorded to SQLite.

mod store;

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use brat_core::sensitivity::InputDistributions;
use brat_core::{MonteCarlo, SensitivityConfig};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use store::SqliteSink;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "montecarlo", about = "Sample adjusted capacity models and record every simulation")]
struct Args {
    /// SensitivityConfig JSON; built-in defaults when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// SQLite database the runs are appended to.
    #[arg(short, long, default_value = "data/montecarlo.db")]
    db: PathBuf,

    #[arg(long)]
    name: Option<String>,

    #[arg(short = 'n', long)]
    n_simulations: Option<usize>,

    /// Synthetic reaches per simulation.
    #[arg(short = 'r', long)]
    n_reaches: Option<usize>,

    #[arg(short, long)]
    seed: Option<u64>,

    /// Sample inputs uniformly over their ranges instead of the fitted distributions.
    #[arg(long)]
    uniform_inputs: bool,

    /// Reuse one reach population across all simulations.
    #[arg(long)]
    shared_population: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,
}

fn load_config(args: &Args) -> Result<SensitivityConfig> {
    let mut config: SensitivityConfig = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => SensitivityConfig::default(),
    };
    if let Some(name) = &args.name {
        config.name = name.clone();
    }
    if let Some(n) = args.n_simulations {
        config.n_simulations = n;
    }
    if let Some(n) = args.n_reaches {
        config.n_reaches = n;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if args.uniform_inputs {
        config.inputs = InputDistributions::uniform();
    }
    config.shared_population |= args.shared_population;
    Ok(config)
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();
    let config = load_config(&args)?;

    if args.print_config {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let mc = MonteCarlo::configure(config).context("invalid sensitivity configuration")?;
    for (variable, dist) in mc.config().inputs.iter() {
        info!(%variable, distribution = %dist, "input distribution");
    }
    for slot in &mc.config().slots {
        info!(slot = %slot.name(), distribution = %slot.distribution, "adjustment slot");
    }

    let mut sink = SqliteSink::open(&args.db).with_context(|| format!("opening {}", args.db.display()))?;
    let summary = mc.run(&mut sink)?;
    info!(
        db = %args.db.display(),
        sim_id = ?sink.sim_id(),
        simulations = summary.n_simulations,
        elapsed_s = (summary.finished - summary.started).num_milliseconds() as f64 / 1000.0,
        "recorded"
    );
    Ok(())
}
