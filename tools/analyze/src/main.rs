//! How often do hydrology and slope limit vegetation capacity across a
//! network?  Evaluates a reach table and prints the limitation breakdown plus
//! capacity histograms.

use std::fs;
use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use brat_core::analysis::{histogram, limitation_report, Bin, LimitationReport};
use brat_core::{ingest, read_table, CapacityConfig, CapacityModel, Epoch, ReachCapacity};
use clap::Parser;
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "analyze", about = "Summarize hydrology limitation and capacity distributions of a network")]
struct Args {
    /// Reach attributes: .json keyed by reach id, or .csv with a ReachID column.
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long, default_value = "existing")]
    epoch: Epoch,

    /// CapacityConfig JSON applied before evaluation.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Histogram bins per column.
    #[arg(short, long, default_value_t = 10)]
    bins: usize,

    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Analysis {
    limitation: LimitationReport,
    vegetation: Vec<Bin>,
    combined: Vec<Bin>,
    dam_count: Vec<Bin>,
}

// ── Output ────────────────────────────────────────────────────────────────────

fn print_report(report: &LimitationReport) {
    println!(
        "{} of {} reaches ({:.2}%) are limited by hydrology or slope",
        report.limited, report.total, report.percent_limited
    );
    for breakdown in &report.by_variable {
        println!("\n{}", breakdown.variable);
        println!("  {:<22} {:>8} {:>8}", "Class", "Reaches", "Limited");
        for c in &breakdown.classes {
            println!("  {:<22} {:>8} {:>8}", c.class.label, c.reaches, c.limited);
        }
    }
}

fn print_histogram(title: &str, bins: &[Bin]) {
    println!("\n{title}");
    let widest = bins.iter().map(|b| b.count).max().unwrap_or(0).max(1);
    for b in bins {
        let bar = "#".repeat(b.count * 40 / widest);
        println!("  [{:>7.2}, {:>7.2}) {:>7} {bar}", b.lower, b.upper, b.count);
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let config: CapacityConfig = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?
        }
        None => CapacityConfig::default(),
    };
    let model = CapacityModel::new(&config).context("building capacity model")?;
    let reaches = ingest(&read_table(&args.input)?, args.epoch)?;
    let results = model.run(&reaches);
    info!(reaches = reaches.len(), "evaluated");

    let column = |f: fn(&ReachCapacity) -> f64| results.iter().map(f).collect::<Vec<_>>();
    let analysis = Analysis {
        limitation: limitation_report(&reaches, &results),
        vegetation: histogram(&column(|r| r.vegetation), args.bins),
        combined: histogram(&column(|r| r.combined), args.bins),
        dam_count: histogram(&column(|r| r.dam_count), args.bins),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&analysis)?);
        return Ok(());
    }
    print_report(&analysis.limitation);
    print_histogram("Vegetation capacity (dams/km)", &analysis.vegetation);
    print_histogram("Combined capacity (dams/km)", &analysis.combined);
    print_histogram("Dam count", &analysis.dam_count);
    Ok(())
}
