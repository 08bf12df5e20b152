//! Evaluate vegetation and combined dam capacity for every reach in an
//! attribute table and write `oVC_*`, `oCC_*` and `mCC_*_CT` per reach.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use brat_core::{ingest, read_table, CapacityConfig, CapacityModel, Epoch, InputVariable, ReachCapacity};
use clap::{Parser, ValueEnum};
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Json,
    Csv,
}

#[derive(Parser, Debug)]
#[command(name = "fis", about = "Run the two-stage dam capacity model over a reach table")]
struct Args {
    /// Reach attributes: .json keyed by reach id, or .csv with a ReachID column.
    #[arg(short, long)]
    input: PathBuf,

    /// Vegetation epoch whose fields are read and written (existing | historic).
    #[arg(short, long, default_value = "existing")]
    epoch: Epoch,

    /// CapacityConfig JSON: drainage limit, exceptions and adjustments.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output file; stdout when omitted.
    #[arg(short, long)]
    output: Option<PathBuf>,

    #[arg(short, long, value_enum, default_value_t = Format::Json)]
    format: Format,

    /// Include per-reach diagnostics (clamped inputs, reclassification) in JSON output.
    #[arg(long)]
    diagnostics: bool,

    /// Also write the input membership curves, as built, to this CSV.
    #[arg(long)]
    curves: Option<PathBuf>,

    /// Sampling step for --curves, as a fraction of each domain.
    #[arg(long, default_value_t = 0.005)]
    curve_step: f64,
}

// ── Output ────────────────────────────────────────────────────────────────────

fn write_json(out: &mut dyn Write, epoch: Epoch, results: &[ReachCapacity], diagnostics: bool) -> Result<()> {
    let table: BTreeMap<String, Value> = results
        .iter()
        .map(|r| {
            let mut row = Map::new();
            row.insert(epoch.vegetation_capacity_field(), json!(r.vegetation));
            row.insert(epoch.combined_capacity_field(), json!(r.combined));
            row.insert(epoch.dam_count_field(), json!(r.dam_count));
            if diagnostics {
                row.insert("diagnostics".into(), json!(r.diagnostics));
            }
            (r.reach_id.to_string(), Value::Object(row))
        })
        .collect();
    serde_json::to_writer_pretty(&mut *out, &table)?;
    writeln!(out)?;
    Ok(())
}

fn write_csv(out: &mut dyn Write, epoch: Epoch, results: &[ReachCapacity]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(out);
    wtr.write_record([
        "ReachID".to_string(),
        epoch.vegetation_capacity_field(),
        epoch.combined_capacity_field(),
        epoch.dam_count_field(),
        "DrainageGated".to_string(),
        "Clamped".to_string(),
    ])?;
    for r in results {
        let clamped: Vec<&str> = r.diagnostics.clamped.iter().map(|v| v.as_str()).collect();
        wtr.write_record([
            r.reach_id.to_string(),
            r.vegetation.to_string(),
            r.combined.to_string(),
            r.dam_count.to_string(),
            r.diagnostics.drainage_gated().to_string(),
            clamped.join(";"),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

fn write_curves(path: &Path, model: &CapacityModel, step_fraction: f64) -> Result<()> {
    if !(step_fraction > 0.0 && step_fraction.is_finite()) {
        bail!("--curve-step must be a positive fraction of the domain, got {step_fraction}");
    }
    let mut wtr = csv::Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;
    wtr.write_record(["variable", "x", "category", "membership"])?;
    for v in InputVariable::ALL {
        let var = model.input_variable(v);
        let step = (var.domain.max - var.domain.min) * step_fraction;
        for (x, memberships) in var.sample(step) {
            for (cat, mu) in var.categories.iter().zip(memberships) {
                wtr.write_record([v.as_str().to_string(), x.to_string(), cat.name.to_string(), mu.to_string()])?;
            }
        }
    }
    wtr.flush()?;
    info!(path = %path.display(), "wrote membership curves");
    Ok(())
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
    for (variable, gaps) in model.coverage_gaps() {
        warn!(%variable, ?gaps, "adjusted input leaves parts of its domain uncovered");
    }

    let table = read_table(&args.input)?;
    let reaches = ingest(&table, args.epoch)?;
    info!(reaches = reaches.len(), epoch = ?args.epoch, "evaluating");
    let results = model.run(&reaches);

    let gated = results.iter().filter(|r| r.diagnostics.drainage_gated()).count();
    let mean = |f: fn(&ReachCapacity) -> f64| results.iter().map(f).sum::<f64>() / results.len().max(1) as f64;
    info!(
        gated,
        mean_vegetation = mean(|r| r.vegetation),
        mean_combined = mean(|r| r.combined),
        total_dams = results.iter().map(|r| r.dam_count).sum::<f64>(),
        "evaluation complete"
    );

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(File::create(path).with_context(|| format!("creating {}", path.display()))?),
        None => Box::new(io::stdout().lock()),
    };
    match args.format {
        Format::Json => write_json(&mut *out, args.epoch, &results, args.diagnostics)?,
        Format::Csv => write_csv(&mut *out, args.epoch, &results)?,
    }
    out.flush()?;

    if let Some(path) = &args.curves {
        write_curves(path, &model, args.curve_step)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_step_must_be_positive() {
        let model = CapacityModel::standard().unwrap();
        let path = std::env::temp_dir().join("fis-curve-step-test.csv");
        for step in [0.0, -0.1, f64::NAN] {
            assert!(write_curves(&path, &model, step).is_err(), "step {step} accepted");
        }
        assert!(write_curves(&path, &model, 0.1).is_ok());
        let _ = fs::remove_file(&path);
    }
}
