//! Fit sampling distributions to the model inputs of a real reach network.
//! The `--inputs` output drops straight into a sensitivity config's `inputs`.

use std::collections::BTreeMap;
use std::io;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use brat_core::sensitivity::{fit, FitReport, InputDistributions};
use brat_core::{read_table, AttributeTable, Epoch, InputVariable};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "fit", about = "Rank normal, uniform and exponential fits of each model input")]
struct Args {
    /// Reach attributes: .json keyed by reach id, or .csv with a ReachID column.
    #[arg(short, long)]
    input: PathBuf,

    #[arg(short, long, default_value = "existing")]
    epoch: Epoch,

    /// Print every ranked candidate as JSON instead of a table.
    #[arg(long, conflicts_with = "inputs")]
    json: bool,

    /// Print the best fit per input as an InputDistributions JSON block.
    #[arg(long)]
    inputs: bool,
}

/// Every finite value of `field`, matched case-insensitively.
fn column(table: &AttributeTable, field: &str) -> Vec<f64> {
    table
        .values()
        .filter_map(|attrs| attrs.iter().find(|(k, _)| k.eq_ignore_ascii_case(field)).map(|(_, v)| *v))
        .filter(|v| v.is_finite())
        .collect()
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();
    let args = Args::parse();

    let table = read_table(&args.input)?;
    info!(reaches = table.len(), "loaded reach table");

    let mut reports: BTreeMap<InputVariable, FitReport> = BTreeMap::new();
    for variable in InputVariable::ALL {
        let field = variable.field(args.epoch);
        let values = column(&table, &field);
        if values.len() < table.len() {
            warn!(%field, missing = table.len() - values.len(), "reaches without a usable value");
        }
        let report = fit(&values).with_context(|| format!("fitting {field}"))?;
        reports.insert(variable, report);
    }

    if args.json {
        let named: BTreeMap<&str, &FitReport> = reports.iter().map(|(v, r)| (v.as_str(), r)).collect();
        println!("{}", serde_json::to_string_pretty(&named)?);
        return Ok(());
    }

    if args.inputs {
        let best = |v: InputVariable| match reports.get(&v) {
            Some(r) => Ok(r.best().distribution),
            None => bail!("no fit for {v}"),
        };
        let inputs = InputDistributions {
            streamside: best(InputVariable::Streamside)?,
            riparian: best(InputVariable::Riparian)?,
            baseflow: best(InputVariable::Baseflow)?,
            peak_flow: best(InputVariable::PeakFlow)?,
            slope: best(InputVariable::Slope)?,
        };
        println!("{}", serde_json::to_string_pretty(&inputs)?);
        return Ok(());
    }

    println!("{:<14} {:>7} {:>4}  {:<36} {:>8}", "Field", "N", "Rank", "Distribution", "KS");
    println!("{}", "-".repeat(73));
    for (variable, report) in &reports {
        for (rank, c) in report.candidates.iter().enumerate() {
            let field = if rank == 0 { variable.field(args.epoch) } else { String::new() };
            println!(
                "{:<14} {:>7} {:>4}  {:<36} {:>8.4}",
                field,
                if rank == 0 { report.n.to_string() } else { String::new() },
                rank + 1,
                c.distribution.to_string(),
                c.ks_statistic
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_matches_field_names_without_case() {
        let mut table = AttributeTable::new();
        table.insert(1, [("igeo_slope".to_string(), 0.02)].into_iter().collect());
        table.insert(2, [("iGeo_Slope".to_string(), f64::NAN)].into_iter().collect());
        table.insert(3, BTreeMap::new());
        assert_eq!(column(&table, "iGeo_Slope"), vec![0.02]);
    }
}
