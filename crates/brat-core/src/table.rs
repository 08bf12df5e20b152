//! Reach attribute tables on disk.
//!
//! Two layouts are accepted: a JSON object keyed by reach id
//! (`{"12": {"iVeg_30EX": 3.1, ...}}`) and a CSV file with a `ReachID`
//! column.  Non-numeric cells are dropped, so a reach missing a usable value
//! fails later in [`crate::reach::ingest`] with the field name.
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde_json::Value;

use crate::error::{BratError, Result};

pub type AttributeTable = BTreeMap<i64, BTreeMap<String, f64>>;

pub const REACH_ID_COLUMN: &str = "ReachID";

/// Read a `.json` or `.csv` table, chosen by extension.
pub fn read_table(path: &Path) -> Result<AttributeTable> {
    let err = |e: &dyn std::fmt::Display| BratError::Table(format!("{}: {e}", path.display()));
    let file = File::open(path).map_err(|e| err(&e))?;
    match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
        Some("json") => from_json_reader(file),
        Some("csv") => from_csv_reader(file),
        other => Err(err(&format!("unsupported table format {other:?}, expected .json or .csv"))),
    }
}

fn parse_id(raw: &str) -> Result<i64> {
    let raw = raw.trim();
    if let Ok(id) = raw.parse::<i64>() {
        return Ok(id);
    }
    // Exported attribute tables sometimes write integer ids as `12.0`.
    match raw.parse::<f64>() {
        Ok(f) if f.is_finite() && f.fract() == 0.0 => Ok(f as i64),
        _ => Err(BratError::Table(format!("`{raw}` is not a reach id"))),
    }
}

pub fn from_json_reader<R: Read>(reader: R) -> Result<AttributeTable> {
    let raw: BTreeMap<String, BTreeMap<String, Value>> =
        serde_json::from_reader(reader).map_err(|e| BratError::Table(e.to_string()))?;
    raw.into_iter()
        .map(|(id, attrs)| {
            let attrs = attrs.into_iter().filter_map(|(k, v)| v.as_f64().map(|v| (k, v))).collect();
            Ok((parse_id(&id)?, attrs))
        })
        .collect()
}

pub fn from_csv_reader<R: Read>(reader: R) -> Result<AttributeTable> {
    let mut rdr = csv::Reader::from_reader(reader);
    let headers = rdr.headers().map_err(|e| BratError::Table(e.to_string()))?.clone();
    let id_col = headers
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case(REACH_ID_COLUMN))
        .ok_or_else(|| BratError::Table(format!("no `{REACH_ID_COLUMN}` column")))?;

    let mut table = AttributeTable::new();
    for record in rdr.records() {
        let record = record.map_err(|e| BratError::Table(e.to_string()))?;
        let id = parse_id(record.get(id_col).unwrap_or_default())?;
        let attrs = headers
            .iter()
            .zip(record.iter())
            .enumerate()
            .filter(|(i, _)| *i != id_col)
            .filter_map(|(_, (h, cell))| cell.trim().parse::<f64>().ok().map(|v| (h.trim().to_string(), v)))
            .collect();
        if table.insert(id, attrs).is_some() {
            return Err(BratError::Table(format!("reach {id} appears twice")));
        }
    }
    Ok(table)
}
