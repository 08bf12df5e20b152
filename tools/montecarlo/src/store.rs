//! SQLite result sink for sensitivity runs.
//!
//! One `Simulations` row per invocation; every simulation's adjustments,
//! per-reach results and aggregates hang off its `SimID`.

use std::path::Path;

use brat_core::sensitivity::{RunSummary, SimulationRun};
use brat_core::{Epoch, InputVariable, ResultSink, SensitivityConfig};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

const SCHEMA: &str = "\
    PRAGMA journal_mode=WAL;\
    PRAGMA synchronous=NORMAL;\
    CREATE TABLE IF NOT EXISTS Simulations (\
      SimID INTEGER PRIMARY KEY AUTOINCREMENT,\
      Name TEXT NOT NULL,\
      Start TEXT NOT NULL,\
      End TEXT,\
      N_simulations INTEGER NOT NULL,\
      N_samples INTEGER NOT NULL,\
      Seed INTEGER NOT NULL,\
      SharedPopulation INTEGER NOT NULL\
    );\
    CREATE TABLE IF NOT EXISTS InputDistributions (\
      SimID INTEGER NOT NULL REFERENCES Simulations(SimID),\
      Var TEXT NOT NULL,\
      Distribution TEXT NOT NULL,\
      Param1 REAL NOT NULL,\
      Param2 REAL NOT NULL\
    );\
    CREATE TABLE IF NOT EXISTS SimulationAdjustments (\
      SimID INTEGER NOT NULL REFERENCES Simulations(SimID),\
      Simulation INTEGER NOT NULL,\
      Slot TEXT NOT NULL,\
      Var TEXT NOT NULL,\
      Kind TEXT NOT NULL,\
      Value REAL NOT NULL\
    );\
    CREATE TABLE IF NOT EXISTS Results (\
      SimID INTEGER NOT NULL REFERENCES Simulations(SimID),\
      Simulation INTEGER NOT NULL,\
      ReachID INTEGER NOT NULL,\
      iVeg_30EX REAL NOT NULL,\
      iVeg100EX REAL NOT NULL,\
      iHyd_SPLow REAL NOT NULL,\
      iHyd_SP2 REAL NOT NULL,\
      iGeo_Slope REAL NOT NULL,\
      oVC_EX REAL NOT NULL,\
      oCC_EX REAL NOT NULL,\
      mCC_EX_CT REAL NOT NULL\
    );\
    CREATE TABLE IF NOT EXISTS Stats (\
      SimID INTEGER NOT NULL REFERENCES Simulations(SimID),\
      Simulation INTEGER NOT NULL,\
      Start TEXT NOT NULL,\
      End TEXT NOT NULL,\
      Mean_iVeg_30EX REAL,\
      Mean_iVeg100EX REAL,\
      Mean_iHyd_SPLow REAL,\
      Mean_iHyd_SP2 REAL,\
      Mean_iGeo_Slope REAL,\
      Mean_oVC_EX REAL,\
      StDev_oVC_EX REAL,\
      Mean_oCC_EX REAL,\
      StDev_oCC_EX REAL,\
      Mean_mCC_EX_CT REAL,\
      StDev_mCC_EX_CT REAL\
    );";

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("simulation recorded before the run began")]
    NotStarted,
}

pub struct SqliteSink {
    conn: Connection,
    sim_id: Option<i64>,
}

impl SqliteSink {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        Self::with_connection(Connection::open(path)?)
    }

    #[cfg(test)]
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn, sim_id: None })
    }

    /// `SimID` of the run in progress or last finished.
    pub fn sim_id(&self) -> Option<i64> {
        self.sim_id
    }

    #[cfg(test)]
    fn count(&self, table: &str) -> rusqlite::Result<i64> {
        self.conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| row.get(0))
    }
}

impl ResultSink for SqliteSink {
    type Error = StoreError;

    fn begin(&mut self, config: &SensitivityConfig, started: DateTime<Utc>) -> Result<(), StoreError> {
        let tx = self.conn.transaction()?;
        tx.execute(
            "INSERT INTO Simulations (Name, Start, N_simulations, N_samples, Seed, SharedPopulation) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                config.name,
                started.to_rfc3339(),
                config.n_simulations as i64,
                config.n_reaches as i64,
                config.seed as i64,
                config.shared_population,
            ],
        )?;
        let sim_id = tx.last_insert_rowid();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO InputDistributions (SimID, Var, Distribution, Param1, Param2) VALUES (?1, ?2, ?3, ?4, ?5)",
            )?;
            for (variable, dist) in config.inputs.iter() {
                let (p1, p2) = dist.params();
                stmt.execute(params![sim_id, variable.field(Epoch::Existing), dist.family(), p1, p2])?;
            }
        }
        tx.commit()?;
        self.sim_id = Some(sim_id);
        Ok(())
    }

    fn record(&mut self, run: &SimulationRun) -> Result<(), StoreError> {
        let sim_id = self.sim_id.ok_or(StoreError::NotStarted)?;
        let simulation = run.index as i64;
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO SimulationAdjustments (SimID, Simulation, Slot, Var, Kind, Value) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for a in &run.adjustments {
                stmt.execute(params![
                    sim_id,
                    simulation,
                    a.slot.name(),
                    a.slot.variable.as_str(),
                    a.slot.kind.as_str(),
                    a.adjustment.value(),
                ])?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO Results (SimID, Simulation, ReachID, iVeg_30EX, iVeg100EX, iHyd_SPLow, iHyd_SP2, \
                 iGeo_Slope, oVC_EX, oCC_EX, mCC_EX_CT) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            )?;
            for (reach, out) in run.reaches.iter().zip(&run.results) {
                stmt.execute(params![
                    sim_id,
                    simulation,
                    reach.id,
                    InputVariable::Streamside.value(reach),
                    InputVariable::Riparian.value(reach),
                    InputVariable::Baseflow.value(reach),
                    InputVariable::PeakFlow.value(reach),
                    InputVariable::Slope.value(reach),
                    out.vegetation,
                    out.combined,
                    out.dam_count,
                ])?;
            }

            let s = &run.stats;
            tx.execute(
                "INSERT INTO Stats VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    sim_id,
                    simulation,
                    run.started.to_rfc3339(),
                    run.finished.to_rfc3339(),
                    s.mean_streamside,
                    s.mean_riparian,
                    s.mean_baseflow,
                    s.mean_peak_flow,
                    s.mean_slope,
                    s.vegetation.mean,
                    s.vegetation.std_dev,
                    s.combined.mean,
                    s.combined.std_dev,
                    s.dam_count.mean,
                    s.dam_count.std_dev,
                ],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> Result<(), StoreError> {
        let sim_id = self.sim_id.ok_or(StoreError::NotStarted)?;
        self.conn.execute(
            "UPDATE Simulations SET End = ?1 WHERE SimID = ?2",
            params![summary.finished.to_rfc3339(), sim_id],
        )?;
        Ok(())
    }
}
