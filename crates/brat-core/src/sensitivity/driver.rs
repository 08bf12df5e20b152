//! Monte Carlo sensitivity runs.
//!
//! Each simulation draws one adjustment per configured slot, builds its own
//! adjusted [`CapacityModel`], evaluates a population of synthetic reaches and
//! hands the run to a [`ResultSink`].  Every simulation owns a ChaCha stream
//! derived from `(seed, simulation index)`, so a run never depends on another
//! run's draws and a fixed seed reproduces every sample.
use std::collections::HashSet;
use std::convert::Infallible;

use chrono::{DateTime, Utc};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::Distribution as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use super::distributions::{Distribution, InputDistributions};
use super::stats::SimulationStats;
use crate::capacity::{AdjustmentSet, CapacityConfig, CapacityModel, ReachCapacity};
use crate::error::{BratError, Result};
use crate::fuzzy::{Adjustment, AdjustmentKind};
use crate::reach::{InputVariable, Reach};

/// Stream reserved for the shared reach population; simulation `i` uses
/// stream `i + 1`.
const POPULATION_STREAM: u64 = 0;

/// Redraws allowed when a scale draw lands exactly on zero.
const MAX_SCALE_REDRAWS: usize = 64;

// ── Configuration ────────────────────────────────────────────────────────────

/// Which adjustment a simulation draws for one input variable, and from what.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AdjustmentSlot {
    pub variable: InputVariable,
    pub kind: AdjustmentKind,
    pub distribution: Distribution,
}

impl AdjustmentSlot {
    pub fn new(variable: InputVariable, kind: AdjustmentKind, distribution: Distribution) -> Self {
        Self { variable, kind, distribution }
    }

    /// `SPlow_Shift`, `Veg30_Scale`, ...
    pub fn name(&self) -> String {
        let kind = match self.kind {
            AdjustmentKind::Shift => "Shift",
            AdjustmentKind::Scale => "Scale",
            AdjustmentKind::Shape => "Shape",
        };
        format!("{}_{kind}", self.variable.short_label())
    }
}

/// Scale both vegetation inputs, shift the three hydrology/slope inputs.
pub fn default_slots() -> Vec<AdjustmentSlot> {
    let scale = Distribution::Normal { mean: 1.0, std_dev: 0.75 };
    vec![
        AdjustmentSlot::new(InputVariable::Streamside, AdjustmentKind::Scale, scale),
        AdjustmentSlot::new(InputVariable::Riparian, AdjustmentKind::Scale, scale),
        AdjustmentSlot::new(
            InputVariable::Baseflow,
            AdjustmentKind::Shift,
            Distribution::Normal { mean: 0.0, std_dev: 18.5 },
        ),
        AdjustmentSlot::new(
            InputVariable::PeakFlow,
            AdjustmentKind::Shift,
            Distribution::Normal { mean: 0.0, std_dev: 200.0 },
        ),
        AdjustmentSlot::new(
            InputVariable::Slope,
            AdjustmentKind::Shift,
            Distribution::Normal { mean: 0.0, std_dev: 0.02 },
        ),
    ]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SensitivityConfig {
    pub name: String,
    pub n_simulations: usize,
    /// Synthetic reaches per simulation.
    pub n_reaches: usize,
    pub seed: u64,
    pub inputs: InputDistributions,
    pub slots: Vec<AdjustmentSlot>,
    /// Sample one reach population and reuse it in every simulation.
    pub shared_population: bool,
    pub reach_length_m: f64,
    pub drainage_area_km2: f64,
    pub max_drainage_area: Option<f64>,
}

impl Default for SensitivityConfig {
    fn default() -> Self {
        Self {
            name: "Monte Carlo Simulation".into(),
            n_simulations: 100,
            n_reaches: 1000,
            seed: 0,
            inputs: InputDistributions::siletz(),
            slots: default_slots(),
            shared_population: false,
            reach_length_m: 1000.0,
            drainage_area_km2: 0.1,
            max_drainage_area: None,
        }
    }
}

impl SensitivityConfig {
    pub fn validate(&self) -> Result<()> {
        if self.n_simulations == 0 || self.n_reaches == 0 {
            return Err(BratError::InvalidConfig(format!(
                "need at least one simulation and one reach, got {} x {}",
                self.n_simulations, self.n_reaches
            )));
        }
        if !(self.reach_length_m.is_finite() && self.reach_length_m > 0.0) {
            return Err(BratError::InvalidConfig(format!("reach_length_m must be > 0, got {}", self.reach_length_m)));
        }
        if !(self.drainage_area_km2.is_finite() && self.drainage_area_km2 >= 0.0) {
            return Err(BratError::InvalidConfig(format!(
                "drainage_area_km2 must be >= 0, got {}",
                self.drainage_area_km2
            )));
        }
        self.inputs.validate()?;

        let mut seen = HashSet::new();
        for slot in &self.slots {
            if slot.kind == AdjustmentKind::Shape {
                return Err(BratError::InvalidConfig(format!(
                    "{}: shape adjustments are chosen, not sampled",
                    slot.name()
                )));
            }
            if !seen.insert(slot.variable) {
                return Err(BratError::InvalidConfig(format!(
                    "{} is the second adjustment slot for {}",
                    slot.name(),
                    slot.variable
                )));
            }
            slot.distribution.validate()?;
        }
        Ok(())
    }
}

// ── Run records ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampledAdjustment {
    pub slot: AdjustmentSlot,
    pub adjustment: Adjustment,
}

/// Everything drawn for one simulation, before evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct SampledSimulation {
    pub index: usize,
    pub adjustments: Vec<SampledAdjustment>,
    pub reaches: Vec<Reach>,
}

impl SampledSimulation {
    pub fn adjustment_set(&self) -> Result<AdjustmentSet> {
        let mut set = AdjustmentSet::default();
        for a in &self.adjustments {
            set.insert(a.slot.variable, a.adjustment)?;
        }
        Ok(set)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRun {
    pub index: usize,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub adjustments: Vec<SampledAdjustment>,
    pub reaches: Vec<Reach>,
    pub results: Vec<ReachCapacity>,
    pub stats: SimulationStats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub name: String,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub n_simulations: usize,
    pub n_reaches: usize,
}

// ── Sinks ────────────────────────────────────────────────────────────────────

/// Receives runs in order from the driver thread.
pub trait ResultSink {
    type Error: std::error::Error + Send + Sync + 'static;

    fn begin(&mut self, config: &SensitivityConfig, started: DateTime<Utc>) -> std::result::Result<(), Self::Error>;
    fn record(&mut self, run: &SimulationRun) -> std::result::Result<(), Self::Error>;
    fn finish(&mut self, summary: &RunSummary) -> std::result::Result<(), Self::Error>;
}

/// Keeps every run in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub runs: Vec<SimulationRun>,
    pub summary: Option<RunSummary>,
}

impl ResultSink for MemorySink {
    type Error = Infallible;

    fn begin(&mut self, _config: &SensitivityConfig, _started: DateTime<Utc>) -> std::result::Result<(), Infallible> {
        self.runs.clear();
        self.summary = None;
        Ok(())
    }

    fn record(&mut self, run: &SimulationRun) -> std::result::Result<(), Infallible> {
        self.runs.push(run.clone());
        Ok(())
    }

    fn finish(&mut self, summary: &RunSummary) -> std::result::Result<(), Infallible> {
        self.summary = Some(summary.clone());
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RunError<E: std::error::Error + 'static> {
    #[error(transparent)]
    Model(#[from] BratError),
    #[error("result sink failed: {0}")]
    Sink(#[source] E),
}

// ── Driver ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MonteCarlo {
    config: SensitivityConfig,
}

impl MonteCarlo {
    /// Validate the configuration; nothing is sampled yet.
    pub fn configure(config: SensitivityConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &SensitivityConfig {
        &self.config
    }

    fn stream(&self, stream: u64) -> ChaCha8Rng {
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);
        rng.set_stream(stream);
        rng
    }

    /// Draw `n_reaches` synthetic reaches with ids `1..=n`.
    pub fn sample_reaches<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<Reach>> {
        let inputs = &self.config.inputs;
        let streamside = inputs.streamside.sampler()?;
        let riparian = inputs.riparian.sampler()?;
        let baseflow = inputs.baseflow.sampler()?;
        let peak_flow = inputs.peak_flow.sampler()?;
        let slope = inputs.slope.sampler()?;
        Ok((1..=self.config.n_reaches as i64)
            .map(|id| Reach {
                id,
                reach_code: None,
                length_m: self.config.reach_length_m,
                drainage_area_km2: self.config.drainage_area_km2,
                streamside: streamside.sample(rng),
                riparian: riparian.sample(rng),
                baseflow_power: baseflow.sample(rng),
                peak_flow_power: peak_flow.sample(rng),
                slope: slope.sample(rng),
            })
            .collect())
    }

    /// One draw per slot.  Scale draws take the absolute value; an exact zero
    /// is redrawn.
    pub fn sample_adjustments<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<SampledAdjustment>> {
        self.config
            .slots
            .iter()
            .map(|slot| {
                let sampler = slot.distribution.sampler()?;
                let value = match slot.kind {
                    AdjustmentKind::Scale => (0..MAX_SCALE_REDRAWS)
                        .map(|_| sampler.sample(rng).abs())
                        .find(|v| *v > 0.0)
                        .ok_or_else(|| {
                            BratError::DistributionSampling(format!(
                                "{} drew zero {MAX_SCALE_REDRAWS} times",
                                slot.name()
                            ))
                        })?,
                    _ => sampler.sample(rng),
                };
                Ok(SampledAdjustment { slot: *slot, adjustment: Adjustment::new(slot.kind, value)? })
            })
            .collect()
    }

    /// Draw simulation `index`.  Adjustments are drawn before reaches so the
    /// adjustment sequence does not depend on `n_reaches`.
    pub fn sample(&self, index: usize, shared: Option<&[Reach]>) -> Result<SampledSimulation> {
        let mut rng = self.stream(index as u64 + 1);
        let adjustments = self.sample_adjustments(&mut rng)?;
        let reaches = match shared {
            Some(population) => population.to_vec(),
            None => self.sample_reaches(&mut rng)?,
        };
        Ok(SampledSimulation { index, adjustments, reaches })
    }

    pub fn evaluate(&self, sampled: SampledSimulation) -> Result<SimulationRun> {
        let started = Utc::now();
        let config = CapacityConfig {
            max_drainage_area: self.config.max_drainage_area,
            adjustments: sampled.adjustment_set()?,
            ..CapacityConfig::default()
        };
        let model = CapacityModel::new(&config)?;
        let results = model.run(&sampled.reaches);
        let stats = SimulationStats::compute(&sampled.reaches, &results);
        Ok(SimulationRun {
            index: sampled.index,
            started,
            finished: Utc::now(),
            adjustments: sampled.adjustments,
            reaches: sampled.reaches,
            results,
            stats,
        })
    }

    /// Run every simulation, recording each into `sink` as it completes.
    pub fn run<S: ResultSink>(&self, sink: &mut S) -> std::result::Result<RunSummary, RunError<S::Error>> {
        let started = Utc::now();
        sink.begin(&self.config, started).map_err(RunError::Sink)?;
        info!(
            name = %self.config.name,
            simulations = self.config.n_simulations,
            reaches = self.config.n_reaches,
            seed = self.config.seed,
            "starting sensitivity run"
        );

        let shared = if self.config.shared_population {
            Some(self.sample_reaches(&mut self.stream(POPULATION_STREAM))?)
        } else {
            None
        };

        for index in 0..self.config.n_simulations {
            let sampled = self.sample(index, shared.as_deref())?;
            debug!(
                simulation = index,
                adjustments = ?sampled.adjustments.iter().map(|a| (a.slot.name(), a.adjustment.value())).collect::<Vec<_>>(),
                "sampled"
            );
            let run = self.evaluate(sampled)?;
            info!(
                simulation = index,
                mean_vegetation = run.stats.vegetation.mean,
                mean_combined = run.stats.combined.mean,
                "simulation complete"
            );
            sink.record(&run).map_err(RunError::Sink)?;
        }

        let summary = RunSummary {
            name: self.config.name.clone(),
            started,
            finished: Utc::now(),
            n_simulations: self.config.n_simulations,
            n_reaches: self.config.n_reaches,
        };
        sink.finish(&summary).map_err(RunError::Sink)?;
        info!(elapsed_ms = (summary.finished - started).num_milliseconds(), "sensitivity run finished");
        Ok(summary)
    }
}
