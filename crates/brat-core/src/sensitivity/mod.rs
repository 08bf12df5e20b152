//! Monte Carlo sensitivity analysis of the capacity model, plus the
//! distribution fitting used to choose its input distributions.
pub mod distributions;
pub mod driver;
pub mod fit;
pub mod stats;

pub use distributions::{Distribution, InputDistributions, Sampler};
pub use driver::{
    default_slots, AdjustmentSlot, MemorySink, MonteCarlo, ResultSink, RunError, RunSummary, SampledAdjustment,
    SampledSimulation, SensitivityConfig, SimulationRun,
};
pub use fit::{fit, Candidate, FitReport};
pub use stats::{SimulationStats, Summary};
