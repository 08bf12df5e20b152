//! Beaver dam capacity modelling: a two-stage fuzzy inference system over
//! stream reaches, membership-function adjustments for sensitivity testing,
//! and a Monte Carlo driver that exercises both.
//!
//! ```no_run
//! use brat_core::{CapacityModel, Reach};
//!
//! let model = CapacityModel::standard()?;
//! let reach = Reach {
//!     id: 1,
//!     reach_code: None,
//!     length_m: 500.0,
//!     drainage_area_km2: 12.0,
//!     streamside: 4.0,
//!     riparian: 4.0,
//!     baseflow_power: 50.0,
//!     peak_flow_power: 500.0,
//!     slope: 0.01,
//! };
//! let out = model.evaluate(&reach);
//! println!("{} dams/km, {} dams", out.combined, out.dam_count);
//! # Ok::<(), brat_core::BratError>(())
//! ```
pub mod analysis;
pub mod capacity;
pub mod error;
pub mod fuzzy;
pub mod reach;
pub mod sensitivity;
pub mod table;

pub use capacity::{AdjustmentSet, CapacityConfig, CapacityModel, Density, Diagnostics, ReachCapacity, Reclass};
pub use error::{BratError, Result};
pub use fuzzy::{Adjustment, AdjustmentKind, ShapeFit};
pub use reach::{ingest, Epoch, InputVariable, Reach};
pub use sensitivity::{Distribution, MonteCarlo, ResultSink, SensitivityConfig};
pub use table::{read_table, AttributeTable};
