//! Typed reach records and their ingestion from attribute bags.
//!
//! Attribute bags are keyed by the BRAT field names (`iVeg_30EX`,
//! `iHyd_SP2`, ...).  A reach is validated once here; the capacity pipeline
//! only ever sees complete, finite records.
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{BratError, Result};
use crate::fuzzy::Domain;

/// Vegetation suitability score range.
pub const SUITABILITY_DOMAIN: Domain = Domain::new(0.0, 4.0);
/// Baseflow and peak-flow stream power (watts).
pub const STREAM_POWER_DOMAIN: Domain = Domain::new(0.0, 10_000.0);
pub const SLOPE_DOMAIN: Domain = Domain::new(0.0, 1.0);

/// Which vegetation layer the suitability fields describe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Epoch {
    #[default]
    Existing,
    Historic,
}

impl Epoch {
    pub fn suffix(self) -> &'static str {
        match self {
            Epoch::Existing => "EX",
            Epoch::Historic => "HPE",
        }
    }

    pub fn vegetation_capacity_field(self) -> String {
        format!("oVC_{}", self.suffix())
    }

    pub fn combined_capacity_field(self) -> String {
        format!("oCC_{}", self.suffix())
    }

    pub fn dam_count_field(self) -> String {
        format!("mCC_{}_CT", self.suffix())
    }
}

impl FromStr for Epoch {
    type Err = BratError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "existing" | "ex" => Ok(Epoch::Existing),
            "historic" | "hpe" => Ok(Epoch::Historic),
            other => Err(BratError::InvalidConfig(format!("unknown vegetation epoch `{other}`"))),
        }
    }
}

/// The five model inputs that can carry an adjustment or a sampling
/// distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputVariable {
    /// 30 m buffer vegetation suitability.
    Streamside,
    /// 100 m buffer vegetation suitability.
    Riparian,
    Baseflow,
    PeakFlow,
    Slope,
}

impl InputVariable {
    pub const ALL: [InputVariable; 5] = [
        InputVariable::Streamside,
        InputVariable::Riparian,
        InputVariable::Baseflow,
        InputVariable::PeakFlow,
        InputVariable::Slope,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            InputVariable::Streamside => "streamside",
            InputVariable::Riparian => "riparian",
            InputVariable::Baseflow => "baseflow",
            InputVariable::PeakFlow => "peak_flow",
            InputVariable::Slope => "slope",
        }
    }

    /// Label used in adjustment slot names (`SPlow_Shift`, `Veg30_Scale`).
    pub fn short_label(self) -> &'static str {
        match self {
            InputVariable::Streamside => "Veg30",
            InputVariable::Riparian => "Veg100",
            InputVariable::Baseflow => "SPlow",
            InputVariable::PeakFlow => "SP2",
            InputVariable::Slope => "Slope",
        }
    }

    /// Attribute field name for the given vegetation epoch.
    pub fn field(self, epoch: Epoch) -> String {
        match self {
            InputVariable::Streamside => format!("iVeg_30{}", epoch.suffix()),
            InputVariable::Riparian => format!("iVeg100{}", epoch.suffix()),
            InputVariable::Baseflow => "iHyd_SPLow".to_string(),
            InputVariable::PeakFlow => "iHyd_SP2".to_string(),
            InputVariable::Slope => "iGeo_Slope".to_string(),
        }
    }

    pub fn domain(self) -> Domain {
        match self {
            InputVariable::Streamside | InputVariable::Riparian => SUITABILITY_DOMAIN,
            InputVariable::Baseflow | InputVariable::PeakFlow => STREAM_POWER_DOMAIN,
            InputVariable::Slope => SLOPE_DOMAIN,
        }
    }

    pub fn value(self, reach: &Reach) -> f64 {
        match self {
            InputVariable::Streamside => reach.streamside,
            InputVariable::Riparian => reach.riparian,
            InputVariable::Baseflow => reach.baseflow_power,
            InputVariable::PeakFlow => reach.peak_flow_power,
            InputVariable::Slope => reach.slope,
        }
    }
}

impl fmt::Display for InputVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InputVariable {
    type Err = BratError;

    /// Accepts the snake-case names plus the short labels and field names
    /// used by the sensitivity tables (`Veg30`, `SPlow`, `iHyd_SP2`, ...).
    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "streamside" | "veg30" | "iveg_30ex" | "iveg_30hpe" => Ok(InputVariable::Streamside),
            "riparian" | "veg100" | "iveg100ex" | "iveg100hpe" => Ok(InputVariable::Riparian),
            "baseflow" | "splow" | "ihyd_splow" => Ok(InputVariable::Baseflow),
            "peak_flow" | "peakflow" | "sp2" | "ihyd_sp2" => Ok(InputVariable::PeakFlow),
            "slope" | "igeo_slope" => Ok(InputVariable::Slope),
            other => Err(BratError::InvalidConfig(format!("unknown input variable `{other}`"))),
        }
    }
}

pub const DRAINAGE_AREA_FIELD: &str = "iGeo_DA";
pub const LENGTH_FIELD: &str = "iGeo_Len";
pub const REACH_CODE_FIELD: &str = "ReachCode";

/// One stream segment, the unit of evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reach {
    pub id: i64,
    /// NHD feature code; only consulted for drainage-area exceptions.
    pub reach_code: Option<u32>,
    pub length_m: f64,
    pub drainage_area_km2: f64,
    pub streamside: f64,
    pub riparian: f64,
    pub baseflow_power: f64,
    pub peak_flow_power: f64,
    pub slope: f64,
}

impl Reach {
    /// Build a reach from a field-name → value bag.
    ///
    /// Every model input plus length and drainage area must be present and
    /// finite; `ReachCode` is optional.
    pub fn from_attributes(id: i64, attrs: &BTreeMap<String, f64>, epoch: Epoch) -> Result<Self> {
        let require = |field: &str| -> Result<f64> {
            lookup(attrs, field)
                .filter(|v| v.is_finite())
                .ok_or_else(|| BratError::MissingInput { reach_id: id, field: field.to_string() })
        };

        Ok(Self {
            id,
            reach_code: lookup(attrs, REACH_CODE_FIELD)
                .filter(|c| c.is_finite() && *c >= 0.0)
                .map(|c| c as u32),
            length_m: require(LENGTH_FIELD)?,
            drainage_area_km2: require(DRAINAGE_AREA_FIELD)?,
            streamside: require(&InputVariable::Streamside.field(epoch))?,
            riparian: require(&InputVariable::Riparian.field(epoch))?,
            baseflow_power: require(&InputVariable::Baseflow.field(epoch))?,
            peak_flow_power: require(&InputVariable::PeakFlow.field(epoch))?,
            slope: require(&InputVariable::Slope.field(epoch))?,
        })
    }
}

/// Exact field match first, then case-insensitive (`iHyd_SPlow` and
/// `iHyd_SPLow` both occur in BRAT databases).
fn lookup(attrs: &BTreeMap<String, f64>, field: &str) -> Option<f64> {
    attrs.get(field).copied().or_else(|| {
        attrs
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(field))
            .map(|(_, v)| *v)
    })
}

/// Convert a reach-id keyed attribute table into typed reaches, ordered by id.
pub fn ingest(table: &BTreeMap<i64, BTreeMap<String, f64>>, epoch: Epoch) -> Result<Vec<Reach>> {
    table
        .iter()
        .map(|(&id, attrs)| Reach::from_attributes(id, attrs, epoch))
        .collect()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn attrs(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|&(k, v)| (k.to_string(), v)).collect()
    }

    fn full() -> BTreeMap<String, f64> {
        attrs(&[
            ("iVeg_30EX", 2.5),
            ("iVeg100EX", 3.0),
            ("iHyd_SPlow", 40.0),
            ("iHyd_SP2", 600.0),
            ("iGeo_Slope", 0.02),
            ("iGeo_DA", 12.0),
            ("iGeo_Len", 350.0),
            ("ReachCode", 46006.0),
        ])
    }

    #[test]
    fn ingests_complete_record() {
        let r = Reach::from_attributes(7, &full(), Epoch::Existing).unwrap();
        assert_eq!(r.id, 7);
        assert_eq!(r.reach_code, Some(46006));
        assert_eq!(r.streamside, 2.5);
        assert_eq!(r.riparian, 3.0);
        assert_eq!(r.baseflow_power, 40.0);
        assert_eq!(r.length_m, 350.0);
    }

    #[test]
    fn missing_or_nan_field_is_reported() {
        let mut a = full();
        a.remove("iHyd_SP2");
        let err = Reach::from_attributes(3, &a, Epoch::Existing).unwrap_err();
        assert_eq!(err, BratError::MissingInput { reach_id: 3, field: "iHyd_SP2".into() });

        let mut b = full();
        b.insert("iGeo_Slope".into(), f64::NAN);
        assert!(Reach::from_attributes(3, &b, Epoch::Existing).is_err());
    }

    #[test]
    fn historic_epoch_reads_hpe_fields() {
        let a = full();
        assert!(Reach::from_attributes(1, &a, Epoch::Historic).is_err());
        let mut h = a.clone();
        h.insert("iVeg_30HPE".into(), 1.0);
        h.insert("iVeg100HPE".into(), 1.5);
        let r = Reach::from_attributes(1, &h, Epoch::Historic).unwrap();
        assert_eq!((r.streamside, r.riparian), (1.0, 1.5));
        assert_eq!(Epoch::Historic.combined_capacity_field(), "oCC_HPE");
    }

    #[test]
    fn variable_aliases_parse() {
        assert_eq!("SPlow".parse::<InputVariable>().unwrap(), InputVariable::Baseflow);
        assert_eq!("Veg100".parse::<InputVariable>().unwrap(), InputVariable::Riparian);
        assert_eq!("iHyd_SP2".parse::<InputVariable>().unwrap(), InputVariable::PeakFlow);
        assert!("discharge".parse::<InputVariable>().is_err());
    }
}
