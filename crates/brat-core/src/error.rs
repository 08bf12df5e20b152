use thiserror::Error;

/// Errors raised by model construction, ingestion and the sensitivity driver.
///
/// Out-of-domain inputs are not errors: they are clamped and reported in the
/// evaluation metadata instead.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BratError {
    /// Unknown adjustment kind, non-positive scale factor or a shape selector
    /// other than 1 (best fit) or 2 (loose fit).
    #[error("invalid adjustment: {0}")]
    InvalidAdjustment(String),

    /// A required reach attribute is absent or not a finite number.
    #[error("reach {reach_id}: missing input field `{field}`")]
    MissingInput { reach_id: i64, field: String },

    /// A name-keyed evaluation did not supply one of the system's inputs.
    #[error("no value supplied for input variable `{0}`")]
    MissingVariable(String),

    /// Unknown distribution family or unusable distribution parameters.
    #[error("distribution sampling error: {0}")]
    DistributionSampling(String),

    /// Structurally invalid configuration (zero sample counts, duplicate
    /// adjustment slots, negative drainage limits).
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A reach attribute table could not be read or parsed.
    #[error("reach table: {0}")]
    Table(String),

    /// Distribution fitting could not produce any candidate.
    #[error("distribution fit failed: {0}")]
    Fit(String),
}

pub type Result<T> = std::result::Result<T, BratError>;
