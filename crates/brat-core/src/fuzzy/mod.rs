//! Generic fuzzy machinery: membership curves, their adjustment, variables,
//! rule tables and the Mamdani evaluator.  The capacity stages build on this
//! with their fixed categories and rule tables.
pub mod adjust;
pub mod inference;
pub mod membership;
pub mod rules;
pub mod variable;

pub use adjust::{build, Adjustment, AdjustmentKind, ShapeFit};
pub use inference::{centroid, FuzzySystem, Inference, OUTPUT_STEP};
pub use membership::{MembershipFn, Side};
pub use rules::{Clause, Rule};
pub use variable::{Category, Domain, FuzzyVariable, Geometry};
