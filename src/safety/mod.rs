//! Safety module
//!
//! Route hazard detection and go/no-go scoring:
//! - Shallow-water detection against vessel draft
//! - Crew-experience adjustments
//! - Static emergency procedure reference

pub mod depth;
pub mod emergency;
pub mod scorer;

pub use depth::{ChartedDepths, DepthSource, NoSoundings};
pub use emergency::EmergencyProcedures;
pub use scorer::{Hazard, HazardKind, RouteSafetyAnalysis, SafetyScore, SafetyScorer, compute_score};
