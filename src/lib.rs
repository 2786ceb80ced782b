//! `PassagePlan` - Sailing passage planning with embedded safety scoring
//!
//! This library fans out to route, weather, tidal and safety providers,
//! tolerates their partial failure, and assembles a risk-annotated passage
//! plan with a deterministic go/no-go safety score.

pub mod aggregator;
pub mod broadcast;
pub mod config;
pub mod daylight;
pub mod error;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod planner;
pub mod provider;
pub mod safety;

// Re-export core types for public API
pub use aggregator::{AggregatedWarnings, BranchReports, WarningAggregator};
pub use broadcast::{ChannelBroadcaster, NullBroadcaster, ProgressBroadcaster, ProgressEvent};
pub use config::PlannerConfig;
pub use error::PlannerError;
pub use models::{PassagePlan, PlanRequest, PlanWarning, Severity, Waypoint};
pub use persistence::{FjallPlanStore, PersistenceGateway, PlanStore, SaveOutcome};
pub use planner::{PassagePlanner, Providers, RouteFailurePolicy};
pub use provider::{Branch, CapabilityProvider, ProviderResult};
pub use safety::{RouteSafetyAnalysis, SafetyScore, SafetyScorer};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
