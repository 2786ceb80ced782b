//! Data models for the passage planner
//!
//! This module contains the core domain models organized by concern:
//! - Location: waypoints and great-circle distances
//! - Request: the plan request and its validation
//! - Report: normalized provider reports
//! - Plan: the assembled passage plan

pub mod location;
pub mod plan;
pub mod report;
pub mod request;

pub use location::{Waypoint, route_distance_nm, validate_coordinates};
pub use plan::{
    PassagePlan, Performance, PlanSummary, PlanWarning, RouteSource, SAFETY_DISCLAIMER,
    SafetySection, TideSection, WarningSource, WeatherSection,
};
pub use report::{
    ForecastPoint, RouteReport, SafetyNote, SafetyReport, Severity, TideExtreme, TideKind,
    TideReport, WaveUnit, WeatherReport,
};
pub use request::{
    Crew, CrewExperience, Departure, Destination, PlanRequest, PortRef, Preferences, RoutePoint,
    ValidatedRequest, Vessel,
};
