//! Assembled passage plan returned to the transport layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::location::Waypoint;
use super::report::{SafetyReport, Severity, TideReport, WeatherReport};
use super::request::PlanRequest;
use crate::safety::{RouteSafetyAnalysis, SafetyScore};

/// Shown with every safety section
pub const SAFETY_DISCLAIMER: &str = "This plan is advisory. Verify all information against official charts, notices to mariners and current forecasts. The skipper remains responsible for the safety of the vessel and crew.";

/// Where a warning originated
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum WarningSource {
    Weather,
    Tides,
    Safety,
    Preferences,
    Daylight,
    Persistence,
}

/// A user-visible warning tagged by severity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub struct PlanWarning {
    pub severity: Severity,
    pub source: WarningSource,
    pub message: String,
}

impl PlanWarning {
    #[must_use]
    pub fn new(severity: Severity, source: WarningSource, message: impl Into<String>) -> Self {
        Self {
            severity,
            source,
            message: message.into(),
        }
    }
}

/// How the plan's route was obtained
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RouteSource {
    /// Proposed by the route provider
    Provider,
    /// Supplied by the caller in the request
    Supplied,
    /// Computed locally after the route branch failed
    GreatCircleFallback,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WeatherSection {
    pub departure: Option<WeatherReport>,
    pub arrival: Option<WeatherReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TideSection {
    pub departure: Option<TideReport>,
    pub arrival: Option<TideReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetySection {
    /// Safety provider's route analysis; `None` when that branch failed
    pub route_analysis: Option<SafetyReport>,
    /// Safety provider's passage brief; `None` when that branch failed
    pub brief: Option<SafetyReport>,
    /// Local hazard analysis of the final route
    pub assessment: RouteSafetyAnalysis,
    pub warnings: Vec<PlanWarning>,
    pub warning_count: usize,
    pub route_analyzed: bool,
    pub disclaimer: String,
}

impl SafetySection {
    #[must_use]
    pub fn new(
        route_analysis: Option<SafetyReport>,
        brief: Option<SafetyReport>,
        assessment: RouteSafetyAnalysis,
        warnings: Vec<PlanWarning>,
    ) -> Self {
        Self {
            route_analysis,
            brief,
            route_analyzed: assessment.waypoints_analyzed > 0,
            assessment,
            warning_count: warnings.len(),
            warnings,
            disclaimer: SAFETY_DISCLAIMER.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanSummary {
    /// Nautical miles
    pub total_distance: f64,
    /// Hours
    pub estimated_duration: f64,
    pub departure_time: DateTime<Utc>,
    pub estimated_arrival: DateTime<Utc>,
    pub total_waypoints: usize,
    pub safety_score: SafetyScore,
    pub warnings: Vec<PlanWarning>,
    pub warning_count: usize,
    pub recommendations: Vec<String>,
}

impl PlanSummary {
    #[allow(clippy::too_many_arguments)]
    #[must_use]
    pub fn new(
        total_distance: f64,
        estimated_duration: f64,
        departure_time: DateTime<Utc>,
        estimated_arrival: DateTime<Utc>,
        total_waypoints: usize,
        safety_score: SafetyScore,
        warnings: Vec<PlanWarning>,
        recommendations: Vec<String>,
    ) -> Self {
        Self {
            total_distance,
            estimated_duration,
            departure_time,
            estimated_arrival,
            total_waypoints,
            safety_score,
            warning_count: warnings.len(),
            warnings,
            recommendations,
        }
    }
}

/// Timing of one planning run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Performance {
    /// Milliseconds from request to assembled plan
    pub total_time: u64,
    /// Milliseconds spent in the concurrent fan-out
    pub parallel_time: u64,
    /// Branches that returned a usable result
    pub branches_used: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PassagePlan {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub request: PlanRequest,
    pub route: Vec<Waypoint>,
    pub route_source: RouteSource,
    pub weather: Option<WeatherSection>,
    pub tides: Option<TideSection>,
    pub safety: SafetySection,
    pub summary: PlanSummary,
    pub performance: Performance,
}

impl PassagePlan {
    /// Returns a copy of the plan with `warning` appended to the summary.
    #[must_use]
    pub fn with_summary_warning(&self, warning: PlanWarning) -> Self {
        let mut warnings = self.summary.warnings.clone();
        warnings.push(warning);

        Self {
            summary: PlanSummary {
                warning_count: warnings.len(),
                warnings,
                ..self.summary.clone()
            },
            ..self.clone()
        }
    }
}
