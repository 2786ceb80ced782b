//! Route Safety Scoring
//!
//! Analyzes a route against vessel draft and crew experience, producing
//! hazards, warnings, recommendations and an ordinal go/no-go score.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use super::depth::{DepthSource, NoSoundings};
use super::emergency::EmergencyProcedures;
use crate::PlannerError;
use crate::config::SafetyConfig;
use crate::models::{CrewExperience, SafetyNote, SafetyReport, Severity, Waypoint};

/// Latitude beyond which cold water and fast-changing weather are expected
const HIGH_LATITUDE: f64 = 60.0;

/// Overall passage risk, worst to best
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SafetyScore {
    /// Multiple or severe hazards; do not sail as planned
    Poor,
    /// One moderate hazard or several warnings
    Fair,
    /// A single warning
    Good,
    /// No hazards and no warnings
    Excellent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HazardKind {
    ShallowWater,
    /// Reported by the safety provider
    Reported,
}

/// A navigational hazard found along the route
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Hazard {
    #[serde(rename = "type")]
    pub kind: HazardKind,
    pub severity: Severity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Waypoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub waypoint_index: Option<usize>,
    pub description: String,
    pub avoidance: String,
}

/// Result of [`SafetyScorer::analyze_route`]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteSafetyAnalysis {
    pub hazards: Vec<Hazard>,
    pub warnings: Vec<SafetyNote>,
    pub recommendations: Vec<String>,
    pub safety_score: SafetyScore,
    pub waypoints_analyzed: usize,
    pub crew_experience: Option<CrewExperience>,
    pub emergency_procedures: EmergencyProcedures,
}

impl RouteSafetyAnalysis {
    /// Adds a warning raised outside the scorer and re-derives the score.
    #[must_use]
    pub fn with_warning(mut self, warning: SafetyNote) -> Self {
        if !self.warnings.contains(&warning) {
            self.warnings.push(warning);
        }
        self.rescore();
        self
    }

    /// Folds a safety provider report into the analysis and re-derives the score.
    ///
    /// Reported hazards count like charted ones; messages already present are skipped.
    #[must_use]
    pub fn with_report(mut self, report: &SafetyReport) -> Self {
        for note in &report.hazards {
            if self.hazards.iter().any(|h| h.description == note.message) {
                continue;
            }
            self.hazards.push(Hazard {
                kind: HazardKind::Reported,
                severity: note.severity,
                location: None,
                waypoint_index: None,
                description: note.message.clone(),
                avoidance: "Follow the safety provider's guidance and verify against current notices to mariners".to_string(),
            });
        }
        for note in &report.warnings {
            if !self.warnings.iter().any(|w| w.message == note.message) {
                self.warnings.push(note.clone());
            }
        }
        self.rescore();
        self
    }

    fn rescore(&mut self) {
        self.safety_score =
            compute_score(&self.hazards, self.warnings.len(), self.crew_experience);
    }
}

/// Computes the ordinal score.
///
/// Monotonic: more hazards, more warnings or a novice crew never yield a
/// better score.
#[must_use]
pub fn compute_score(
    hazards: &[Hazard],
    warning_count: usize,
    crew: Option<CrewExperience>,
) -> SafetyScore {
    let any_critical = hazards.iter().any(|h| h.severity == Severity::Critical);

    let score = match (hazards.len(), warning_count) {
        (0, 0) => SafetyScore::Excellent,
        (0, 1) => SafetyScore::Good,
        (0, _) => SafetyScore::Fair,
        (1, _) if !any_critical => SafetyScore::Fair,
        _ => SafetyScore::Poor,
    };

    let novice = crew == Some(CrewExperience::Novice);
    if novice && (!hazards.is_empty() || warning_count >= 2) {
        score.min(SafetyScore::Fair)
    } else {
        score
    }
}

/// Route safety analyzer
pub struct SafetyScorer {
    source: Arc<dyn DepthSource>,
    depth_safety_margin: f64,
    long_route_waypoints: usize,
}

impl Default for SafetyScorer {
    fn default() -> Self {
        Self::new(Arc::new(NoSoundings), &SafetyConfig::default())
    }
}

impl SafetyScorer {
    #[must_use]
    pub fn new(source: Arc<dyn DepthSource>, config: &SafetyConfig) -> Self {
        Self {
            source,
            depth_safety_margin: config.depth_safety_margin,
            long_route_waypoints: config.long_route_waypoints,
        }
    }

    /// Analyze a route for hazards and derive its safety score
    #[instrument(level = "debug", skip(self, route), fields(waypoints = route.len()))]
    pub fn analyze_route(
        &self,
        route: &[Waypoint],
        draft: Option<f64>,
        crew: Option<CrewExperience>,
    ) -> Result<RouteSafetyAnalysis, PlannerError> {
        if route.is_empty() {
            return Err(PlannerError::validation("route must contain at least one waypoint"));
        }
        for (index, waypoint) in route.iter().enumerate() {
            waypoint
                .validate()
                .map_err(|e| PlannerError::validation(format!("waypoint {index}: {e}")))?;
        }

        let mut hazards = Vec::new();
        let mut warnings = Vec::new();
        let mut recommendations = vec![
            "File a float plan with a shore contact before departure".to_string(),
            "Check VHF radio, lifejackets and flares before departure".to_string(),
        ];

        if let Some(draft) = draft {
            self.check_depths(route, draft, &mut hazards, &mut warnings);
        }

        if route.iter().any(|w| w.latitude.abs() > HIGH_LATITUDE) {
            warnings.push(SafetyNote {
                message: "High-latitude waters: expect cold water and rapidly changing weather"
                    .to_string(),
                severity: Severity::Warning,
            });
        }

        if !hazards.is_empty() {
            recommendations.push(
                "Consult up-to-date charts and time shallow transits for high water".to_string(),
            );
        }

        if route.len() > self.long_route_waypoints {
            recommendations.push(
                "Long route: plan rest stops and a watch schedule to manage crew fatigue"
                    .to_string(),
            );
        }

        recommendations.extend(crew_recommendations(crew));
        dedup_in_order(&mut recommendations);

        let safety_score = compute_score(&hazards, warnings.len(), crew);
        debug!(
            hazards = hazards.len(),
            warnings = warnings.len(),
            ?safety_score,
            "Route analyzed"
        );

        Ok(RouteSafetyAnalysis {
            hazards,
            warnings,
            recommendations,
            safety_score,
            waypoints_analyzed: route.len(),
            crew_experience: crew,
            emergency_procedures: EmergencyProcedures::standard(),
        })
    }

    /// Shallow-water check; a failed lookup degrades to a "depth unknown" warning
    fn check_depths(
        &self,
        route: &[Waypoint],
        draft: f64,
        hazards: &mut Vec<Hazard>,
        warnings: &mut Vec<SafetyNote>,
    ) {
        let required = draft * self.depth_safety_margin;

        for (index, waypoint) in route.iter().enumerate() {
            match self.source.depth_at(waypoint) {
                Ok(Some(depth)) if depth < required => {
                    let severity = if depth <= draft {
                        Severity::Critical
                    } else {
                        Severity::Warning
                    };
                    hazards.push(Hazard {
                        kind: HazardKind::ShallowWater,
                        severity,
                        location: Some(waypoint.clone()),
                        waypoint_index: Some(index),
                        description: format!(
                            "Charted depth {depth:.1} m near {} is below the required {required:.1} m for a {draft:.1} m draft",
                            waypoint.label()
                        ),
                        avoidance: "Reroute through deeper water or transit near high tide with a depth sounder watch".to_string(),
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Depth lookup failed at waypoint {}: {}", index, e);
                    warnings.push(SafetyNote {
                        message: format!(
                            "Depth unknown near {}: verify against charts before transit",
                            waypoint.label()
                        ),
                        severity: Severity::Warning,
                    });
                }
            }
        }
    }
}

fn crew_recommendations(crew: Option<CrewExperience>) -> Vec<String> {
    match crew {
        Some(CrewExperience::Novice) => vec![
            "Avoid night passages until the crew has more experience".to_string(),
            "Practice man-overboard recovery drills before departure".to_string(),
            "Build experience with shorter coastal passages in settled weather".to_string(),
        ],
        Some(CrewExperience::Intermediate) => vec![
            "Review the forecast carefully and keep conditions within the crew's experience"
                .to_string(),
        ],
        Some(CrewExperience::Advanced | CrewExperience::Professional) | None => Vec::new(),
    }
}

/// Removes repeated strings, keeping first occurrences in place
pub(crate) fn dedup_in_order(items: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    items.retain(|item| seen.insert(item.clone()));
}

impl std::fmt::Display for SafetyScore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SafetyScore::Excellent => write!(f, "Excellent"),
            SafetyScore::Good => write!(f, "Good"),
            SafetyScore::Fair => write!(f, "Fair"),
            SafetyScore::Poor => write!(f, "Poor"),
        }
    }
}
