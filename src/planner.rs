//! Passage planning orchestration
//!
//! [`PassagePlanner::plan_passage`] validates a request, fans out to the
//! route, weather, tidal and safety providers under a per-branch deadline,
//! degrades per branch when a provider fails, scores the final route locally
//! and assembles one [`PassagePlan`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{Span, debug, info, instrument, warn};
use uuid::Uuid;

use crate::PlannerError;
use crate::aggregator::{BranchReports, WarningAggregator};
use crate::broadcast::{NullBroadcaster, ProgressBroadcaster, ProgressEvent};
use crate::config::{PlannerConfig, SafetyConfig};
use crate::daylight::night_passage_warnings;
use crate::models::{
    PassagePlan, Performance, PlanRequest, PlanSummary, PlanWarning, PortRef, RouteReport,
    RouteSource, SafetyNote, SafetyReport, SafetySection, Severity, TideSection, ValidatedRequest,
    WarningSource, Waypoint, WeatherSection, route_distance_nm,
};
use crate::persistence::{PersistenceGateway, PlanStore};
use crate::provider::adapter::{parse_route, parse_safety, parse_tides, parse_weather};
use crate::provider::{Branch, CapabilityProvider, ProviderResult, call_with_deadline};
use crate::safety::{DepthSource, NoSoundings, RouteSafetyAnalysis, SafetyScorer};

pub const SAFETY_UNAVAILABLE: &str = "Safety check unavailable - exercise extreme caution";

/// What to do when the route branch fails, times out or returns no usable route
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteFailurePolicy {
    /// Sail the supplied legs, or the great circle between the ports
    #[default]
    GreatCircleFallback,
    /// Fail the request
    Abort,
}

/// One provider per data domain
#[derive(Clone)]
pub struct Providers {
    pub route: Arc<dyn CapabilityProvider>,
    pub weather: Arc<dyn CapabilityProvider>,
    pub tidal: Arc<dyn CapabilityProvider>,
    pub safety: Arc<dyn CapabilityProvider>,
}

impl Providers {
    fn for_branch(&self, branch: Branch) -> &dyn CapabilityProvider {
        match branch {
            Branch::Route => self.route.as_ref(),
            Branch::WeatherDeparture | Branch::WeatherArrival => self.weather.as_ref(),
            Branch::TidesDeparture | Branch::TidesArrival => self.tidal.as_ref(),
            Branch::SafetyRouteAnalysis | Branch::SafetyBrief => self.safety.as_ref(),
        }
    }
}

/// Settled results of the fan-out, one per branch
struct FanOut {
    route: ProviderResult,
    weather_departure: ProviderResult,
    weather_arrival: ProviderResult,
    tides_departure: ProviderResult,
    tides_arrival: ProviderResult,
    safety_route_analysis: ProviderResult,
    safety_brief: ProviderResult,
}

impl FanOut {
    fn succeeded(&self) -> Vec<String> {
        [
            (Branch::Route, &self.route),
            (Branch::WeatherDeparture, &self.weather_departure),
            (Branch::WeatherArrival, &self.weather_arrival),
            (Branch::TidesDeparture, &self.tides_departure),
            (Branch::TidesArrival, &self.tides_arrival),
            (Branch::SafetyRouteAnalysis, &self.safety_route_analysis),
            (Branch::SafetyBrief, &self.safety_brief),
        ]
        .into_iter()
        .filter(|(_, result)| result.is_success())
        .map(|(branch, _)| branch.name().to_string())
        .collect()
    }
}

/// Final route and the distance/duration the provider vouched for
#[derive(Debug)]
struct ResolvedRoute {
    waypoints: Vec<Waypoint>,
    source: RouteSource,
    distance_nm: Option<f64>,
    duration_hours: Option<f64>,
}

/// Coordinates plan requests across providers, scoring, persistence and progress events
pub struct PassagePlanner {
    providers: Providers,
    scorer: SafetyScorer,
    aggregator: WarningAggregator,
    persistence: PersistenceGateway,
    broadcaster: Arc<dyn ProgressBroadcaster>,
    route_policy: RouteFailurePolicy,
    safety_config: SafetyConfig,
    branch_timeout: Duration,
}

impl PassagePlanner {
    /// Planner without depth soundings or progress subscribers
    #[must_use]
    pub fn new(providers: Providers, store: Arc<dyn PlanStore>, config: &PlannerConfig) -> Self {
        Self {
            providers,
            scorer: SafetyScorer::new(Arc::new(NoSoundings), &config.safety),
            aggregator: WarningAggregator::new(&config.safety),
            persistence: PersistenceGateway::new(store, &config.persistence),
            broadcaster: Arc::new(NullBroadcaster),
            route_policy: RouteFailurePolicy::default(),
            safety_config: config.safety.clone(),
            branch_timeout: config.providers.branch_timeout(),
        }
    }

    #[must_use]
    pub fn with_depth_source(mut self, source: Arc<dyn DepthSource>) -> Self {
        self.scorer = SafetyScorer::new(source, &self.safety_config);
        self
    }

    #[must_use]
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn ProgressBroadcaster>) -> Self {
        self.broadcaster = broadcaster;
        self
    }

    #[must_use]
    pub fn with_route_policy(mut self, policy: RouteFailurePolicy) -> Self {
        self.route_policy = policy;
        self
    }

    /// Plan one passage.
    ///
    /// Fails only on invalid input or when no route can be produced; every
    /// other provider failure degrades the plan instead.
    #[instrument(name = "plan_passage", skip(self, request), fields(plan_id))]
    pub async fn plan_passage(&self, request: PlanRequest) -> Result<PassagePlan, PlannerError> {
        let started = Instant::now();
        let plan_id = Uuid::new_v4();
        Span::current().record("plan_id", tracing::field::display(plan_id));

        let validated = match request.validate() {
            Ok(validated) => validated,
            Err(e) => return Err(self.fail(plan_id, e)),
        };

        info!(
            departure = %port_label(&validated.departure),
            destination = %port_label(&validated.destination),
            "Planning passage"
        );
        self.broadcaster.emit(ProgressEvent::PlanningStarted {
            request_id: plan_id,
        });

        let parallel_started = Instant::now();
        let fan_out = self.fan_out(plan_id, &request, &validated).await;
        let parallel_time = elapsed_ms(parallel_started);
        let branches_used = fan_out.succeeded();
        debug!(parallel_time, ?branches_used, "Fan-out settled");

        let FanOut {
            route,
            weather_departure,
            weather_arrival,
            tides_departure,
            tides_arrival,
            safety_route_analysis,
            safety_brief,
        } = fan_out;

        let route = match self.resolve_route(route, &validated) {
            Ok(route) => route,
            Err(e) => return Err(self.fail(plan_id, e)),
        };

        let weather = section(
            weather_departure.into_payload().as_ref().and_then(parse_weather),
            weather_arrival.into_payload().as_ref().and_then(parse_weather),
        )
        .map(|(departure, arrival)| WeatherSection { departure, arrival });
        let tides = section(
            tides_departure.into_payload().as_ref().and_then(parse_tides),
            tides_arrival.into_payload().as_ref().and_then(parse_tides),
        )
        .map(|(departure, arrival)| TideSection { departure, arrival });

        let route_analysis = safety_route_analysis.into_payload().as_ref().and_then(parse_safety);
        let brief = safety_brief.into_payload().as_ref().and_then(parse_safety);

        let mut assessment = match self.scorer.analyze_route(
            &route.waypoints,
            request.draft(),
            request.crew_experience(),
        ) {
            Ok(assessment) => assessment,
            Err(e) => return Err(self.fail(plan_id, e)),
        };
        for report in route_analysis.iter().chain(brief.iter()) {
            assessment = assessment.with_report(report);
        }
        if route_analysis.is_none() || brief.is_none() {
            warn!("Safety provider unavailable, plan carries a critical warning");
            assessment = assessment.with_warning(SafetyNote {
                message: SAFETY_UNAVAILABLE.to_string(),
                severity: Severity::Critical,
            });
        }

        let local_report = assessment_report(&assessment);
        let mut safety_reports = vec![&local_report];
        safety_reports.extend(route_analysis.iter());
        safety_reports.extend(brief.iter());

        let safety_warnings = self
            .aggregator
            .aggregate(
                &BranchReports {
                    safety: safety_reports.clone(),
                    ..BranchReports::default()
                },
                None,
            )
            .warnings;

        let mut weather_reports = Vec::new();
        if let Some(section) = &weather {
            weather_reports.extend(section.departure.iter());
            weather_reports.extend(section.arrival.iter());
        }
        let mut tide_reports = Vec::new();
        if let Some(section) = &tides {
            tide_reports.extend(section.departure.iter());
            tide_reports.extend(section.arrival.iter());
        }
        let aggregated = self.aggregator.aggregate(
            &BranchReports {
                weather: weather_reports,
                tides: tide_reports,
                safety: safety_reports,
            },
            request.preferences.as_ref(),
        );

        let total_distance = route
            .distance_nm
            .unwrap_or_else(|| route_distance_nm(&route.waypoints));
        let cruise_speed = request
            .cruise_speed()
            .unwrap_or(self.safety_config.default_cruise_speed_knots);
        let estimated_duration = route
            .duration_hours
            .unwrap_or(total_distance / cruise_speed);
        let departure_time = validated.departure_time.unwrap_or_else(Utc::now);
        let estimated_arrival = match arrival_time(departure_time, estimated_duration) {
            Some(arrival) => arrival,
            None => {
                let e = PlannerError::validation(format!(
                    "estimated duration {estimated_duration:.1} h is out of range"
                ));
                return Err(self.fail(plan_id, e));
            }
        };

        let mut warnings = aggregated.warnings;
        if request.preferences.as_ref().is_some_and(|p| p.avoid_night) {
            let departure = validated
                .departure
                .waypoint
                .as_ref()
                .or(route.waypoints.first());
            let arrival = validated
                .destination
                .waypoint
                .as_ref()
                .or(route.waypoints.last());
            warnings.extend(night_passage_warnings(
                departure,
                departure_time,
                arrival,
                estimated_arrival,
            ));
        }

        let summary = PlanSummary::new(
            total_distance,
            estimated_duration,
            departure_time,
            estimated_arrival,
            route.waypoints.len(),
            assessment.safety_score,
            warnings,
            aggregated.recommendations,
        );

        let mut plan = PassagePlan {
            id: plan_id,
            created_at: Utc::now(),
            request,
            route: route.waypoints,
            route_source: route.source,
            weather,
            tides,
            safety: SafetySection::new(route_analysis, brief, assessment, safety_warnings),
            summary,
            performance: Performance {
                total_time: 0,
                parallel_time,
                branches_used,
            },
        };
        plan.performance.total_time = elapsed_ms(started);

        if plan.request.user_id.is_some() {
            let outcome = self.persistence.save(&plan).await;
            if let Some(message) = outcome.error {
                plan = plan.with_summary_warning(PlanWarning::new(
                    Severity::Warning,
                    WarningSource::Persistence,
                    message,
                ));
            }
        } else {
            debug!("Anonymous request, plan not persisted");
        }

        info!(
            total_distance = plan.summary.total_distance,
            safety_score = %plan.summary.safety_score,
            warnings = plan.summary.warning_count,
            total_time = plan.performance.total_time,
            "Passage plan assembled"
        );
        self.broadcaster.emit(ProgressEvent::PlanningCompleted {
            request_id: plan_id,
            plan: Box::new(plan.clone()),
        });

        Ok(plan)
    }

    async fn fan_out(
        &self,
        plan_id: Uuid,
        request: &PlanRequest,
        validated: &ValidatedRequest,
    ) -> FanOut {
        for branch in Branch::ALL {
            self.broadcaster.emit(ProgressEvent::AgentActive {
                request_id: plan_id,
                agent: branch.name().to_string(),
                status: branch.status().to_string(),
            });
        }

        let call = move |branch: Branch| {
            call_with_deadline(
                self.providers.for_branch(branch),
                branch,
                branch_args(branch, request, validated),
                self.branch_timeout,
            )
        };

        let (
            route,
            weather_departure,
            weather_arrival,
            tides_departure,
            tides_arrival,
            safety_route_analysis,
            safety_brief,
        ) = tokio::join!(
            call(Branch::Route),
            call(Branch::WeatherDeparture),
            call(Branch::WeatherArrival),
            call(Branch::TidesDeparture),
            call(Branch::TidesArrival),
            call(Branch::SafetyRouteAnalysis),
            call(Branch::SafetyBrief),
        );

        FanOut {
            route,
            weather_departure,
            weather_arrival,
            tides_departure,
            tides_arrival,
            safety_route_analysis,
            safety_brief,
        }
    }

    fn resolve_route(
        &self,
        result: ProviderResult,
        validated: &ValidatedRequest,
    ) -> Result<ResolvedRoute, PlannerError> {
        let outcome = result.describe();
        let report: Option<RouteReport> = result.into_payload().as_ref().and_then(parse_route);

        if report.is_none() {
            warn!(outcome = %outcome, policy = ?self.route_policy, "No usable route from provider");
            if self.route_policy == RouteFailurePolicy::Abort {
                return Err(PlannerError::route_unavailable(format!(
                    "route provider {outcome}"
                )));
            }
        }

        match (&validated.route, report) {
            (Some(supplied), report) => Ok(ResolvedRoute {
                waypoints: supplied.clone(),
                source: RouteSource::Supplied,
                distance_nm: report.as_ref().and_then(|r| r.distance_nm),
                duration_hours: report.as_ref().and_then(|r| r.duration_hours),
            }),
            (None, Some(report)) => Ok(ResolvedRoute {
                waypoints: report.waypoints,
                source: RouteSource::Provider,
                distance_nm: report.distance_nm,
                duration_hours: report.duration_hours,
            }),
            (None, None) => {
                match (&validated.departure.waypoint, &validated.destination.waypoint) {
                    (Some(from), Some(to)) => {
                        info!("Using great-circle fallback route");
                        Ok(ResolvedRoute {
                            waypoints: vec![from.clone(), to.clone()],
                            source: RouteSource::GreatCircleFallback,
                            distance_nm: None,
                            duration_hours: None,
                        })
                    }
                    _ => Err(PlannerError::route_unavailable(
                        "route provider unavailable and departure/destination coordinates are missing",
                    )),
                }
            }
        }
    }

    fn fail(&self, plan_id: Uuid, error: PlannerError) -> PlannerError {
        warn!("Planning failed: {}", error);
        self.broadcaster.emit(ProgressEvent::PlanningError {
            request_id: plan_id,
            message: error.user_message(),
        });
        error
    }
}

/// `None` when neither side produced a report
fn section<T>(departure: Option<T>, arrival: Option<T>) -> Option<(Option<T>, Option<T>)> {
    if departure.is_none() && arrival.is_none() {
        None
    } else {
        Some((departure, arrival))
    }
}

fn assessment_report(assessment: &RouteSafetyAnalysis) -> SafetyReport {
    SafetyReport {
        summary: Some(format!("Local route assessment: {}", assessment.safety_score)),
        warnings: assessment.warnings.clone(),
        hazards: assessment
            .hazards
            .iter()
            .map(|hazard| SafetyNote {
                message: hazard.description.clone(),
                severity: hazard.severity,
            })
            .collect(),
        recommendations: assessment.recommendations.clone(),
    }
}

fn arrival_time(departure: DateTime<Utc>, hours: f64) -> Option<DateTime<Utc>> {
    if !hours.is_finite() || hours < 0.0 {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let millis = (hours * 3_600_000.0).round() as i64;
    TimeDelta::try_milliseconds(millis).and_then(|delta| departure.checked_add_signed(delta))
}

fn elapsed_ms(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

fn port_label(port: &PortRef) -> String {
    match (&port.port, &port.waypoint) {
        (Some(name), _) => name.clone(),
        (None, Some(waypoint)) => waypoint.format_coordinates(),
        (None, None) => "unknown".to_string(),
    }
}

fn port_json(port: &PortRef) -> Value {
    json!({
        "port": port.port,
        "latitude": port.waypoint.as_ref().map(|w| w.latitude),
        "longitude": port.waypoint.as_ref().map(|w| w.longitude),
    })
}

/// Arguments sent to the provider for `branch`
fn branch_args(branch: Branch, request: &PlanRequest, validated: &ValidatedRequest) -> Value {
    let departure = port_json(&validated.departure);
    let destination = port_json(&validated.destination);

    match branch {
        Branch::Route => json!({
            "departure": departure,
            "destination": destination,
            "waypoints": validated.route,
            "vessel": request.vessel,
        }),
        Branch::WeatherDeparture | Branch::TidesDeparture => json!({
            "location": departure,
            "time": validated.departure_time,
        }),
        Branch::WeatherArrival | Branch::TidesArrival => json!({
            "location": destination,
        }),
        Branch::SafetyRouteAnalysis => json!({
            "departure": departure,
            "destination": destination,
            "waypoints": validated.route,
            "vessel": request.vessel,
        }),
        Branch::SafetyBrief => json!({
            "departure": departure,
            "destination": destination,
            "departureTime": validated.departure_time,
            "crew": request.crew,
            "vessel": request.vessel,
        }),
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Departure, Destination, RoutePoint};
    use chrono::TimeZone;
    use rstest::rstest;

    fn validated(route: Option<Vec<Waypoint>>, with_coordinates: bool) -> ValidatedRequest {
        let port = |name: &str, lat: f64, lon: f64| PortRef {
            port: Some(name.to_string()),
            waypoint: with_coordinates.then(|| Waypoint::named(lat, lon, name)),
        };
        ValidatedRequest {
            departure: port("Boston", 42.3601, -71.0589),
            destination: port("Portland", 43.6591, -70.2568),
            departure_time: None,
            route,
        }
    }

    fn planner(policy: RouteFailurePolicy) -> PassagePlanner {
        struct Unused;

        #[async_trait::async_trait]
        impl CapabilityProvider for Unused {
            async fn call(&self, _tool: &str, _args: Value) -> anyhow::Result<Value> {
                anyhow::bail!("unused")
            }
        }

        #[async_trait::async_trait]
        impl PlanStore for Unused {
            async fn save(&self, _plan: &PassagePlan) -> anyhow::Result<()> {
                Ok(())
            }
        }

        let provider: Arc<dyn CapabilityProvider> = Arc::new(Unused);
        PassagePlanner::new(
            Providers {
                route: provider.clone(),
                weather: provider.clone(),
                tidal: provider.clone(),
                safety: provider,
            },
            Arc::new(Unused),
            &PlannerConfig::default(),
        )
        .with_route_policy(policy)
    }

    fn provider_route() -> ProviderResult {
        ProviderResult::Success(json!({
            "waypoints": [
                {"lat": 42.3601, "lon": -71.0589},
                {"lat": 42.9, "lon": -70.6},
                {"lat": 43.6591, "lon": -70.2568}
            ],
            "totalDistance": 88.0
        }))
    }

    #[test]
    fn test_provider_route_is_used() {
        let route = planner(RouteFailurePolicy::default())
            .resolve_route(provider_route(), &validated(None, true))
            .unwrap();
        assert_eq!(route.source, RouteSource::Provider);
        assert_eq!(route.waypoints.len(), 3);
        assert_eq!(route.distance_nm, Some(88.0));
    }

    #[test]
    fn test_supplied_route_wins_over_provider() {
        let supplied = vec![
            Waypoint::new(42.0, -70.0),
            Waypoint::new(42.5, -70.0),
            Waypoint::new(43.0, -70.0),
            Waypoint::new(43.5, -70.0),
        ];
        let route = planner(RouteFailurePolicy::default())
            .resolve_route(provider_route(), &validated(Some(supplied.clone()), true))
            .unwrap();
        assert_eq!(route.source, RouteSource::Supplied);
        assert_eq!(route.waypoints, supplied);
        assert_eq!(route.distance_nm, Some(88.0));
    }

    #[rstest]
    #[case::failure(ProviderResult::Failure(anyhow::anyhow!("down")))]
    #[case::timeout(ProviderResult::TimedOut)]
    #[case::unusable(ProviderResult::Success(json!({"status": "ok"})))]
    fn test_fallback_to_great_circle(#[case] result: ProviderResult) {
        let route = planner(RouteFailurePolicy::GreatCircleFallback)
            .resolve_route(result, &validated(None, true))
            .unwrap();
        assert_eq!(route.source, RouteSource::GreatCircleFallback);
        assert_eq!(route.waypoints.len(), 2);
        assert_eq!(route.distance_nm, None);
    }

    #[test]
    fn test_fallback_needs_coordinates() {
        let err = planner(RouteFailurePolicy::GreatCircleFallback)
            .resolve_route(ProviderResult::TimedOut, &validated(None, false))
            .unwrap_err();
        assert!(matches!(err, PlannerError::RouteUnavailable { .. }));
    }

    #[test]
    fn test_abort_policy_rejects_failed_route() {
        let err = planner(RouteFailurePolicy::Abort)
            .resolve_route(ProviderResult::TimedOut, &validated(None, true))
            .unwrap_err();
        assert!(matches!(err, PlannerError::RouteUnavailable { .. }));
    }

    #[test]
    fn test_arrival_time() {
        let departure = Utc.with_ymd_and_hms(2024, 6, 21, 8, 0, 0).unwrap();
        assert_eq!(
            arrival_time(departure, 2.5),
            Some(Utc.with_ymd_and_hms(2024, 6, 21, 10, 30, 0).unwrap())
        );
        assert_eq!(arrival_time(departure, f64::INFINITY), None);
        assert_eq!(arrival_time(departure, -1.0), None);
    }

    #[test]
    fn test_section_is_none_only_when_both_sides_fail() {
        assert_eq!(section::<u8>(None, None), None);
        assert_eq!(section(Some(1), None), Some((Some(1), None)));
    }

    #[test]
    fn test_branch_args_carry_ports() {
        let request = PlanRequest {
            departure: Some(Departure {
                port: Some("Boston".to_string()),
                latitude: Some(42.3601),
                longitude: Some(-71.0589),
                time: None,
            }),
            destination: Some(Destination {
                port: Some("Portland".to_string()),
                latitude: Some(43.6591),
                longitude: Some(-70.2568),
            }),
            route: Some(vec![RoutePoint {
                latitude: Some(42.5),
                longitude: Some(-70.8),
                name: None,
            }]),
            ..Default::default()
        };
        let validated = request.validate().unwrap();

        let weather = branch_args(Branch::WeatherArrival, &request, &validated);
        assert_eq!(weather["location"]["port"], "Portland");

        let route = branch_args(Branch::Route, &request, &validated);
        assert_eq!(route["departure"]["latitude"], 42.3601);
        assert_eq!(route["waypoints"].as_array().unwrap().len(), 1);
    }
}
