//! Capability provider boundary
//!
//! Route, weather, tidal and safety data come from external providers that
//! share one call signature. Each fanned-out call is bounded by a deadline
//! and settles into a [`ProviderResult`].

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

pub mod adapter;

pub const ROUTE_TOOL: &str = "route.plan";
pub const WEATHER_TOOL: &str = "weather.forecast";
pub const TIDES_TOOL: &str = "tides.predict";
pub const SAFETY_ROUTE_TOOL: &str = "safety.route_analysis";
pub const SAFETY_BRIEF_TOOL: &str = "safety.brief";

/// External source of one category of passage data.
///
/// Payloads are provider-specific; nothing may be assumed about their shape
/// beyond what [`adapter`] tolerates.
#[async_trait]
pub trait CapabilityProvider: Send + Sync {
    async fn call(&self, tool: &str, args: Value) -> anyhow::Result<Value>;
}

/// Settled outcome of one branch
#[derive(Debug)]
pub enum ProviderResult {
    Success(Value),
    Failure(anyhow::Error),
    TimedOut,
}

impl ProviderResult {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, ProviderResult::Success(_))
    }

    /// The payload, if the call succeeded
    #[must_use]
    pub fn into_payload(self) -> Option<Value> {
        match self {
            ProviderResult::Success(value) => Some(value),
            ProviderResult::Failure(_) | ProviderResult::TimedOut => None,
        }
    }

    /// Short description for logs and warnings
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            ProviderResult::Success(_) => "ok".to_string(),
            ProviderResult::Failure(e) => format!("failed: {e}"),
            ProviderResult::TimedOut => "timed out".to_string(),
        }
    }
}

/// One fanned-out call within a planning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Branch {
    Route,
    WeatherDeparture,
    WeatherArrival,
    TidesDeparture,
    TidesArrival,
    SafetyRouteAnalysis,
    SafetyBrief,
}

impl Branch {
    pub const ALL: [Branch; 7] = [
        Branch::Route,
        Branch::WeatherDeparture,
        Branch::WeatherArrival,
        Branch::TidesDeparture,
        Branch::TidesArrival,
        Branch::SafetyRouteAnalysis,
        Branch::SafetyBrief,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Branch::Route => "route",
            Branch::WeatherDeparture => "weather_departure",
            Branch::WeatherArrival => "weather_arrival",
            Branch::TidesDeparture => "tides_departure",
            Branch::TidesArrival => "tides_arrival",
            Branch::SafetyRouteAnalysis => "safety_route_analysis",
            Branch::SafetyBrief => "safety_brief",
        }
    }

    #[must_use]
    pub fn tool(self) -> &'static str {
        match self {
            Branch::Route => ROUTE_TOOL,
            Branch::WeatherDeparture | Branch::WeatherArrival => WEATHER_TOOL,
            Branch::TidesDeparture | Branch::TidesArrival => TIDES_TOOL,
            Branch::SafetyRouteAnalysis => SAFETY_ROUTE_TOOL,
            Branch::SafetyBrief => SAFETY_BRIEF_TOOL,
        }
    }

    /// Human status line broadcast while the branch runs
    #[must_use]
    pub fn status(self) -> &'static str {
        match self {
            Branch::Route => "Calculating route",
            Branch::WeatherDeparture => "Fetching weather at departure",
            Branch::WeatherArrival => "Fetching weather at destination",
            Branch::TidesDeparture => "Fetching tides at departure",
            Branch::TidesArrival => "Fetching tides at destination",
            Branch::SafetyRouteAnalysis => "Analyzing route hazards",
            Branch::SafetyBrief => "Preparing safety brief",
        }
    }
}

impl std::fmt::Display for Branch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Calls `provider` and races the call against `deadline`.
///
/// On expiry the provider future is dropped, which cancels it at its next
/// await point; a late result can therefore never be observed.
pub async fn call_with_deadline(
    provider: &dyn CapabilityProvider,
    branch: Branch,
    args: Value,
    deadline: Duration,
) -> ProviderResult {
    debug!(branch = branch.name(), tool = branch.tool(), "Calling provider");

    let result = match tokio::time::timeout(deadline, provider.call(branch.tool(), args)).await {
        Ok(Ok(value)) => ProviderResult::Success(value),
        Ok(Err(e)) => ProviderResult::Failure(e),
        Err(_) => ProviderResult::TimedOut,
    };

    if !result.is_success() {
        warn!(branch = branch.name(), "Provider branch {}", result.describe());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct Echo;

    #[async_trait]
    impl CapabilityProvider for Echo {
        async fn call(&self, tool: &str, args: Value) -> anyhow::Result<Value> {
            Ok(json!({"tool": tool, "args": args}))
        }
    }

    struct Broken;

    #[async_trait]
    impl CapabilityProvider for Broken {
        async fn call(&self, _tool: &str, _args: Value) -> anyhow::Result<Value> {
            Err(anyhow!("503 from upstream"))
        }
    }

    struct Slow {
        finished: Arc<AtomicBool>,
    }

    #[async_trait]
    impl CapabilityProvider for Slow {
        async fn call(&self, _tool: &str, _args: Value) -> anyhow::Result<Value> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            self.finished.store(true, Ordering::SeqCst);
            Ok(json!({}))
        }
    }

    #[tokio::test]
    async fn test_success_carries_payload() {
        let result =
            call_with_deadline(&Echo, Branch::SafetyBrief, json!({"x": 1}), Duration::from_secs(1))
                .await;
        let payload = result.into_payload().unwrap();
        assert_eq!(payload["tool"], "safety.brief");
        assert_eq!(payload["args"]["x"], 1);
    }

    #[tokio::test]
    async fn test_failure_is_captured() {
        let result =
            call_with_deadline(&Broken, Branch::Route, json!({}), Duration::from_secs(1)).await;
        assert!(matches!(result, ProviderResult::Failure(_)));
        assert!(result.describe().contains("503"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_drops_late_result() {
        let finished = Arc::new(AtomicBool::new(false));
        let slow = Slow {
            finished: finished.clone(),
        };

        let result =
            call_with_deadline(&slow, Branch::WeatherArrival, json!({}), Duration::from_secs(30))
                .await;
        assert!(matches!(result, ProviderResult::TimedOut));

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert!(!finished.load(Ordering::SeqCst));
    }

    #[test]
    fn test_branch_names_are_unique() {
        let names: std::collections::HashSet<_> = Branch::ALL.iter().map(|b| b.name()).collect();
        assert_eq!(names.len(), Branch::ALL.len());
    }
}
