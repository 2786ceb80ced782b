//! Normalized provider reports.
//!
//! Each capability provider returns its own payload shape. The adapters in
//! [`crate::provider::adapter`] turn those payloads into these types so the
//! rest of the planner never inspects raw JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::Waypoint;

/// Severity attached to warnings and hazards
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl Severity {
    /// Lenient parse of provider severity labels; unknown labels count as warnings
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "info" | "low" | "advisory" | "notice" => Severity::Info,
            "critical" | "high" | "severe" | "danger" | "extreme" => Severity::Critical,
            _ => Severity::Warning,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Critical => write!(f, "critical"),
        }
    }
}

/// Route as proposed by the route provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RouteReport {
    pub waypoints: Vec<Waypoint>,
    pub distance_nm: Option<f64>,
    pub duration_hours: Option<f64>,
}

/// Unit in which a provider reports wave heights
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum WaveUnit {
    #[default]
    Feet,
    Meters,
}

impl WaveUnit {
    #[must_use]
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "ft" | "feet" | "foot" => Some(WaveUnit::Feet),
            "m" | "meter" | "meters" | "metre" | "metres" => Some(WaveUnit::Meters),
            _ => None,
        }
    }

    #[must_use]
    pub fn abbreviation(self) -> &'static str {
        match self {
            WaveUnit::Feet => "ft",
            WaveUnit::Meters => "m",
        }
    }
}

/// One forecast entry; either measurement may be missing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct ForecastPoint {
    pub time: Option<DateTime<Utc>>,
    /// Sustained wind in knots
    pub wind_speed_knots: Option<f64>,
    pub wave_height: Option<f64>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct WeatherReport {
    pub points: Vec<ForecastPoint>,
    pub wave_unit: WaveUnit,
    /// Advisories issued by the provider itself (gale warnings etc.)
    pub advisories: Vec<String>,
}

impl WeatherReport {
    #[must_use]
    pub fn max_wind_knots(&self) -> Option<f64> {
        max_of(self.points.iter().filter_map(|p| p.wind_speed_knots))
    }

    #[must_use]
    pub fn max_wave_height(&self) -> Option<f64> {
        max_of(self.points.iter().filter_map(|p| p.wave_height))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TideKind {
    High,
    Low,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TideExtreme {
    pub time: Option<DateTime<Utc>>,
    pub height: f64,
    pub kind: Option<TideKind>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct TideReport {
    pub extremes: Vec<TideExtreme>,
    pub advisories: Vec<String>,
}

/// A warning or hazard reported by the safety provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SafetyNote {
    pub message: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    pub summary: Option<String>,
    pub warnings: Vec<SafetyNote>,
    pub hazards: Vec<SafetyNote>,
    pub recommendations: Vec<String>,
}

fn max_of(values: impl Iterator<Item = f64>) -> Option<f64> {
    values.filter(|v| v.is_finite()).fold(None, |acc, v| match acc {
        Some(current) if current >= v => Some(current),
        _ => Some(v),
    })
}
