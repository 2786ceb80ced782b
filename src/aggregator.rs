//! Warning aggregation across weather, tide and safety reports
//!
//! Folds the normalized branch reports into the flat, de-duplicated
//! warnings and recommendations shown in the plan summary.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SafetyConfig;
use crate::models::{
    PlanWarning, Preferences, SafetyReport, Severity, TideReport, WarningSource, WaveUnit,
    WeatherReport,
};
use crate::safety::scorer::dedup_in_order;

/// Beaufort force 8
const GALE_KNOTS: f64 = 34.0;
const METERS_PER_FOOT: f64 = 0.3048;

/// Reports that survived the fan-out; absent branches simply contribute nothing
#[derive(Debug, Default)]
pub struct BranchReports<'a> {
    pub weather: Vec<&'a WeatherReport>,
    pub tides: Vec<&'a TideReport>,
    pub safety: Vec<&'a SafetyReport>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AggregatedWarnings {
    pub warnings: Vec<PlanWarning>,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct WarningAggregator {
    strong_wind_knots: f64,
    rough_seas_height: f64,
}

impl Default for WarningAggregator {
    fn default() -> Self {
        Self::new(&SafetyConfig::default())
    }
}

impl WarningAggregator {
    #[must_use]
    pub fn new(config: &SafetyConfig) -> Self {
        Self {
            strong_wind_knots: config.strong_wind_knots,
            rough_seas_height: config.rough_seas_height,
        }
    }

    /// Aggregate all branch reports into summary warnings and recommendations
    #[must_use]
    pub fn aggregate(
        &self,
        reports: &BranchReports<'_>,
        preferences: Option<&Preferences>,
    ) -> AggregatedWarnings {
        let mut out = AggregatedWarnings::default();

        self.weather_warnings(&reports.weather, preferences, &mut out);

        for tide in &reports.tides {
            for advisory in &tide.advisories {
                out.warnings.push(PlanWarning::new(
                    Severity::Warning,
                    WarningSource::Tides,
                    advisory.clone(),
                ));
            }
        }

        for safety in &reports.safety {
            for note in &safety.warnings {
                out.warnings.push(PlanWarning::new(
                    note.severity,
                    WarningSource::Safety,
                    note.message.clone(),
                ));
            }
            for hazard in &safety.hazards {
                out.warnings.push(PlanWarning::new(
                    hazard.severity,
                    WarningSource::Safety,
                    format!("Hazard: {}", hazard.message),
                ));
            }
            out.recommendations
                .extend(safety.recommendations.iter().cloned());
        }

        dedup_warnings(&mut out.warnings);
        dedup_in_order(&mut out.recommendations);

        debug!(
            warnings = out.warnings.len(),
            recommendations = out.recommendations.len(),
            "Aggregated branch warnings"
        );
        out
    }

    fn weather_warnings(
        &self,
        weather: &[&WeatherReport],
        preferences: Option<&Preferences>,
        out: &mut AggregatedWarnings,
    ) {
        let max_wind = weather
            .iter()
            .filter_map(|report| report.max_wind_knots())
            .fold(None, |acc: Option<f64>, w| Some(acc.map_or(w, |a| a.max(w))));

        // (height, unit) of the highest forecast sea, compared in metres
        let max_wave = weather
            .iter()
            .filter_map(|report| report.max_wave_height().map(|h| (h, report.wave_unit)))
            .fold(None, |acc: Option<(f64, WaveUnit)>, candidate| match acc {
                Some(best) if to_meters(best) >= to_meters(candidate) => Some(best),
                _ => Some(candidate),
            });

        if let Some(wind) = max_wind {
            if wind > self.strong_wind_knots {
                let severity = if wind >= GALE_KNOTS {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                out.warnings.push(PlanWarning::new(
                    severity,
                    WarningSource::Weather,
                    format!("Strong winds forecast: up to {wind:.0} knots"),
                ));
                out.recommendations
                    .push("Consider delaying departure or reef early".to_string());
            }
            if let Some(limit) = preferences.and_then(|p| p.max_wind_speed) {
                if wind > limit {
                    out.warnings.push(PlanWarning::new(
                        Severity::Warning,
                        WarningSource::Preferences,
                        format!(
                            "Forecast wind of {wind:.0} knots exceeds your preferred maximum of {limit:.0} knots"
                        ),
                    ));
                }
            }
        }

        // Each report declares its own unit; the threshold applies in that unit
        let rough = weather
            .iter()
            .filter_map(|report| report.max_wave_height().map(|h| (h, report.wave_unit)))
            .filter(|(height, _)| *height > self.rough_seas_height)
            .fold(None, |acc: Option<(f64, WaveUnit)>, candidate| match acc {
                Some(best) if to_meters(best) >= to_meters(candidate) => Some(best),
                _ => Some(candidate),
            });

        if let Some((height, unit)) = rough {
            out.warnings.push(PlanWarning::new(
                Severity::Warning,
                WarningSource::Weather,
                format!(
                    "Rough seas forecast: waves up to {height:.1} {}",
                    unit.abbreviation()
                ),
            ));
            out.recommendations
                .push("Secure loose gear and prepare the crew for rough conditions".to_string());
        }

        if let (Some((height, unit)), Some(limit)) =
            (max_wave, preferences.and_then(|p| p.max_wave_height))
        {
            if height > limit {
                out.warnings.push(PlanWarning::new(
                    Severity::Warning,
                    WarningSource::Preferences,
                    format!(
                        "Forecast waves of {height:.1} {} exceed your preferred maximum of {limit:.1}",
                        unit.abbreviation()
                    ),
                ));
            }
        }

        for report in weather {
            for advisory in &report.advisories {
                out.warnings.push(PlanWarning::new(
                    Severity::Warning,
                    WarningSource::Weather,
                    advisory.clone(),
                ));
            }
        }
    }
}

fn to_meters((height, unit): (f64, WaveUnit)) -> f64 {
    match unit {
        WaveUnit::Meters => height,
        WaveUnit::Feet => height * METERS_PER_FOOT,
    }
}

/// Keeps the first occurrence of each message, raised to the highest severity seen
fn dedup_warnings(warnings: &mut Vec<PlanWarning>) {
    let mut seen: HashSet<String> = HashSet::new();
    let mut merged: Vec<PlanWarning> = Vec::with_capacity(warnings.len());

    for warning in warnings.drain(..) {
        if seen.insert(warning.message.clone()) {
            merged.push(warning);
        } else if let Some(existing) = merged.iter_mut().find(|w| w.message == warning.message) {
            existing.severity = existing.severity.max(warning.severity);
        }
    }

    *warnings = merged;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ForecastPoint, SafetyNote};
    use rstest::rstest;

    fn weather(points: &[(Option<f64>, Option<f64>)], unit: WaveUnit) -> WeatherReport {
        WeatherReport {
            points: points
                .iter()
                .map(|(wind, wave)| ForecastPoint {
                    wind_speed_knots: *wind,
                    wave_height: *wave,
                    ..Default::default()
                })
                .collect(),
            wave_unit: unit,
            advisories: Vec::new(),
        }
    }

    fn messages(out: &AggregatedWarnings) -> Vec<&str> {
        out.warnings.iter().map(|w| w.message.as_str()).collect()
    }

    #[rstest]
    #[case(25.0, false)]
    #[case(25.1, true)]
    #[case(40.0, true)]
    fn test_strong_wind_threshold(#[case] wind: f64, #[case] expected: bool) {
        let report = weather(&[(Some(10.0), None), (Some(wind), None)], WaveUnit::Feet);
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                weather: vec![&report],
                ..Default::default()
            },
            None,
        );
        let has_strong = messages(&out).iter().any(|m| m.contains("Strong winds"));
        assert_eq!(has_strong, expected);
    }

    #[test]
    fn test_gale_is_critical() {
        let report = weather(&[(Some(38.0), None)], WaveUnit::Feet);
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                weather: vec![&report],
                ..Default::default()
            },
            None,
        );
        assert_eq!(out.warnings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_max_taken_across_departure_and_arrival() {
        let departure = weather(&[(Some(12.0), Some(1.0))], WaveUnit::Feet);
        let arrival = weather(&[(Some(27.0), Some(2.0)), (None, Some(4.5))], WaveUnit::Feet);
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                weather: vec![&departure, &arrival],
                ..Default::default()
            },
            None,
        );
        let messages = messages(&out);
        assert!(messages.contains(&"Strong winds forecast: up to 27 knots"));
        assert!(messages.contains(&"Rough seas forecast: waves up to 4.5 ft"));
    }

    #[test]
    fn test_wave_threshold_uses_declared_unit() {
        let meters = weather(&[(None, Some(2.5))], WaveUnit::Meters);
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                weather: vec![&meters],
                ..Default::default()
            },
            None,
        );
        assert!(out.warnings.is_empty());

        let meters = weather(&[(None, Some(3.5))], WaveUnit::Meters);
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                weather: vec![&meters],
                ..Default::default()
            },
            None,
        );
        assert_eq!(messages(&out), vec!["Rough seas forecast: waves up to 3.5 m"]);
    }

    #[test]
    fn test_preferences_thresholds() {
        let report = weather(&[(Some(18.0), Some(2.0))], WaveUnit::Feet);
        let preferences = Preferences {
            avoid_night: false,
            max_wind_speed: Some(15.0),
            max_wave_height: Some(1.5),
        };
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                weather: vec![&report],
                ..Default::default()
            },
            Some(&preferences),
        );
        assert_eq!(out.warnings.len(), 2);
        assert!(
            out.warnings
                .iter()
                .all(|w| w.source == WarningSource::Preferences)
        );
    }

    #[test]
    fn test_safety_merge_and_dedup() {
        let brief = SafetyReport {
            summary: None,
            warnings: vec![SafetyNote {
                message: "Fog expected".to_string(),
                severity: Severity::Warning,
            }],
            hazards: vec![SafetyNote {
                message: "Ledges off Cape Ann".to_string(),
                severity: Severity::Critical,
            }],
            recommendations: vec!["Monitor VHF 16".to_string()],
        };
        let analysis = SafetyReport {
            summary: None,
            warnings: vec![SafetyNote {
                message: "Fog expected".to_string(),
                severity: Severity::Critical,
            }],
            hazards: vec![],
            recommendations: vec!["Monitor VHF 16".to_string(), "Carry a radar reflector".to_string()],
        };
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                safety: vec![&brief, &analysis],
                ..Default::default()
            },
            None,
        );

        assert_eq!(out.warnings.len(), 2);
        assert_eq!(out.warnings[0].message, "Fog expected");
        assert_eq!(out.warnings[0].severity, Severity::Critical);
        assert_eq!(out.warnings[1].message, "Hazard: Ledges off Cape Ann");
        assert_eq!(
            out.recommendations,
            vec!["Monitor VHF 16".to_string(), "Carry a radar reflector".to_string()]
        );
    }

    #[test]
    fn test_tide_advisories_and_empty_input() {
        let tides = TideReport {
            extremes: vec![],
            advisories: vec!["Strong ebb current in the channel".to_string()],
        };
        let out = WarningAggregator::default().aggregate(
            &BranchReports {
                tides: vec![&tides],
                ..Default::default()
            },
            None,
        );
        assert_eq!(out.warnings[0].source, WarningSource::Tides);

        let empty = WarningAggregator::default().aggregate(&BranchReports::default(), None);
        assert!(empty.warnings.is_empty());
        assert!(empty.recommendations.is_empty());
    }
}
