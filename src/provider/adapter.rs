//! Provider payload adapters.
//!
//! Providers answer with flat arrays, arrays of per-waypoint arrays, or
//! objects wrapping either. These functions resolve the shape once and
//! produce the typed reports from [`crate::models`]. Entries that lack the
//! expected fields are skipped; nothing here fails.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{
    ForecastPoint, RouteReport, SafetyNote, SafetyReport, Severity, TideExtreme, TideKind,
    TideReport, WaveUnit, Waypoint, WeatherReport,
};

const ENVELOPE_KEYS: &[&str] = &["data", "result", "response"];
const MAX_NESTING: usize = 4;
const SAFETY_KEYS: &[&str] = &[
    "summary",
    "brief",
    "text",
    "warnings",
    "alerts",
    "hazards",
    "recommendations",
    "advice",
];

const KNOTS_PER_MS: f64 = 1.943_844;
const KNOTS_PER_KMH: f64 = 0.539_957;
const KNOTS_PER_MPH: f64 = 0.868_976;

/// Route payload to a route report; `None` when no usable waypoint list exists
#[must_use]
pub fn parse_route(payload: &Value) -> Option<RouteReport> {
    let body = unwrap_envelope(payload);

    let (points, meta) = match body {
        Value::Array(items) => (items, None),
        Value::Object(obj) => {
            let items = field(obj, &["waypoints", "route", "points"])?.as_array()?;
            (items, Some(obj))
        }
        _ => return None,
    };

    let waypoints: Option<Vec<Waypoint>> = points.iter().map(parse_waypoint).collect();
    let waypoints = waypoints.filter(|w| !w.is_empty())?;

    let distance_nm = meta
        .and_then(|obj| field(obj, &["totalDistance", "distance", "distanceNm", "distance_nm"]))
        .and_then(number)
        .filter(|d| *d >= 0.0);
    let duration_hours = meta
        .and_then(|obj| {
            field(
                obj,
                &["estimatedDuration", "duration", "durationHours", "duration_hours"],
            )
        })
        .and_then(number)
        .filter(|d| *d >= 0.0);

    Some(RouteReport {
        waypoints,
        distance_nm,
        duration_hours,
    })
}

/// Weather payload to a report; `None` only for a null payload
#[must_use]
pub fn parse_weather(payload: &Value) -> Option<WeatherReport> {
    if payload.is_null() {
        return None;
    }
    let body = unwrap_envelope(payload);

    let mut report = WeatherReport::default();
    let mut wind_factor = 1.0;
    let mut entries: &Value = body;

    if let Value::Object(obj) = body {
        if let Some(unit) = field(obj, &["waveUnit", "wave_unit", "unit", "units"])
            .and_then(unit_label)
            .and_then(WaveUnit::from_label)
        {
            report.wave_unit = unit;
        }
        if let Some(factor) = field(obj, &["windUnit", "wind_unit"])
            .and_then(Value::as_str)
            .and_then(wind_to_knots)
        {
            wind_factor = factor;
        }
        report.advisories = strings(field(obj, &["warnings", "advisories", "alerts"]));
        entries = field(obj, &["forecast", "forecasts", "points", "hourly", "periods"])
            .unwrap_or(body);
    }

    let mut flat = Vec::new();
    flatten(entries, 0, &mut flat);
    report.points = flat
        .into_iter()
        .filter_map(|entry| parse_forecast_point(entry, wind_factor))
        .collect();

    debug!(
        points = report.points.len(),
        advisories = report.advisories.len(),
        "Normalized weather payload"
    );
    Some(report)
}

/// Tide payload to a report; `None` only for a null payload
#[must_use]
pub fn parse_tides(payload: &Value) -> Option<TideReport> {
    if payload.is_null() {
        return None;
    }
    let body = unwrap_envelope(payload);

    let mut report = TideReport::default();
    let mut entries: &Value = body;
    if let Value::Object(obj) = body {
        report.advisories = strings(field(obj, &["warnings", "advisories", "alerts"]));
        entries = field(obj, &["extremes", "predictions", "tides", "events"]).unwrap_or(body);
    }

    let mut flat = Vec::new();
    flatten(entries, 0, &mut flat);
    report.extremes = flat.into_iter().filter_map(parse_tide_extreme).collect();
    Some(report)
}

/// Safety payload to a report; `None` when nothing in it is recognisable
#[must_use]
pub fn parse_safety(payload: &Value) -> Option<SafetyReport> {
    if payload.is_null() {
        return None;
    }
    let body = unwrap_envelope(payload);

    let obj = match body {
        Value::Object(obj) => obj,
        // A bare list is read as warnings
        Value::Array(_) => {
            return Some(SafetyReport {
                warnings: notes(Some(body), Severity::Warning),
                ..Default::default()
            });
        }
        _ => {
            debug!("Safety payload is neither an object nor a list");
            return None;
        }
    };
    if field(obj, SAFETY_KEYS).is_none() {
        debug!("Safety payload has no recognised fields");
        return None;
    }

    let mut recommendations = strings(field(obj, &["recommendations", "advice"]));
    recommendations.dedup();

    Some(SafetyReport {
        summary: field(obj, &["summary", "brief", "text"])
            .and_then(Value::as_str)
            .map(String::from),
        warnings: notes(field(obj, &["warnings", "alerts"]), Severity::Warning),
        hazards: notes(field(obj, &["hazards"]), Severity::Warning),
        recommendations,
    })
}

fn unwrap_envelope(value: &Value) -> &Value {
    let mut current = value;
    for _ in 0..MAX_NESTING {
        let Value::Object(obj) = current else { break };
        match field(obj, ENVELOPE_KEYS) {
            Some(inner) if inner.is_object() || inner.is_array() => current = inner,
            _ => break,
        }
    }
    current
}

fn flatten<'a>(value: &'a Value, depth: usize, out: &mut Vec<&'a Value>) {
    match value {
        Value::Array(items) if depth < MAX_NESTING => {
            for item in items {
                flatten(item, depth + 1, out);
            }
        }
        Value::Object(_) => out.push(value),
        _ => {}
    }
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| obj.get(*key))
        .filter(|v| !v.is_null())
}

/// Numbers, and numeric strings as NOAA-style feeds send them
fn number(value: &Value) -> Option<f64> {
    let parsed = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn unit_label(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(obj) => field(obj, &["waveHeight", "wave_height", "waves"])?.as_str(),
        _ => None,
    }
}

fn wind_to_knots(label: &str) -> Option<f64> {
    match label.trim().to_ascii_lowercase().as_str() {
        "kt" | "kts" | "knots" | "kn" => Some(1.0),
        "m/s" | "ms" | "mps" => Some(KNOTS_PER_MS),
        "km/h" | "kmh" | "kph" => Some(KNOTS_PER_KMH),
        "mph" => Some(KNOTS_PER_MPH),
        _ => None,
    }
}

fn time(value: Option<&Value>) -> Option<DateTime<Utc>> {
    let text = value?.as_str()?;
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .map(|dt| dt.and_utc())
}

fn parse_waypoint(value: &Value) -> Option<Waypoint> {
    let obj = value.as_object()?;
    let latitude = field(obj, &["latitude", "lat"]).and_then(number)?;
    let longitude = field(obj, &["longitude", "lon", "lng"]).and_then(number)?;
    let waypoint = Waypoint {
        latitude,
        longitude,
        name: field(obj, &["name", "port"])
            .and_then(Value::as_str)
            .map(String::from),
    };
    waypoint.validate().ok()?;
    Some(waypoint)
}

fn parse_forecast_point(value: &Value, wind_factor: f64) -> Option<ForecastPoint> {
    let obj = value.as_object()?;
    let wind = field(obj, &["windSpeed", "wind_speed", "windSpeedKnots", "wind"])
        .and_then(number)
        .map(|w| w * wind_factor);
    let wave = field(obj, &["waveHeight", "wave_height", "waves", "swellHeight"]).and_then(number);

    if wind.is_none() && wave.is_none() {
        return None;
    }

    Some(ForecastPoint {
        time: time(field(obj, &["time", "timestamp", "t"])),
        wind_speed_knots: wind,
        wave_height: wave,
        description: field(obj, &["description", "conditions", "summary"])
            .and_then(Value::as_str)
            .map(String::from),
    })
}

fn parse_tide_extreme(value: &Value) -> Option<TideExtreme> {
    let obj = value.as_object()?;
    let height = field(obj, &["height", "v", "value"]).and_then(number)?;
    let kind = field(obj, &["type", "kind"])
        .and_then(Value::as_str)
        .and_then(|label| match label.trim().to_ascii_lowercase().as_str() {
            "h" | "high" | "hh" => Some(TideKind::High),
            "l" | "low" | "ll" => Some(TideKind::Low),
            _ => None,
        });

    Some(TideExtreme {
        time: time(field(obj, &["time", "t", "timestamp"])),
        height,
        kind,
    })
}

fn strings(value: Option<&Value>) -> Vec<String> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(s.clone()),
            Value::Object(obj) => message(obj),
            _ => None,
        })
        .filter(|s| !s.trim().is_empty())
        .collect()
}

fn notes(value: Option<&Value>, default: Severity) -> Vec<SafetyNote> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match item {
            Value::String(s) => Some(SafetyNote {
                message: s.clone(),
                severity: default,
            }),
            Value::Object(obj) => Some(SafetyNote {
                message: message(obj)?,
                severity: field(obj, &["severity", "level", "priority"])
                    .and_then(Value::as_str)
                    .map_or(default, Severity::from_label),
            }),
            _ => None,
        })
        .filter(|note| !note.message.trim().is_empty())
        .collect()
}

fn message(obj: &Map<String, Value>) -> Option<String> {
    field(obj, &["message", "description", "text", "title"])
        .and_then(Value::as_str)
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    #[rstest]
    #[case::flat(json!([{"windSpeed": 12}, {"windSpeed": 28, "waveHeight": 4}]))]
    #[case::per_waypoint(json!([[{"windSpeed": 12}], [{"windSpeed": 28, "waveHeight": 4}]]))]
    #[case::wrapped(json!({"forecast": [{"windSpeed": 12}, {"windSpeed": 28, "waveHeight": 4}]}))]
    #[case::enveloped(json!({"data": {"hourly": [[{"windSpeed": 12}, {"windSpeed": 28, "waveHeight": 4}]]}}))]
    fn test_weather_shapes_normalize_identically(#[case] payload: Value) {
        let report = parse_weather(&payload).unwrap();
        assert_eq!(report.points.len(), 2);
        assert_eq!(report.max_wind_knots(), Some(28.0));
        assert_eq!(report.max_wave_height(), Some(4.0));
    }

    #[test]
    fn test_weather_skips_entries_without_numbers() {
        let payload = json!([
            {"windSpeed": "n/a"},
            {"description": "fog"},
            "garbage",
            42,
            {"wind_speed": 10.0}
        ]);
        let report = parse_weather(&payload).unwrap();
        assert_eq!(report.points.len(), 1);
        assert_eq!(report.max_wind_knots(), Some(10.0));
    }

    #[test]
    fn test_weather_units() {
        let payload = json!({
            "windUnit": "m/s",
            "units": {"waveHeight": "m"},
            "forecast": [{"windSpeed": 10.0, "waveHeight": 1.0}]
        });
        let report = parse_weather(&payload).unwrap();
        assert_eq!(report.wave_unit, WaveUnit::Meters);
        let wind = report.max_wind_knots().unwrap();
        assert!((wind - 19.44).abs() < 0.01);
    }

    #[test]
    fn test_null_payloads() {
        assert!(parse_weather(&Value::Null).is_none());
        assert!(parse_tides(&Value::Null).is_none());
        assert!(parse_safety(&Value::Null).is_none());
        assert!(parse_route(&Value::Null).is_none());
    }

    #[test]
    fn test_route_with_metadata() {
        let payload = json!({
            "data": {
                "waypoints": [
                    {"lat": 42.36, "lon": -71.05, "name": "Boston"},
                    {"latitude": 43.66, "longitude": -70.26}
                ],
                "totalDistance": 86.1,
                "estimatedDuration": "17.2"
            }
        });

        let report = parse_route(&payload).unwrap();
        assert_eq!(report.waypoints.len(), 2);
        assert_eq!(report.waypoints[0].name.as_deref(), Some("Boston"));
        assert_eq!(report.distance_nm, Some(86.1));
        assert_eq!(report.duration_hours, Some(17.2));
    }

    #[test]
    fn test_route_rejects_invalid_waypoint() {
        let payload = json!([{"lat": 42.0, "lon": -70.0}, {"lat": 95.0, "lon": -70.0}]);
        assert!(parse_route(&payload).is_none());
        assert!(parse_route(&json!([])).is_none());
    }

    #[test]
    fn test_noaa_style_tides() {
        let payload = json!({
            "predictions": [
                {"t": "2026-06-01 05:12", "v": "9.87", "type": "H"},
                {"t": "2026-06-01 11:30", "v": "0.42", "type": "L"},
                {"t": "2026-06-01 17:40", "v": "bad"}
            ]
        });
        let report = parse_tides(&payload).unwrap();
        assert_eq!(report.extremes.len(), 2);
        assert_eq!(report.extremes[0].kind, Some(TideKind::High));
        assert_eq!(report.extremes[1].height, 0.42);
        assert!(report.extremes[0].time.is_some());
    }

    #[test]
    fn test_safety_notes_and_severity() {
        let payload = json!({
            "summary": "Busy shipping lanes",
            "warnings": ["Fog expected after 18:00", {"message": "Gale warning", "severity": "high"}],
            "hazards": [{"description": "Ledges off Cape Ann"}],
            "recommendations": ["Monitor VHF 16", "Monitor VHF 16"]
        });
        let report = parse_safety(&payload).unwrap();
        assert_eq!(report.summary.as_deref(), Some("Busy shipping lanes"));
        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[1].severity, Severity::Critical);
        assert_eq!(report.hazards[0].severity, Severity::Warning);
        assert_eq!(report.recommendations, vec!["Monitor VHF 16".to_string()]);
    }

    #[rstest]
    #[case::text(json!("internal error"))]
    #[case::number(json!(500))]
    #[case::unknown_object(json!({"status": "error", "code": 500}))]
    #[case::enveloped_text(json!({"data": {"error": "upstream timeout"}}))]
    fn test_unrecognised_safety_payload_is_unavailable(#[case] payload: Value) {
        assert!(parse_safety(&payload).is_none());
    }

    #[test]
    fn test_safety_list_reads_as_warnings() {
        let report = parse_safety(&json!(["Fog bank off Cape Ann"])).unwrap();
        assert_eq!(report.warnings.len(), 1);
    }
}
