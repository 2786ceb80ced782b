//! Passage plan request as received from the transport layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::location::{Waypoint, validate_coordinates};
use crate::PlannerError;

/// A request to plan one passage.
///
/// Departure and destination are optional at the serde level so that a
/// missing port is reported as a validation error rather than a parse error.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlanRequest {
    pub departure: Option<Departure>,
    pub destination: Option<Destination>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vessel: Option<Vessel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crew: Option<Crew>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<Preferences>,
    /// Caller-supplied sail path; authoritative when present
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<Vec<RoutePoint>>,
    /// Identifying principal; anonymous requests are not persisted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Departure {
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Destination {
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

/// Route point as supplied by the caller, before validation
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoutePoint {
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vessel {
    #[serde(default, rename = "type")]
    pub vessel_type: Option<String>,
    /// Cruise speed in knots
    #[serde(default)]
    pub cruise_speed: Option<f64>,
    /// Draft in metres
    #[serde(default)]
    pub draft: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Crew {
    pub size: u32,
    #[serde(default)]
    pub experience: Option<CrewExperience>,
}

/// Self-declared crew experience, least to most experienced
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CrewExperience {
    Novice,
    Intermediate,
    Advanced,
    Professional,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    #[serde(default)]
    pub avoid_night: bool,
    /// Knots
    #[serde(default)]
    pub max_wind_speed: Option<f64>,
    /// Same unit as the weather provider reports
    #[serde(default)]
    pub max_wave_height: Option<f64>,
}

/// A port resolved from the request: a name, coordinates, or both
#[derive(Debug, Clone, PartialEq)]
pub struct PortRef {
    pub port: Option<String>,
    pub waypoint: Option<Waypoint>,
}

/// Request after validation; every field the planner relies on is checked
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub departure: PortRef,
    pub destination: PortRef,
    pub departure_time: Option<DateTime<Utc>>,
    pub route: Option<Vec<Waypoint>>,
}

impl PlanRequest {
    /// Validate the request and resolve its ports and route
    pub fn validate(&self) -> Result<ValidatedRequest, PlannerError> {
        let departure = self
            .departure
            .as_ref()
            .ok_or_else(|| PlannerError::validation("departure is required"))?;
        let destination = self
            .destination
            .as_ref()
            .ok_or_else(|| PlannerError::validation("destination is required"))?;

        let departure_ref = resolve_port(
            "departure",
            departure.port.as_deref(),
            departure.latitude,
            departure.longitude,
        )?;
        let destination_ref = resolve_port(
            "destination",
            destination.port.as_deref(),
            destination.latitude,
            destination.longitude,
        )?;

        let route = match &self.route {
            Some(points) => Some(validate_route(points)?),
            None => None,
        };

        if let Some(crew) = &self.crew {
            if crew.size == 0 {
                return Err(PlannerError::validation("crew size must be positive"));
            }
        }

        if let Some(vessel) = &self.vessel {
            if let Some(speed) = vessel.cruise_speed {
                if !(speed > 0.0) {
                    return Err(PlannerError::validation(format!(
                        "cruise speed {speed} must be positive"
                    )));
                }
            }
            if let Some(draft) = vessel.draft {
                if !(draft >= 0.0) {
                    return Err(PlannerError::validation(format!(
                        "draft {draft} cannot be negative"
                    )));
                }
            }
        }

        Ok(ValidatedRequest {
            departure: departure_ref,
            destination: destination_ref,
            departure_time: departure.time,
            route,
        })
    }

    #[must_use]
    pub fn draft(&self) -> Option<f64> {
        self.vessel.as_ref().and_then(|v| v.draft)
    }

    #[must_use]
    pub fn cruise_speed(&self) -> Option<f64> {
        self.vessel.as_ref().and_then(|v| v.cruise_speed)
    }

    #[must_use]
    pub fn crew_experience(&self) -> Option<CrewExperience> {
        self.crew.as_ref().and_then(|c| c.experience)
    }
}

fn resolve_port(
    role: &str,
    port: Option<&str>,
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<PortRef, PlannerError> {
    let port = port.map(str::trim).filter(|p| !p.is_empty()).map(String::from);

    let waypoint = match (latitude, longitude) {
        (Some(lat), Some(lon)) => {
            validate_coordinates(lat, lon)
                .map_err(|e| PlannerError::validation(format!("{role}: {e}")))?;
            let mut wp = Waypoint::new(lat, lon);
            wp.name.clone_from(&port);
            Some(wp)
        }
        (None, None) => None,
        _ => {
            return Err(PlannerError::validation(format!(
                "{role} must have both latitude and longitude"
            )));
        }
    };

    if port.is_none() && waypoint.is_none() {
        return Err(PlannerError::validation(format!(
            "{role} needs a port name or coordinates"
        )));
    }

    Ok(PortRef { port, waypoint })
}

fn validate_route(points: &[RoutePoint]) -> Result<Vec<Waypoint>, PlannerError> {
    if points.is_empty() {
        return Err(PlannerError::validation("route must contain at least one waypoint"));
    }

    points
        .iter()
        .enumerate()
        .map(|(index, point)| match (point.latitude, point.longitude) {
            (Some(lat), Some(lon)) => {
                validate_coordinates(lat, lon)
                    .map_err(|e| PlannerError::validation(format!("route waypoint {index}: {e}")))?;
                Ok(Waypoint {
                    latitude: lat,
                    longitude: lon,
                    name: point.name.clone(),
                })
            }
            _ => Err(PlannerError::validation(format!(
                "route waypoint {index} is missing latitude or longitude"
            ))),
        })
        .collect()
}
