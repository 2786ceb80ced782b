//! Waypoint model for geographic coordinates along a passage

use haversine::{Location as HaversineLocation, Units, distance};
use serde::{Deserialize, Serialize};

use crate::PlannerError;

/// Kilometres per nautical mile
const KM_PER_NAUTICAL_MILE: f64 = 1.852;

/// A single point on the sail path
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Waypoint {
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Port or mark name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Waypoint {
    #[must_use]
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            name: None,
        }
    }

    #[must_use]
    pub fn named(latitude: f64, longitude: f64, name: impl Into<String>) -> Self {
        Self {
            latitude,
            longitude,
            name: Some(name.into()),
        }
    }

    /// Checks the coordinate ranges, naming the offending value on failure
    pub fn validate(&self) -> Result<(), PlannerError> {
        validate_coordinates(self.latitude, self.longitude)
    }

    /// Great-circle distance to `other` in nautical miles
    #[must_use]
    pub fn distance_nm(&self, other: &Waypoint) -> f64 {
        let from = HaversineLocation {
            latitude: self.latitude,
            longitude: self.longitude,
        };
        let to = HaversineLocation {
            latitude: other.latitude,
            longitude: other.longitude,
        };
        distance(from, to, Units::Kilometers) / KM_PER_NAUTICAL_MILE
    }

    /// Label used in warnings: the name when present, else the coordinates
    #[must_use]
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => self.format_coordinates(),
        }
    }

    #[must_use]
    pub fn format_coordinates(&self) -> String {
        format!("{:.4}, {:.4}", self.latitude, self.longitude)
    }
}

/// Range check shared by requests and routes
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), PlannerError> {
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(PlannerError::validation(format!(
            "latitude {latitude} is outside [-90, 90]"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(PlannerError::validation(format!(
            "longitude {longitude} is outside [-180, 180]"
        )));
    }
    Ok(())
}

/// Sum of leg distances along an ordered route, in nautical miles
#[must_use]
pub fn route_distance_nm(route: &[Waypoint]) -> f64 {
    route
        .windows(2)
        .map(|leg| leg[0].distance_nm(&leg[1]))
        .sum()
}
