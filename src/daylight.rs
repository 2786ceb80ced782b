//! Night-passage check for crews that prefer to sail in daylight

use chrono::{DateTime, NaiveDate, Utc};
use sunrise::{Coordinates, SolarDay, SolarEvent};
use tracing::debug;

use crate::models::{PlanWarning, Severity, Waypoint, WarningSource};

/// Sunrise and sunset at `position` on `date`, or `None` during polar day/night
/// or for coordinates the solar model rejects.
#[must_use]
pub fn sunrise_sunset(position: &Waypoint, date: NaiveDate) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let coordinates = Coordinates::new(position.latitude, position.longitude)?;
    let solar_day = SolarDay::new(coordinates, date);

    let sunrise = solar_day.event_time(SolarEvent::Sunrise)?;
    let sunset = solar_day.event_time(SolarEvent::Sunset)?;
    Some((sunrise, sunset))
}

/// Warnings for a departure before sunrise or an arrival after sunset.
///
/// Ends without known coordinates, or where the sun does not rise and set on
/// that date, are skipped.
#[must_use]
pub fn night_passage_warnings(
    departure: Option<&Waypoint>,
    departure_time: DateTime<Utc>,
    arrival: Option<&Waypoint>,
    arrival_time: DateTime<Utc>,
) -> Vec<PlanWarning> {
    let mut warnings = Vec::new();

    if let Some((sunrise, sunset)) =
        departure.and_then(|pos| sunrise_sunset(pos, departure_time.date_naive()))
    {
        debug!(%sunrise, %sunset, "Daylight at departure");
        if departure_time < sunrise || departure_time > sunset {
            warnings.push(PlanWarning::new(
                Severity::Warning,
                WarningSource::Daylight,
                format!(
                    "Departure at {} is outside daylight (sunrise {}, sunset {} UTC)",
                    departure_time.format("%H:%M"),
                    sunrise.format("%H:%M"),
                    sunset.format("%H:%M")
                ),
            ));
        }
    }

    if let Some((sunrise, sunset)) =
        arrival.and_then(|pos| sunrise_sunset(pos, arrival_time.date_naive()))
    {
        debug!(%sunrise, %sunset, "Daylight at arrival");
        if arrival_time < sunrise || arrival_time > sunset {
            warnings.push(PlanWarning::new(
                Severity::Warning,
                WarningSource::Daylight,
                format!(
                    "Estimated arrival at {} is after dark (sunrise {}, sunset {} UTC)",
                    arrival_time.format("%H:%M"),
                    sunrise.format("%H:%M"),
                    sunset.format("%H:%M")
                ),
            ));
        }
    }

    warnings
}
