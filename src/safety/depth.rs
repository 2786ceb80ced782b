//! Depth lookup used by the shallow-water check

use anyhow::Result;

use crate::models::Waypoint;

/// Source of charted depths.
///
/// `Ok(None)` means no sounding is known for the position; an error means
/// the lookup itself failed and the depth is unknown.
pub trait DepthSource: Send + Sync {
    /// Depth in metres at `waypoint`
    fn depth_at(&self, waypoint: &Waypoint) -> Result<Option<f64>>;
}

/// Depth source with no chart data at all
#[derive(Debug, Default, Clone, Copy)]
pub struct NoSoundings;

impl DepthSource for NoSoundings {
    fn depth_at(&self, _waypoint: &Waypoint) -> Result<Option<f64>> {
        Ok(None)
    }
}

/// In-memory soundings; the nearest one within `radius_nm` answers a lookup
#[derive(Debug, Clone)]
pub struct ChartedDepths {
    soundings: Vec<(Waypoint, f64)>,
    radius_nm: f64,
}

impl ChartedDepths {
    #[must_use]
    pub fn new(radius_nm: f64) -> Self {
        Self {
            soundings: Vec::new(),
            radius_nm,
        }
    }

    #[must_use]
    pub fn with_sounding(mut self, position: Waypoint, depth_m: f64) -> Self {
        self.soundings.push((position, depth_m));
        self
    }
}

impl DepthSource for ChartedDepths {
    fn depth_at(&self, waypoint: &Waypoint) -> Result<Option<f64>> {
        let nearest = self
            .soundings
            .iter()
            .map(|(position, depth)| (waypoint.distance_nm(position), *depth))
            .filter(|(distance, _)| *distance <= self.radius_nm)
            .min_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(nearest.map(|(_, depth)| depth))
    }
}
