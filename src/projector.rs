//! # Egocentric Projector
//!
//! Turns absolute coordinates into heading-up radar offsets around the
//! current position.
//!
//! ## Transform
//!
//! For each target:
//! 1. `bearing = bearing(current, target)`, `relative = bearing - heading`
//! 2. `rad = (relative - 90) * PI / 180`, so straight ahead maps to "up"
//! 3. `x = d * scale * cos(rad)`, `y = d * scale * sin(rad)` (y grows downward)
//!
//! `scale = view_radius * fill_ratio / max_distance`, where `max_distance` is
//! the farthest path vertex (floored, with a default for an empty path).
//! POIs never influence the scale; when they fall outside the view they are
//! pulled back onto the boundary and flagged as clamped.

use serde::Serialize;

use crate::geo_utils::{bearing, distance};
use crate::{Coordinate, RadarConfig, Waypoint};

/// A target expressed relative to the viewer, in display units.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelativePoint {
    pub x: f64,
    pub y: f64,
    /// True (unscaled) distance to the target
    pub distance_meters: f64,
    pub source_id: String,
    /// Pulled back onto the view boundary
    pub clamped: bool,
}

impl RelativePoint {
    /// Distance from the view center, in display units.
    pub fn radius(&self) -> f64 {
        self.x.hypot(self.y)
    }
}

/// A distance ring and where it lands on screen.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Ring {
    pub distance_meters: f64,
    pub radius: f64,
}

/// Everything needed to draw one radar frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RadarFrame {
    /// Heading the frame was rotated by
    pub heading: f64,
    pub max_distance: f64,
    pub scale: f64,
    pub rings: Vec<Ring>,
    pub path: Vec<RelativePoint>,
    pub pois: Vec<RelativePoint>,
    /// Angular width of the accuracy cone, in degrees
    pub cone_degrees: f64,
}

/// Stateless-per-call radar projection with fixed view geometry.
#[derive(Debug, Clone, Default)]
pub struct EgocentricProjector {
    config: RadarConfig,
}

impl EgocentricProjector {
    pub fn new(config: RadarConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RadarConfig {
        &self.config
    }

    /// Display units per meter for a given scale distance.
    pub fn scale_for(&self, max_distance: f64) -> f64 {
        (self.config.view_radius * self.config.fill_ratio) / max_distance
    }

    /// Scale distance for a path: the farthest vertex from `current`,
    /// floored at `min_scale_distance`, or `default_scale_distance` when the
    /// path is empty.
    pub fn max_distance<W: Waypoint>(&self, current: &Coordinate, path: &[W]) -> f64 {
        path.iter()
            .map(|v| distance(current, v.coordinate()))
            .reduce(f64::max)
            .map(|farthest| farthest.max(self.config.min_scale_distance))
            .unwrap_or(self.config.default_scale_distance)
    }

    /// Ring distances in meters for a scale distance.
    ///
    /// The raw step `max_distance / ring_divisions` is rounded up to a whole
    /// multiple of its power of ten; rings are emitted at each multiple of
    /// that step up to `ring_overshoot * max_distance`.
    pub fn ring_distances(&self, max_distance: f64) -> Vec<f64> {
        let step = max_distance / self.config.ring_divisions;
        if !step.is_finite() || step <= 0.0 {
            return Vec::new();
        }
        let magnitude = 10f64.powi(step.log10().floor() as i32);
        let nice_step = (step / magnitude).ceil() * magnitude;
        let limit = max_distance * self.config.ring_overshoot;

        let mut rings = Vec::new();
        let mut i = 1.0;
        while i * nice_step <= limit {
            rings.push(i * nice_step);
            i += 1.0;
        }
        rings
    }

    /// Rings with their on-screen radius for a scale distance.
    pub fn rings(&self, max_distance: f64) -> Vec<Ring> {
        let scale = self.scale_for(max_distance);
        self.ring_distances(max_distance)
            .into_iter()
            .map(|d| Ring {
                distance_meters: d,
                radius: d * scale,
            })
            .collect()
    }

    /// Project one target. A missing heading means north-up.
    pub fn project<W: Waypoint>(
        &self,
        current: &Coordinate,
        heading: Option<f64>,
        scale: f64,
        target: &W,
    ) -> RelativePoint {
        let heading = heading.unwrap_or(0.0);
        let d = distance(current, target.coordinate());
        let relative_bearing = bearing(current, target.coordinate()) - heading;
        let rad = (relative_bearing - 90.0).to_radians();

        RelativePoint {
            x: d * scale * rad.cos(),
            y: d * scale * rad.sin(),
            distance_meters: d,
            source_id: target.id().to_string(),
            clamped: false,
        }
    }

    /// Project path vertices. `None` when there is no current position.
    pub fn project_path<W: Waypoint>(
        &self,
        current: Option<&Coordinate>,
        heading: Option<f64>,
        max_distance: f64,
        path: &[W],
    ) -> Option<Vec<RelativePoint>> {
        let current = current?;
        let scale = self.scale_for(max_distance);
        Some(
            path.iter()
                .map(|v| self.project(current, heading, scale, v))
                .collect(),
        )
    }

    /// Project POIs, clamping anything beyond `view_radius - poi_padding`
    /// onto that boundary at the same angle. `None` when there is no
    /// current position.
    pub fn project_pois<W: Waypoint>(
        &self,
        current: Option<&Coordinate>,
        heading: Option<f64>,
        max_distance: f64,
        pois: &[W],
    ) -> Option<Vec<RelativePoint>> {
        let current = current?;
        let scale = self.scale_for(max_distance);
        let limit = self.config.clamp_radius();
        Some(
            pois.iter()
                .map(|poi| clamp_to_radius(self.project(current, heading, scale, poi), limit))
                .collect(),
        )
    }

    /// Accuracy cone width in degrees. Missing accuracy counts as zero.
    pub fn accuracy_cone_degrees(&self, accuracy: Option<f64>) -> f64 {
        accuracy
            .unwrap_or(0.0)
            .max(self.config.cone_min_degrees)
            .min(self.config.cone_max_degrees)
    }

    /// Build a full frame. `None` when there is no current position.
    pub fn frame<P: Waypoint, Q: Waypoint>(
        &self,
        current: Option<&Coordinate>,
        heading: f64,
        path: &[P],
        pois: &[Q],
    ) -> Option<RadarFrame> {
        let current = current?;
        let max_distance = self.max_distance(current, path);
        let scale = self.scale_for(max_distance);

        Some(RadarFrame {
            heading,
            max_distance,
            scale,
            rings: self.rings(max_distance),
            path: self.project_path(Some(current), Some(heading), max_distance, path)?,
            pois: self.project_pois(Some(current), Some(heading), max_distance, pois)?,
            cone_degrees: self.accuracy_cone_degrees(current.accuracy),
        })
    }
}

fn clamp_to_radius(mut point: RelativePoint, limit: f64) -> RelativePoint {
    let r = point.radius();
    if r > limit && r > 0.0 {
        let factor = limit / r;
        point.x *= factor;
        point.y *= factor;
        point.clamped = true;
    }
    point
}
