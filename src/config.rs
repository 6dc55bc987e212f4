//! Configuration for the tracker, recorder and radar projection.
//!
//! Every struct has a `Default` that matches the values the app ships with,
//! and deserializes with `#[serde(default)]` so a host only needs to supply
//! the fields it overrides.

use serde::{Deserialize, Serialize};

use crate::Result;

/// Storage key for the recorded path blob.
pub const PATH_STORAGE_KEY: &str = "backtrack_path";

/// Storage key for the POI collection blob.
pub const POI_STORAGE_KEY: &str = "backtrack_pois";

/// Options passed to the location feed when subscribing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchOptions {
    /// Ask the platform for its most accurate fix source.
    /// Default: true
    pub enable_high_accuracy: bool,

    /// Per-fix timeout; a stalled feed reports `Timeout` after this long.
    /// Default: 5000 ms
    pub timeout_ms: u32,

    /// Oldest cached fix the platform may hand back.
    /// Default: 0 (no cached fixes)
    pub maximum_age_ms: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            enable_high_accuracy: true,
            timeout_ms: 5000,
            maximum_age_ms: 0,
        }
    }
}

/// Configuration for breadcrumb recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Minimum distance from the last recorded vertex before a new one is
    /// appended. Filters GPS jitter while standing still.
    /// Default: 5.0 meters
    pub min_distance_change: f64,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            min_distance_change: 5.0,
        }
    }
}

/// Configuration for the egocentric radar projection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadarConfig {
    /// Radius of the view in display units.
    /// Default: 140.0
    pub view_radius: f64,

    /// Fraction of the view radius the farthest path vertex lands on.
    /// Default: 0.8
    pub fill_ratio: f64,

    /// The scale distance is divided by this to get the raw ring step.
    /// Default: 4.0
    pub ring_divisions: f64,

    /// Rings are emitted up to this multiple of the scale distance.
    /// Default: 1.2
    pub ring_overshoot: f64,

    /// Lower bound for the scale distance, so a short path is not over-zoomed.
    /// Default: 50.0 meters
    pub min_scale_distance: f64,

    /// Scale distance used while the path is empty.
    /// Default: 100.0 meters
    pub default_scale_distance: f64,

    /// Margin kept between clamped POIs and the edge of the view.
    /// Default: 16.0 display units
    pub poi_padding: f64,

    /// Narrowest accuracy cone, in degrees.
    /// Default: 15.0
    pub cone_min_degrees: f64,

    /// Widest accuracy cone, in degrees.
    /// Default: 120.0
    pub cone_max_degrees: f64,
}

impl Default for RadarConfig {
    fn default() -> Self {
        Self {
            view_radius: 140.0,
            fill_ratio: 0.8,
            ring_divisions: 4.0,
            ring_overshoot: 1.2,
            min_scale_distance: 50.0,
            default_scale_distance: 100.0,
            poi_padding: 16.0,
            cone_min_degrees: 15.0,
            cone_max_degrees: 120.0,
        }
    }
}

impl RadarConfig {
    /// Radius beyond which POIs are pulled back onto the boundary.
    pub fn clamp_radius(&self) -> f64 {
        (self.view_radius - self.poi_padding).max(0.0)
    }
}

/// Top-level configuration for a [`crate::BacktrackSession`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub watch: WatchOptions,
    pub recorder: RecorderConfig,
    pub radar: RadarConfig,
}

impl SessionConfig {
    /// Parse a (possibly partial) JSON configuration.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
