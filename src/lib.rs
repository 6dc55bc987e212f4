//! # Backtrack Core
//!
//! GPS breadcrumb recording and egocentric ("radar") projection for retracing a
//! walked or driven route.
//!
//! This library provides:
//! - Great-circle distance and bearing between coordinates
//! - A position tracker and a compass heading provider fed by platform sensors
//! - A jitter-filtered path recorder with backtrack (reversed) reads
//! - A persisted store of named, emoji-tagged points of interest
//! - A projector that turns absolute coordinates into heading-up radar offsets
//!
//! ## Features
//!
//! - **`persistence`** - Enable the SQLite-backed blob store
//! - **`full`** - Enable all features
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use backtrack_core::{
//!     Coordinate, MemoryStore, PathRecorder, RecorderConfig, TrackingState,
//! };
//!
//! let store = Arc::new(MemoryStore::new());
//! let mut recorder = PathRecorder::restore(store, RecorderConfig::default());
//!
//! let start = Coordinate::new(51.5074, -0.1278, 1_700_000_000_000);
//! let moved = Coordinate::new(51.5075, -0.1278, 1_700_000_005_000); // ~11 m north
//!
//! recorder.on_position(TrackingState::Tracking, &start).unwrap();
//! recorder.on_position(TrackingState::Tracking, &moved).unwrap();
//! assert_eq!(recorder.len(), 2);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// Unified error handling
pub mod error;
pub use error::{BacktrackError, OptionExt, Result};

// Configuration structs with documented defaults
pub mod config;
pub use config::{
    RadarConfig, RecorderConfig, SessionConfig, WatchOptions, POI_STORAGE_KEY, PATH_STORAGE_KEY,
};

// Geographic utilities (distance, bearing, formatting)
pub mod geo_utils;
pub use geo_utils::{bearing, distance, format_distance, path_length};

// Blob storage port and the built-in stores
pub mod storage;
pub use storage::{BlobStore, FileStore, MemoryStore, SharedStore};

// SQLite blob store
#[cfg(feature = "persistence")]
pub mod persistence;
#[cfg(feature = "persistence")]
pub use persistence::SqliteStore;

// Compass heading from orientation readings
pub mod heading;
pub use heading::{
    resolve_heading, HeadingError, HeadingProvider, OrientationPlatform, OrientationReading,
    PermissionResponse,
};

// Live location subscription
pub mod tracker;
pub use tracker::{
    LocationFeed, LocationSample, PermissionStatus, PositionErrorKind, PositionTracker, WatchId,
};

// Breadcrumb recording
pub mod recorder;
pub use recorder::{PathRecorder, RecordOutcome};

// Points of interest
pub mod poi;
pub use poi::{PoiStore, DEFAULT_EMOJI, PRESET_EMOJIS};

// Egocentric projection
pub mod projector;
pub use projector::{EgocentricProjector, RadarFrame, RelativePoint, Ring};

// Session owning all mutable state
pub mod session;
pub use session::{BacktrackSession, SessionSnapshot};

// ============================================================================
// Core Types
// ============================================================================

/// A GPS fix as produced by the location feed.
///
/// Immutable once produced. Serialized with camelCase keys so stored blobs
/// keep the same shape across versions.
///
/// # Example
/// ```
/// use backtrack_core::Coordinate;
/// let fix = Coordinate::new(51.5074, -0.1278, 1_700_000_000_000).with_accuracy(8.0);
/// assert_eq!(fix.accuracy, Some(8.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    /// Epoch milliseconds
    pub timestamp: i64,
    /// 95%-confidence radius in meters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accuracy: Option<f64>,
    /// Course over ground in degrees, when the receiver reports one
    #[serde(default)]
    pub heading: Option<f64>,
    /// Meters per second
    #[serde(default)]
    pub speed: Option<f64>,
}

impl Coordinate {
    /// Create a coordinate with no accuracy, heading or speed.
    pub fn new(latitude: f64, longitude: f64, timestamp: i64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            accuracy: None,
            heading: None,
            speed: None,
        }
    }

    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    pub fn with_heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }

    pub fn with_speed(mut self, speed: f64) -> Self {
        self.speed = Some(speed);
        self
    }

    /// Check if the coordinate is a usable lat/lon pair.
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && self.latitude >= -90.0
            && self.latitude <= 90.0
            && self.longitude >= -180.0
            && self.longitude <= 180.0
    }

    /// True when both coordinates name the same lat/lon.
    pub fn same_location(&self, other: &Coordinate) -> bool {
        self.latitude == other.latitude && self.longitude == other.longitude
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.6}°, {:.6}°)", self.latitude, self.longitude)
    }
}

/// One recorded breadcrumb.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathVertex {
    pub id: String,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl PathVertex {
    /// Wrap a sample as a vertex with a freshly generated id.
    pub fn from_sample(sample: &Coordinate) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            coordinate: *sample,
        }
    }
}

/// A named, emoji-tagged point of interest.
///
/// The coordinate is captured when the POI is created and never changes
/// afterwards; only `name` and `emoji` are editable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Poi {
    pub id: String,
    pub name: String,
    pub emoji: String,
    /// Epoch milliseconds
    pub created_at: i64,
    #[serde(flatten)]
    pub coordinate: Coordinate,
}

impl Poi {
    /// Create a POI at `position`, stamped with the current wall-clock time.
    ///
    /// Only latitude and longitude are taken from `position`.
    pub fn new_at(position: &Coordinate, name: impl Into<String>, emoji: impl Into<String>) -> Self {
        let now = chrono::Utc::now().timestamp_millis();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            emoji: emoji.into(),
            created_at: now,
            coordinate: Coordinate::new(position.latitude, position.longitude, now),
        }
    }
}

/// Anything with an identity and an absolute position that can be projected.
pub trait Waypoint {
    fn id(&self) -> &str;
    fn coordinate(&self) -> &Coordinate;
}

impl<T: Waypoint + ?Sized> Waypoint for &T {
    fn id(&self) -> &str {
        (**self).id()
    }

    fn coordinate(&self) -> &Coordinate {
        (**self).coordinate()
    }
}

impl Waypoint for PathVertex {
    fn id(&self) -> &str {
        &self.id
    }

    fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }
}

impl Waypoint for Poi {
    fn id(&self) -> &str {
        &self.id
    }

    fn coordinate(&self) -> &Coordinate {
        &self.coordinate
    }
}

/// What the session is currently doing with location fixes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingState {
    /// No recording, location feed unsubscribed
    #[default]
    Idle,
    /// Recording breadcrumbs
    Tracking,
    /// Not recording; the path is read newest-first
    Backtracking,
}

impl TrackingState {
    /// Whether the location feed should be subscribed in this state.
    pub fn wants_location(&self) -> bool {
        !matches!(self, TrackingState::Idle)
    }
}

impl fmt::Display for TrackingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TrackingState::Idle => "idle",
            TrackingState::Tracking => "tracking",
            TrackingState::Backtracking => "backtracking",
        };
        f.write_str(name)
    }
}

// ============================================================================
// Tests
// ============================================================================
