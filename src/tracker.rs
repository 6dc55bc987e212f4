//! # Position Tracker
//!
//! Owns the live location subscription. The subscription exists only while
//! tracking is requested; fixes and errors are pushed in by the host through
//! [`PositionTracker::handle_sample`] and [`PositionTracker::handle_error`].

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{BacktrackError, Coordinate, WatchOptions};

/// Handle for an active location subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Raw fix as delivered by the platform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    /// 95%-confidence radius in meters
    pub accuracy: f64,
    pub heading: Option<f64>,
    pub speed: Option<f64>,
    /// Epoch milliseconds at which the fix was taken
    pub timestamp: i64,
}

impl LocationSample {
    pub fn to_coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
            accuracy: Some(self.accuracy),
            heading: self.heading,
            speed: self.speed,
        }
    }
}

/// Kinds of location failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Error)]
#[serde(rename_all = "snake_case")]
pub enum PositionErrorKind {
    #[error("Location permission denied")]
    PermissionDenied,
    #[error("Position unavailable")]
    PositionUnavailable,
    #[error("Timed out waiting for a position")]
    Timeout,
    #[error("Geolocation is not supported by this device")]
    Unsupported,
}

impl From<PositionErrorKind> for BacktrackError {
    fn from(kind: PositionErrorKind) -> Self {
        let sensor = "location".to_string();
        match kind {
            PositionErrorKind::PermissionDenied => BacktrackError::PermissionDenied { sensor },
            PositionErrorKind::PositionUnavailable => BacktrackError::PositionUnavailable,
            PositionErrorKind::Timeout => BacktrackError::Timeout,
            PositionErrorKind::Unsupported => BacktrackError::SensorUnsupported { sensor },
        }
    }
}

/// Location permission as reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
    Prompt,
    /// The platform cannot be queried
    #[default]
    Unknown,
}

/// The platform side of the location feed.
pub trait LocationFeed {
    /// Whether the device can produce location fixes at all.
    fn is_supported(&self) -> bool {
        true
    }

    /// Start delivering fixes with the given options.
    fn watch_position(&mut self, options: &WatchOptions) -> WatchId;

    /// Stop the subscription identified by `id`.
    fn clear_watch(&mut self, id: WatchId);

    /// Current location permission, if the platform can be asked.
    fn query_permission(&self) -> Option<PermissionStatus> {
        None
    }
}

/// Latest fix, last error and permission state of the location feed.
pub struct PositionTracker<F: LocationFeed> {
    feed: F,
    options: WatchOptions,
    watch: Option<WatchId>,
    current: Option<Coordinate>,
    error: Option<PositionErrorKind>,
    permission: PermissionStatus,
}

impl<F: LocationFeed> PositionTracker<F> {
    pub fn new(feed: F, options: WatchOptions) -> Self {
        let permission = feed.query_permission().unwrap_or_default();
        Self {
            feed,
            options,
            watch: None,
            current: None,
            error: None,
            permission,
        }
    }

    /// Start or stop the subscription. Idempotent in both directions.
    pub fn set_tracking(&mut self, tracking: bool) {
        if tracking {
            self.start();
        } else {
            self.stop();
        }
    }

    fn start(&mut self) {
        if self.watch.is_some() {
            return;
        }
        if !self.feed.is_supported() {
            warn!("[PositionTracker] Geolocation not supported");
            self.error = Some(PositionErrorKind::Unsupported);
            return;
        }
        let id = self.feed.watch_position(&self.options);
        info!(
            "[PositionTracker] Watching position (high_accuracy={}, timeout={}ms, max_age={}ms)",
            self.options.enable_high_accuracy, self.options.timeout_ms, self.options.maximum_age_ms
        );
        self.watch = Some(id);
    }

    fn stop(&mut self) {
        if let Some(id) = self.watch.take() {
            self.feed.clear_watch(id);
            info!("[PositionTracker] Cleared watch {:?}", id);
        }
    }

    /// Accept a fix. Returns the new current position, or `None` if no
    /// subscription is active and the fix was dropped.
    pub fn handle_sample(&mut self, sample: &LocationSample) -> Option<Coordinate> {
        if self.watch.is_none() {
            debug!("[PositionTracker] Dropping fix received while stopped");
            return None;
        }
        let coordinate = sample.to_coordinate();
        self.current = Some(coordinate);
        self.error = None;
        Some(coordinate)
    }

    /// Record a feed failure. The last known position is kept.
    pub fn handle_error(&mut self, kind: PositionErrorKind) {
        if self.watch.is_none() {
            return;
        }
        warn!("[PositionTracker] {}", kind);
        self.error = Some(kind);
    }

    /// Permission change notification from the platform.
    pub fn handle_permission_change(&mut self, status: PermissionStatus) {
        if self.permission != status {
            info!(
                "[PositionTracker] Permission {:?} -> {:?}",
                self.permission, status
            );
        }
        self.permission = status;
    }

    /// Re-read the permission from the platform.
    pub fn refresh_permission(&mut self) -> PermissionStatus {
        if let Some(status) = self.feed.query_permission() {
            self.handle_permission_change(status);
        }
        self.permission
    }

    pub fn current_position(&self) -> Option<&Coordinate> {
        self.current.as_ref()
    }

    pub fn error(&self) -> Option<PositionErrorKind> {
        self.error
    }

    pub fn permission_status(&self) -> PermissionStatus {
        self.permission
    }

    pub fn is_watching(&self) -> bool {
        self.watch.is_some()
    }

    pub fn options(&self) -> &WatchOptions {
        &self.options
    }

    pub fn feed(&self) -> &F {
        &self.feed
    }
}

impl<F: LocationFeed> Drop for PositionTracker<F> {
    fn drop(&mut self) {
        self.stop();
    }
}
