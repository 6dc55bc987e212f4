//! # Backtrack Session
//!
//! Owns all mutable state of one tracking session: the tracking state, the
//! position tracker, the heading provider, the recorded path and the POIs.
//!
//! ## Event Flow
//!
//! Platform feeds push events into the session in call order:
//! - `on_location_sample` updates the current position, then offers it to the
//!   recorder (which only records while tracking)
//! - `on_location_error` / `on_permission_change` update tracker state
//! - `on_orientation` updates the compass heading
//!
//! The presentation layer reads everything back through `display_path`,
//! `radar_frame` and `snapshot`. Sensor and storage failures are kept as state
//! or logged; none of them stop the session.

use log::{debug, info, warn};
use serde::Serialize;

use crate::heading::{resolve_heading, HeadingProvider, OrientationPlatform, OrientationReading};
use crate::projector::{EgocentricProjector, RadarFrame};
use crate::storage::SharedStore;
use crate::tracker::{
    LocationFeed, LocationSample, PermissionStatus, PositionErrorKind, PositionTracker,
};
use crate::{
    Coordinate, OptionExt, PathRecorder, PathVertex, Poi, PoiStore, RecordOutcome, Result,
    SessionConfig, TrackingState,
};

// ============================================================================
// Snapshot
// ============================================================================

/// Read model of a session for the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: TrackingState,
    pub position: Option<Coordinate>,
    pub location_error: Option<PositionErrorKind>,
    pub heading_error: Option<String>,
    pub permission: PermissionStatus,
    /// Heading used for rendering, in degrees
    pub heading: f64,
    pub vertex_count: usize,
    pub poi_count: usize,
    /// Distance along the recorded path, in meters
    pub path_length: f64,
}

// ============================================================================
// Session
// ============================================================================

pub struct BacktrackSession<L: LocationFeed, O: OrientationPlatform> {
    state: TrackingState,
    tracker: PositionTracker<L>,
    heading: HeadingProvider<O>,
    recorder: PathRecorder,
    pois: PoiStore,
    projector: EgocentricProjector,
    config: SessionConfig,
}

impl<L: LocationFeed, O: OrientationPlatform> BacktrackSession<L, O> {
    /// Create an idle session, restoring the saved path and POIs from `store`.
    pub fn new(feed: L, platform: O, store: SharedStore, config: SessionConfig) -> Self {
        let session = Self {
            state: TrackingState::Idle,
            tracker: PositionTracker::new(feed, config.watch.clone()),
            heading: HeadingProvider::new(platform),
            recorder: PathRecorder::restore(store.clone(), config.recorder.clone()),
            pois: PoiStore::restore(store),
            projector: EgocentricProjector::new(config.radar.clone()),
            config,
        };
        info!(
            "[BacktrackSession] Ready with {} vertices and {} POIs",
            session.recorder.len(),
            session.pois.len()
        );
        session
    }

    // ========================================================================
    // Controls
    // ========================================================================

    /// Begin recording breadcrumbs.
    pub fn start(&mut self) {
        self.set_state(TrackingState::Tracking);
    }

    /// Stop recording and release the location feed.
    pub fn stop(&mut self) {
        self.set_state(TrackingState::Idle);
    }

    /// Stop recording and show the path newest-first. The location feed
    /// stays active so the radar keeps following the user.
    pub fn backtrack(&mut self) {
        self.set_state(TrackingState::Backtracking);
    }

    /// Drop the recorded path and return to idle. POIs are kept.
    ///
    /// If the saved path cannot be removed the path is kept, and the
    /// session still returns to idle.
    pub fn clear(&mut self) {
        if let Err(e) = self.recorder.clear() {
            warn!("[BacktrackSession] Failed to remove saved path: {}", e);
        }
        self.set_state(TrackingState::Idle);
    }

    fn set_state(&mut self, state: TrackingState) {
        if self.state != state {
            info!("[BacktrackSession] {} -> {}", self.state, state);
        }
        self.state = state;
        self.tracker.set_tracking(state.wants_location());
    }

    // ========================================================================
    // Feed events
    // ========================================================================

    /// Handle a location fix. Returns what the recorder did with it, or
    /// `None` when no subscription is active and the fix was dropped.
    ///
    /// A fix whose vertex cannot be saved still becomes the current position
    /// and yields [`RecordOutcome::Unsaved`]; the path is left unchanged.
    pub fn on_location_sample(&mut self, sample: &LocationSample) -> Option<RecordOutcome> {
        let coordinate = self.tracker.handle_sample(sample)?;
        match self.recorder.on_position(self.state, &coordinate) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!("[BacktrackSession] Failed to save path: {}", e);
                Some(RecordOutcome::Unsaved { error: e })
            }
        }
    }

    pub fn on_location_error(&mut self, kind: PositionErrorKind) {
        self.tracker.handle_error(kind);
    }

    pub fn on_permission_change(&mut self, status: PermissionStatus) {
        self.tracker.handle_permission_change(status);
    }

    /// Handle an orientation event. Returns the compass heading, if known.
    pub fn on_orientation(&mut self, reading: &OrientationReading) -> Option<f64> {
        self.heading.handle_reading(reading)
    }

    /// Ask for compass access where the platform gates it.
    pub async fn request_compass_permission(&mut self) -> bool {
        self.heading.request_permission().await
    }

    // ========================================================================
    // POIs
    // ========================================================================

    /// Mark the current position as a POI.
    ///
    /// Fails with `PositionUnavailable` before the first fix.
    pub fn add_poi(&mut self, name: &str, emoji: &str) -> Result<Poi> {
        let position = *self.tracker.current_position().ok_or_position_unavailable()?;
        let poi = self.pois.add_at(&position, name, emoji)?;
        debug!("[BacktrackSession] Added POI {} at {}", poi.id, position);
        Ok(poi)
    }

    /// Edit a POI's name and emoji. Returns false for unknown ids.
    pub fn update_poi(&mut self, poi: &Poi) -> Result<bool> {
        self.pois.update(poi)
    }

    /// Delete a POI. Returns false for unknown ids.
    pub fn remove_poi(&mut self, id: &str) -> Result<bool> {
        self.pois.remove(id)
    }

    pub fn pois(&self) -> &[Poi] {
        self.pois.pois()
    }

    /// POIs with their distance from the current position.
    pub fn pois_with_distances(&self) -> Option<Vec<(&Poi, f64)>> {
        let current = self.tracker.current_position()?;
        Some(self.pois.with_distances(current))
    }

    // ========================================================================
    // Views
    // ========================================================================

    pub fn state(&self) -> TrackingState {
        self.state
    }

    pub fn current_position(&self) -> Option<&Coordinate> {
        self.tracker.current_position()
    }

    /// Heading used for rendering: compass, then the fix's course, then 0.
    pub fn heading(&self) -> f64 {
        resolve_heading(self.heading.heading(), self.tracker.current_position())
    }

    /// The path in display order: newest-first while backtracking.
    pub fn display_path(&self) -> Vec<&PathVertex> {
        self.recorder.view(self.state)
    }

    /// Radar view of the display path and POIs. `None` before the first fix.
    pub fn radar_frame(&self) -> Option<RadarFrame> {
        let path = self.display_path();
        self.projector.frame(
            self.tracker.current_position(),
            self.heading(),
            &path,
            self.pois.pois(),
        )
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            state: self.state,
            position: self.tracker.current_position().copied(),
            location_error: self.tracker.error(),
            heading_error: self.heading.error().map(|e| e.to_string()),
            permission: self.tracker.permission_status(),
            heading: self.heading(),
            vertex_count: self.recorder.len(),
            poi_count: self.pois.len(),
            path_length: self.recorder.total_distance(),
        }
    }

    pub fn recorder(&self) -> &PathRecorder {
        &self.recorder
    }

    pub fn tracker(&self) -> &PositionTracker<L> {
        &self.tracker
    }

    pub fn heading_provider(&self) -> &HeadingProvider<O> {
        &self.heading
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}

// ============================================================================
// Tests
// ============================================================================
