//! # Path Recorder
//!
//! Records breadcrumbs while tracking. A fix becomes a new vertex only when
//! it is at least `min_distance_change` meters from the last *recorded*
//! vertex, which keeps GPS jitter at rest out of the path. The path is
//! written to the blob store after every mutation and removed from it when
//! empty.

use log::{debug, error, info, warn};

use crate::geo_utils::{distance, path_length};
use crate::storage::{load_json, SharedStore};
use crate::{
    BacktrackError, Coordinate, PathVertex, RecorderConfig, Result, TrackingState, PATH_STORAGE_KEY,
};

/// What happened to a fix handed to the recorder.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    /// A vertex was appended. `distance` is from the previous vertex, `None`
    /// for the first vertex of the path.
    Appended { id: String, distance: Option<f64> },
    /// Too close to the last vertex to record
    BelowThreshold { distance: f64 },
    /// Not in the tracking state; nothing recorded
    NotTracking,
    /// The vertex could not be saved and was not appended
    Unsaved { error: BacktrackError },
}

impl RecordOutcome {
    pub fn is_appended(&self) -> bool {
        matches!(self, RecordOutcome::Appended { .. })
    }
}

/// Ordered, persisted breadcrumb path.
pub struct PathRecorder {
    store: SharedStore,
    path: Vec<PathVertex>,
    config: RecorderConfig,
}

impl PathRecorder {
    /// Create a recorder, restoring any previously saved path.
    ///
    /// Unreadable or malformed stored data is logged and treated as no path.
    pub fn restore(store: SharedStore, config: RecorderConfig) -> Self {
        let path = load_path(&store);
        if !path.is_empty() {
            info!("[PathRecorder] Restored {} vertices", path.len());
        }
        Self {
            store,
            path,
            config,
        }
    }

    /// Offer a fix to the recorder.
    ///
    /// Only records in [`TrackingState::Tracking`]. The first fix of an empty
    /// path is always recorded. On `Err` the path is unchanged.
    pub fn on_position(
        &mut self,
        state: TrackingState,
        sample: &Coordinate,
    ) -> Result<RecordOutcome> {
        if state != TrackingState::Tracking {
            return Ok(RecordOutcome::NotTracking);
        }

        let moved = self
            .path
            .last()
            .map(|last| distance(&last.coordinate, sample));

        if let Some(moved) = moved {
            if moved < self.config.min_distance_change {
                debug!(
                    "[PathRecorder] Ignoring fix {:.1}m from last vertex (< {:.1}m)",
                    moved, self.config.min_distance_change
                );
                return Ok(RecordOutcome::BelowThreshold { distance: moved });
            }
        }

        let vertex = PathVertex::from_sample(sample);
        let id = vertex.id.clone();
        self.path.push(vertex);
        if let Err(e) = self.persist() {
            self.path.pop();
            return Err(e);
        }
        debug!(
            "[PathRecorder] Appended vertex #{} at {}",
            self.path.len(),
            sample
        );

        Ok(RecordOutcome::Appended {
            id,
            distance: moved,
        })
    }

    /// Drop every vertex and remove the stored path.
    ///
    /// Does not touch the tracking state. On `Err` the path is unchanged.
    pub fn clear(&mut self) -> Result<()> {
        self.store.delete(PATH_STORAGE_KEY)?;
        info!("[PathRecorder] Cleared {} vertices", self.path.len());
        self.path.clear();
        Ok(())
    }

    /// The path oldest-first.
    pub fn path(&self) -> &[PathVertex] {
        &self.path
    }

    /// The path newest-first, for retracing. Stored order is untouched.
    pub fn backtrack_view(&self) -> impl ExactSizeIterator<Item = &PathVertex> + DoubleEndedIterator {
        self.path.iter().rev()
    }

    /// The path in the order the given state displays it.
    pub fn view(&self, state: TrackingState) -> Vec<&PathVertex> {
        match state {
            TrackingState::Backtracking => self.backtrack_view().collect(),
            _ => self.path.iter().collect(),
        }
    }

    pub fn last_vertex(&self) -> Option<&PathVertex> {
        self.path.last()
    }

    pub fn len(&self) -> usize {
        self.path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Distance walked along the recorded path, in meters.
    pub fn total_distance(&self) -> f64 {
        path_length(&self.path)
    }

    pub fn config(&self) -> &RecorderConfig {
        &self.config
    }

    fn persist(&self) -> Result<()> {
        if self.path.is_empty() {
            return self.store.delete(PATH_STORAGE_KEY);
        }
        let bytes = serde_json::to_vec(&self.path)?;
        self.store.write(PATH_STORAGE_KEY, &bytes)
    }
}

fn load_path(store: &SharedStore) -> Vec<PathVertex> {
    match load_json(store.as_ref(), PATH_STORAGE_KEY) {
        Ok(saved) => saved.unwrap_or_default(),
        Err(e @ BacktrackError::PersistenceCorrupt { .. }) => {
            error!("[PathRecorder] {}", e);
            Vec::new()
        }
        Err(e) => {
            warn!("[PathRecorder] Failed to read saved path: {}", e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::testing::FlakyStore;
    use crate::storage::{BlobStore, MemoryStore};
    use std::sync::Arc;

    fn at(lat: f64, lon: f64) -> Coordinate {
        Coordinate::new(lat, lon, 0)
    }

    fn recorder() -> (PathRecorder, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let recorder = PathRecorder::restore(store.clone(), RecorderConfig::default());
        (recorder, store)
    }

    #[test]
    fn test_first_fix_always_recorded() {
        let (mut rec, _) = recorder();
        let outcome = rec
            .on_position(TrackingState::Tracking, &at(51.0, 0.0))
            .unwrap();
        assert!(matches!(
            outcome,
            RecordOutcome::Appended { distance: None, .. }
        ));
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn test_jitter_below_threshold_ignored() {
        let (mut rec, _) = recorder();
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();

        // ~1.1 m steps, all within 5 m of the first vertex
        for i in 1..=4 {
            let outcome = rec
                .on_position(TrackingState::Tracking, &at(0.0, i as f64 * 0.00001))
                .unwrap();
            assert!(matches!(outcome, RecordOutcome::BelowThreshold { .. }));
        }
        assert_eq!(rec.len(), 1);
    }

    #[test]
    fn test_threshold_measured_from_last_vertex() {
        // (0,0) -> ~5.6 m east -> ~3.3 m back -> ~5.6 m past the second vertex
        let (mut rec, _) = recorder();
        let samples = [
            at(0.0, 0.0),
            at(0.0, 0.00005),
            at(0.0, 0.00002),
            at(0.0, 0.0001),
        ];
        let appended: Vec<bool> = samples
            .iter()
            .map(|s| {
                rec.on_position(TrackingState::Tracking, s)
                    .unwrap()
                    .is_appended()
            })
            .collect();

        assert_eq!(appended, vec![true, true, false, true]);
        assert_eq!(rec.len(), 3);
        assert_eq!(rec.path()[2].coordinate.longitude, 0.0001);
    }

    #[test]
    fn test_exact_threshold_is_recorded() {
        let store = Arc::new(MemoryStore::new());
        let probe = at(0.0, 0.00005);
        let exact = distance(&at(0.0, 0.0), &probe);
        let config = RecorderConfig {
            min_distance_change: exact,
        };
        let mut rec = PathRecorder::restore(store, config);

        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();
        assert!(rec
            .on_position(TrackingState::Tracking, &probe)
            .unwrap()
            .is_appended());
    }

    #[test]
    fn test_only_tracking_state_records() {
        let (mut rec, _) = recorder();
        for state in [TrackingState::Idle, TrackingState::Backtracking] {
            assert_eq!(
                rec.on_position(state, &at(1.0, 1.0)).unwrap(),
                RecordOutcome::NotTracking
            );
        }
        assert!(rec.is_empty());
    }

    #[test]
    fn test_vertex_copies_sample_fields() {
        let (mut rec, _) = recorder();
        let fix = Coordinate::new(10.0, 20.0, 1234)
            .with_accuracy(4.0)
            .with_heading(90.0)
            .with_speed(1.0);
        rec.on_position(TrackingState::Tracking, &fix).unwrap();
        assert_eq!(rec.path()[0].coordinate, fix);
    }

    #[test]
    fn test_backtrack_view_is_pure_reversal() {
        let (mut rec, _) = recorder();
        for i in 0..5 {
            rec.on_position(TrackingState::Tracking, &at(0.0, i as f64 * 0.001))
                .unwrap();
        }
        let forward: Vec<String> = rec.path().iter().map(|v| v.id.clone()).collect();

        let reversed: Vec<String> = rec.backtrack_view().map(|v| v.id.clone()).collect();
        let mut expected = forward.clone();
        expected.reverse();
        assert_eq!(reversed, expected);

        // Reversing the view restores the original order
        let twice: Vec<String> = rec.backtrack_view().rev().map(|v| v.id.clone()).collect();
        assert_eq!(twice, forward);

        // Stored order is unchanged after any number of reads
        for _ in 0..3 {
            let _ = rec.backtrack_view().count();
        }
        let after: Vec<String> = rec.path().iter().map(|v| v.id.clone()).collect();
        assert_eq!(after, forward);
    }

    #[test]
    fn test_view_follows_state() {
        let (mut rec, _) = recorder();
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.001)).unwrap();

        let first_id = rec.path()[0].id.clone();
        assert_eq!(rec.view(TrackingState::Tracking)[0].id, first_id);
        assert_eq!(rec.view(TrackingState::Idle)[0].id, first_id);
        assert_eq!(rec.view(TrackingState::Backtracking)[1].id, first_id);
    }

    #[test]
    fn test_persisted_after_every_append_and_restored() {
        let (mut rec, store) = recorder();
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.001)).unwrap();

        let stored: Vec<PathVertex> =
            serde_json::from_slice(&store.read(PATH_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, rec.path());

        let restored = PathRecorder::restore(store, RecorderConfig::default());
        assert_eq!(restored.path(), rec.path());
    }

    #[test]
    fn test_clear_removes_stored_path() {
        let (mut rec, store) = recorder();
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();
        rec.clear().unwrap();

        assert!(rec.is_empty());
        assert_eq!(store.read(PATH_STORAGE_KEY).unwrap(), None);

        // Recording starts over with an unconditional first vertex
        assert!(rec
            .on_position(TrackingState::Tracking, &at(0.0, 0.0))
            .unwrap()
            .is_appended());
    }

    #[test]
    fn test_corrupt_stored_path_is_empty() {
        let store = Arc::new(MemoryStore::new());
        store.write(PATH_STORAGE_KEY, b"{not json").unwrap();
        let rec = PathRecorder::restore(store.clone(), RecorderConfig::default());
        assert!(rec.is_empty());

        store.write(PATH_STORAGE_KEY, br#"{"id": "x"}"#).unwrap();
        let rec = PathRecorder::restore(store, RecorderConfig::default());
        assert!(rec.is_empty());
    }

    #[test]
    fn test_failed_write_leaves_path_unchanged() {
        let store = Arc::new(FlakyStore::default());
        let mut rec = PathRecorder::restore(store.clone(), RecorderConfig::default());
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();

        store.set_fail_writes(true);
        let err = rec
            .on_position(TrackingState::Tracking, &at(0.0, 0.001))
            .unwrap_err();
        assert!(matches!(err, BacktrackError::Storage { .. }));
        assert_eq!(rec.len(), 1);

        // The same fix is recorded once storage recovers
        store.set_fail_writes(false);
        assert!(rec
            .on_position(TrackingState::Tracking, &at(0.0, 0.001))
            .unwrap()
            .is_appended());
        assert_eq!(rec.len(), 2);
        let stored: Vec<PathVertex> =
            serde_json::from_slice(&store.read(PATH_STORAGE_KEY).unwrap().unwrap()).unwrap();
        assert_eq!(stored, rec.path());
    }

    #[test]
    fn test_failed_clear_keeps_path() {
        let store = Arc::new(FlakyStore::default());
        let mut rec = PathRecorder::restore(store.clone(), RecorderConfig::default());
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();

        store.set_fail_deletes(true);
        assert!(rec.clear().is_err());
        assert_eq!(rec.len(), 1);
        assert!(store.read(PATH_STORAGE_KEY).unwrap().is_some());
    }

    #[test]
    fn test_total_distance() {
        let (mut rec, _) = recorder();
        rec.on_position(TrackingState::Tracking, &at(0.0, 0.0)).unwrap();
        rec.on_position(TrackingState::Tracking, &at(0.001, 0.0)).unwrap();
        rec.on_position(TrackingState::Tracking, &at(0.002, 0.0)).unwrap();
        assert!((rec.total_distance() - 222.4).abs() < 1.0);
    }
}
