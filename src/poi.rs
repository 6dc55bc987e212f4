//! # POI Store
//!
//! Persisted collection of named, emoji-tagged points of interest. Lives
//! independently of the tracking state and of the recorded path. The whole
//! collection is written back after every mutation.

use log::{debug, error, info, warn};

use crate::geo_utils::distance;
use crate::storage::{load_json, SharedStore};
use crate::{BacktrackError, Coordinate, Poi, Result, POI_STORAGE_KEY};

/// Emoji given to a POI when the user does not pick one.
pub const DEFAULT_EMOJI: &str = "📍";

/// Emoji offered when creating or editing a POI.
pub const PRESET_EMOJIS: [&str; 10] = [
    "📍", "⛺", "🚗", "🏠", "🚩", "📷", "💧", "🍔", "⚠️", "🌲",
];

pub struct PoiStore {
    store: SharedStore,
    pois: Vec<Poi>,
}

impl PoiStore {
    /// Create a store, restoring any previously saved POIs.
    ///
    /// Unreadable or malformed stored data is logged and treated as empty.
    pub fn restore(store: SharedStore) -> Self {
        let pois = load_pois(&store);
        if !pois.is_empty() {
            info!("[PoiStore] Restored {} POIs", pois.len());
        }
        Self { store, pois }
    }

    /// Append a fully-formed POI. On `Err` the collection is unchanged.
    pub fn add(&mut self, poi: Poi) -> Result<()> {
        debug!("[PoiStore] Adding '{}' {}", poi.name, poi.emoji);
        self.pois.push(poi);
        if let Err(e) = self.persist() {
            self.pois.pop();
            return Err(e);
        }
        Ok(())
    }

    /// Create a POI at `position` and add it.
    pub fn add_at(
        &mut self,
        position: &Coordinate,
        name: impl Into<String>,
        emoji: impl Into<String>,
    ) -> Result<Poi> {
        let poi = Poi::new_at(position, name, emoji);
        self.add(poi.clone())?;
        Ok(poi)
    }

    /// Apply an edit to the POI with the same id.
    ///
    /// Only `name` and `emoji` are taken from `poi`; the stored coordinate
    /// and creation time are kept. Unknown ids are a no-op. On `Err` the
    /// collection is unchanged.
    pub fn update(&mut self, poi: &Poi) -> Result<bool> {
        let Some(index) = self.pois.iter().position(|p| p.id == poi.id) else {
            debug!("[PoiStore] Update for unknown id {}", poi.id);
            return Ok(false);
        };
        let existing = &mut self.pois[index];
        let previous_name = std::mem::replace(&mut existing.name, poi.name.clone());
        let previous_emoji = std::mem::replace(&mut existing.emoji, poi.emoji.clone());
        if let Err(e) = self.persist() {
            let existing = &mut self.pois[index];
            existing.name = previous_name;
            existing.emoji = previous_emoji;
            return Err(e);
        }
        Ok(true)
    }

    /// Delete the POI with `id`. Unknown ids are a no-op. On `Err` the
    /// collection is unchanged.
    pub fn remove(&mut self, id: &str) -> Result<bool> {
        let Some(index) = self.pois.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let removed = self.pois.remove(index);
        if let Err(e) = self.persist() {
            self.pois.insert(index, removed);
            return Err(e);
        }
        Ok(true)
    }

    pub fn get(&self, id: &str) -> Option<&Poi> {
        self.pois.iter().find(|p| p.id == id)
    }

    pub fn pois(&self) -> &[Poi] {
        &self.pois
    }

    pub fn len(&self) -> usize {
        self.pois.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pois.is_empty()
    }

    /// Every POI with its distance in meters from `current`, in stored order.
    pub fn with_distances(&self, current: &Coordinate) -> Vec<(&Poi, f64)> {
        self.pois
            .iter()
            .map(|poi| (poi, distance(current, &poi.coordinate)))
            .collect()
    }

    fn persist(&self) -> Result<()> {
        let bytes = serde_json::to_vec(&self.pois)?;
        self.store.write(POI_STORAGE_KEY, &bytes)
    }
}

fn load_pois(store: &SharedStore) -> Vec<Poi> {
    match load_json(store.as_ref(), POI_STORAGE_KEY) {
        Ok(saved) => saved.unwrap_or_default(),
        Err(e @ BacktrackError::PersistenceCorrupt { .. }) => {
            error!("[PoiStore] {}", e);
            Vec::new()
        }
        Err(e) => {
            warn!("[PoiStore] Failed to read saved POIs: {}", e);
            Vec::new()
        }
    }
}
