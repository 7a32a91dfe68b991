//! The track registry: owns every live audio handle.
//!
//! All mutation paths unload the previous occupant before a slot is
//! reassigned or dropped, so a leaked handle cannot be expressed through
//! this API. Unload failures are logged and swallowed; the slot is
//! relinquished either way.

use crate::fx::FxEcho;
use std::collections::HashMap;
use stembox_audio::AudioHandle;
use stembox_core::{TrackId, TrackKind};
use tracing::{debug, warn};

/// One registered track.
pub struct Track {
    pub id: TrackId,
    pub kind: TrackKind,
    /// `None` only when the most recent load attempt failed.
    pub handle: Option<Box<dyn AudioHandle>>,
    pub fx: Vec<FxEcho>,
}

impl Track {
    pub fn new(id: impl Into<TrackId>, kind: TrackKind, handle: Option<Box<dyn AudioHandle>>) -> Self {
        Self {
            id: id.into(),
            kind,
            handle,
            fx: Vec::new(),
        }
    }

    pub fn has_fx(&self) -> bool {
        !self.fx.is_empty()
    }
}

/// Fingerprint of a custom track's last-applied descriptor, used to decide
/// reload versus reuse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CustomTrackMeta {
    pub source_uri: Option<String>,
    pub delay_offset_ms: Option<u64>,
}

/// Arena of tracks keyed by id, plus custom-track metadata.
#[derive(Default)]
pub struct TrackRegistry {
    tracks: HashMap<TrackId, Track>,
    custom_meta: HashMap<TrackId, CustomTrackMeta>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a track, unloading any previous occupant of the id first.
    pub fn insert(&mut self, track: Track) {
        if let Some(previous) = self.tracks.remove(&track.id) {
            unload_track(previous);
        }
        debug!(id = %track.id, kind = ?track.kind, loaded = track.handle.is_some(), "track registered");
        self.tracks.insert(track.id.clone(), track);
    }

    /// Remove a track entirely: handle, echoes, and metadata.
    pub fn remove(&mut self, id: &str) {
        if let Some(track) = self.tracks.remove(id) {
            debug!(id, "track removed");
            unload_track(track);
        }
        self.custom_meta.remove(id);
    }

    /// Remove every track of the given kind.
    pub fn clear_kind(&mut self, kind: TrackKind) {
        let ids: Vec<TrackId> = self
            .tracks
            .values()
            .filter(|t| t.kind == kind)
            .map(|t| t.id.clone())
            .collect();
        for id in ids {
            self.remove(&id);
        }
    }

    /// Remove everything. Used on teardown.
    pub fn clear(&mut self) {
        let ids: Vec<TrackId> = self.tracks.keys().cloned().collect();
        for id in ids {
            self.remove(&id);
        }
    }

    /// Replace a track's echo list, unloading the old echoes first.
    pub fn set_fx(&mut self, id: &str, fx: Vec<FxEcho>) {
        if let Some(track) = self.tracks.get_mut(id) {
            for echo in track.fx.drain(..) {
                unload_echo(echo);
            }
            track.fx = fx;
        } else {
            // No owner to attach to; release the orphaned handles.
            for echo in fx {
                unload_echo(echo);
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&Track> {
        self.tracks.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Track> {
        self.tracks.get_mut(id)
    }

    pub fn tracks(&self) -> impl Iterator<Item = &Track> {
        self.tracks.values()
    }

    pub fn tracks_mut(&mut self) -> impl Iterator<Item = &mut Track> {
        self.tracks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.tracks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty()
    }

    /// Ids of all custom tracks currently registered.
    pub fn custom_ids(&self) -> Vec<TrackId> {
        self.tracks
            .values()
            .filter(|t| t.kind == TrackKind::Custom)
            .map(|t| t.id.clone())
            .collect()
    }

    pub fn meta(&self, id: &str) -> Option<&CustomTrackMeta> {
        self.custom_meta.get(id)
    }

    pub fn set_meta(&mut self, id: impl Into<TrackId>, meta: CustomTrackMeta) {
        self.custom_meta.insert(id.into(), meta);
    }
}

impl Drop for TrackRegistry {
    fn drop(&mut self) {
        self.clear();
    }
}

fn unload_track(mut track: Track) {
    if let Some(mut handle) = track.handle.take() {
        if let Err(e) = handle.unload() {
            warn!(id = %track.id, error = %e, "track unload failed; dropping handle anyway");
        }
    }
    for echo in track.fx.drain(..) {
        unload_echo(echo);
    }
}

fn unload_echo(echo: FxEcho) {
    if let Err(e) = echo.handle.lock().unload() {
        warn!(owner = %echo.owner, kind = ?echo.kind, error = %e, "echo unload failed; dropping handle anyway");
    }
}
