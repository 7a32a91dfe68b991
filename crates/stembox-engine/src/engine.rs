//! The engine facade.
//!
//! One `Engine` instance owns the registry, loader, scheduler, and the
//! authoritative position cursor. There is no global state: tests construct
//! as many isolated engines as they need, and teardown is the instance
//! dropping (or an explicit [`Engine::shutdown`]).
//!
//! `position_ms` is the single source of truth while paused; while playing
//! it is refreshed only on seek or on the next pause/stop. Callers needing a
//! live position display poll handle positions themselves.

use crate::fx::{delay_mismatch, fx_plan, FxEcho};
use crate::job::{normalize_stems, resolve_url};
use crate::mixer;
use crate::registry::{CustomTrackMeta, Track, TrackRegistry};
use crate::scheduler::Scheduler;
use crate::transport::{self, TransportState};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use stembox_core::aux_tracks;
use stembox_core::{CustomTrackDescriptor, FxRequest, JobResult, MixerTrack, TrackKind};
use stembox_audio::{AudioBackend, Loader};
use tracing::{info, warn};

/// Engine tuning knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-load acquisition timeout.
    pub load_timeout_ms: u64,
    /// Delay tap offset used when a descriptor gives none.
    pub delay_offset_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: 20_000,
            delay_offset_ms: 220,
        }
    }
}

/// The multi-track playback and mixing engine.
pub struct Engine {
    loader: Loader,
    registry: TrackRegistry,
    scheduler: Scheduler,
    config: EngineConfig,
    state: TransportState,
    position_ms: u64,
    click_enabled: bool,
    guide_enabled: bool,
    pad_enabled: bool,
    pad_pitch_semitones: f32,
    pad_volume: f32,
}

impl Engine {
    /// Create an engine over the given backend.
    pub fn new(backend: Arc<dyn AudioBackend>, config: EngineConfig) -> Self {
        let loader = Loader::with_timeout(
            backend,
            Duration::from_millis(config.load_timeout_ms),
        );
        Self {
            loader,
            registry: TrackRegistry::new(),
            scheduler: Scheduler::new(),
            config,
            state: TransportState::Stopped,
            position_ms: 0,
            click_enabled: true,
            guide_enabled: true,
            pad_enabled: true,
            pad_pitch_semitones: 0.0,
            pad_volume: 1.0,
        }
    }

    /// Create an engine with default configuration.
    pub fn with_defaults(backend: Arc<dyn AudioBackend>) -> Self {
        Self::new(backend, EngineConfig::default())
    }

    /// Unload everything and reset the transport.
    pub fn shutdown(&mut self) {
        self.scheduler.cancel_all();
        self.registry.clear();
        self.position_ms = 0;
        self.state = TransportState::Stopped;
        info!("engine shut down");
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Load stems and auxiliary tracks from a finished separation job.
    ///
    /// Unconditionally unloads and reloads every stem (track id = stem
    /// type) and the click/guide/pad auxiliaries. Pad pitch and the
    /// auxiliary enable flags are re-applied after the reload, since they
    /// are engine state, not part of the source audio.
    pub async fn load_from_backend(&mut self, job: &JobResult, base_url: Option<&str>) {
        let stems = normalize_stems(job.stems.as_ref());
        info!(stem_count = stems.len(), "loading job result");

        self.registry.clear_kind(TrackKind::Stem);
        for (stem_type, url) in stems {
            let resolved = resolve_url(base_url, &url);
            let handle = self.loader.load(Some(&resolved)).await;
            self.registry
                .insert(Track::new(stem_type, TrackKind::Stem, handle));
        }

        self.reload_aux(aux_tracks::CLICK, TrackKind::Click, job.click_track.as_deref(), base_url)
            .await;
        self.reload_aux(aux_tracks::GUIDE, TrackKind::Guide, job.voice_guide.as_deref(), base_url)
            .await;
        self.reload_aux(aux_tracks::PAD, TrackKind::Pad, job.pad_track.as_deref(), base_url)
            .await;

        self.apply_aux_state();
    }

    async fn reload_aux(
        &mut self,
        id: &str,
        kind: TrackKind,
        url: Option<&str>,
        base_url: Option<&str>,
    ) {
        self.registry.remove(id);
        if let Some(url) = url {
            let resolved = resolve_url(base_url, url);
            let handle = self.loader.load(Some(&resolved)).await;
            self.registry.insert(Track::new(id, kind, handle));
        }
    }

    /// Converge the registry onto a new custom-track descriptor list with
    /// minimum churn.
    ///
    /// A track is reloaded only when something that is baked into its
    /// handles changed: the source URI, the delay tap offset, or whether it
    /// has FX at all. An unchanged descriptor costs zero loader calls.
    /// Descriptors are processed sequentially so two reload decisions can
    /// never race on the same registry entry.
    pub async fn load_custom_tracks(&mut self, descriptors: &[CustomTrackDescriptor]) {
        let incoming: HashSet<&str> = descriptors
            .iter()
            .filter(|d| !d.id.is_empty())
            .map(|d| d.id.as_str())
            .collect();
        for id in self.registry.custom_ids() {
            if !incoming.contains(id.as_str()) {
                info!(id = %id, "custom track dropped from descriptor list");
                self.registry.remove(&id);
            }
        }

        for descriptor in descriptors {
            if descriptor.id.is_empty() {
                continue;
            }
            self.reconcile_custom_track(descriptor).await;
        }
    }

    async fn reconcile_custom_track(&mut self, descriptor: &CustomTrackDescriptor) {
        let id = descriptor.id.as_str();
        let wants_fx = descriptor.fx.map(|fx| fx.wants_fx()).unwrap_or(false);

        let (has_handle, has_fx, delay_mismatched) = match self.registry.get(id) {
            Some(track) => (
                track.handle.is_some(),
                track.has_fx(),
                delay_mismatch(descriptor.fx.as_ref(), &track.fx),
            ),
            None => (false, false, false),
        };
        let uri_changed = match self.registry.meta(id) {
            Some(meta) => meta.source_uri.as_deref() != descriptor.uri.as_deref(),
            None => descriptor.uri.is_some(),
        };

        let should_reload = !has_handle || uri_changed || delay_mismatched || wants_fx != has_fx;

        if should_reload {
            self.registry.remove(id);
            let handle = match descriptor.uri.as_deref() {
                Some(uri) => self.loader.load(Some(uri)).await,
                None => None,
            };
            let mut track = Track::new(id, TrackKind::Custom, handle);
            if wants_fx {
                track.fx = self
                    .build_echoes(id, descriptor.uri.as_deref(), descriptor.fx.as_ref())
                    .await;
            }
            self.registry.insert(track);
        } else if wants_fx && !has_fx {
            let echoes = self
                .build_echoes(id, descriptor.uri.as_deref(), descriptor.fx.as_ref())
                .await;
            self.registry.set_fx(id, echoes);
        } else if !wants_fx && has_fx {
            self.registry.set_fx(id, Vec::new());
        }

        self.registry.set_meta(
            id,
            CustomTrackMeta {
                source_uri: descriptor.uri.clone(),
                delay_offset_ms: descriptor.fx.and_then(|fx| fx.delay_ms),
            },
        );
    }

    async fn build_echoes(
        &mut self,
        owner: &str,
        uri: Option<&str>,
        request: Option<&FxRequest>,
    ) -> Vec<FxEcho> {
        let (Some(uri), Some(request)) = (uri, request) else {
            return Vec::new();
        };
        let mut echoes = Vec::new();
        for spec in fx_plan(request, self.config.delay_offset_ms) {
            match self.loader.load(Some(uri)).await {
                Some(handle) => echoes.push(FxEcho {
                    owner: owner.into(),
                    kind: spec.kind,
                    offset_ms: spec.offset_ms,
                    base_mix: spec.base_mix,
                    handle: Arc::new(Mutex::new(handle)),
                }),
                None => warn!(owner, kind = ?spec.kind, "echo load failed; tap skipped"),
            }
        }
        echoes
    }

    // ------------------------------------------------------------------
    // Mixing
    // ------------------------------------------------------------------

    /// Apply a mixer-state snapshot to every matching track and echo.
    pub fn set_mixer_state(&mut self, snapshot: &[MixerTrack]) {
        mixer::apply_snapshot(&mut self.registry, snapshot);
    }

    pub fn set_click_enabled(&mut self, enabled: bool) {
        self.click_enabled = enabled;
        self.apply_aux_state();
    }

    pub fn set_guide_enabled(&mut self, enabled: bool) {
        self.guide_enabled = enabled;
        self.apply_aux_state();
    }

    pub fn set_pad_enabled(&mut self, enabled: bool) {
        self.pad_enabled = enabled;
        self.apply_aux_state();
    }

    /// Pitch-shift the pad, in semitones, via playback rate.
    pub fn set_pad_pitch(&mut self, semitones: f32) {
        self.pad_pitch_semitones = semitones;
        self.apply_aux_state();
    }

    /// Pad gain, clamped to [0, 1.5].
    pub fn set_pad_volume(&mut self, volume: f32) {
        self.pad_volume = volume.clamp(0.0, 1.5);
        self.apply_aux_state();
    }

    /// Re-apply auxiliary enable flags, pad volume, and pad pitch. Safe to
    /// call repeatedly; every application is idempotent.
    fn apply_aux_state(&mut self) {
        let click = if self.click_enabled { 1.0 } else { 0.0 };
        let guide = if self.guide_enabled { 1.0 } else { 0.0 };
        let pad = if self.pad_enabled { self.pad_volume } else { 0.0 };
        let rate = 2f32.powf(self.pad_pitch_semitones / 12.0);

        self.apply_volume(aux_tracks::CLICK, click);
        self.apply_volume(aux_tracks::GUIDE, guide);
        self.apply_volume(aux_tracks::PAD, pad);
        if let Some(track) = self.registry.get_mut(aux_tracks::PAD) {
            if let Some(handle) = track.handle.as_mut() {
                if let Err(e) = handle.set_rate(rate) {
                    warn!(error = %e, "pad rate apply failed");
                }
            }
        }
    }

    fn apply_volume(&mut self, id: &str, volume: f32) {
        if let Some(track) = self.registry.get_mut(id) {
            if let Some(handle) = track.handle.as_mut() {
                if let Err(e) = handle.set_volume(volume) {
                    warn!(id, error = %e, "volume apply failed");
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start playback of every loaded handle from the position cursor.
    pub fn play(&mut self) {
        let position = self.position_ms;
        info!(position_ms = position, "transport play");

        transport::seek_all(&mut self.registry, position);
        self.apply_aux_state();

        let registry = &mut self.registry;
        let scheduler = &mut self.scheduler;
        for track in registry.tracks_mut() {
            if let Some(handle) = track.handle.as_mut() {
                if let Err(e) = handle.play() {
                    warn!(id = %track.id, error = %e, "play failed; continuing");
                }
            }
            for echo in track.fx.iter_mut() {
                if echo.offset_ms > position {
                    // The echo's natural start lies ahead of where playback
                    // begins; arm a one-shot deferred start.
                    let handle = Arc::clone(&echo.handle);
                    let owner = echo.owner.clone();
                    let kind = echo.kind;
                    scheduler.arm(echo.offset_ms - position, move || {
                        if let Err(e) = handle.lock().play() {
                            warn!(owner = %owner, kind = ?kind, error = %e, "deferred echo start failed");
                        }
                    });
                } else if let Err(e) = echo.handle.lock().play() {
                    warn!(owner = %echo.owner, kind = ?echo.kind, error = %e, "echo play failed; continuing");
                }
            }
        }

        self.state = TransportState::Playing;
    }

    /// Pause playback, refreshing the position cursor from the first main
    /// handle whose position reads back.
    ///
    /// Handles are trusted to have stayed aligned since play; no cross-handle
    /// reconciliation happens here, so independent drift would go unnoticed.
    pub fn pause(&mut self) {
        self.scheduler.cancel_all();
        if let Some(position) = transport::pause_all(&mut self.registry) {
            self.position_ms = position;
        }
        self.state = TransportState::Paused;
        info!(position_ms = self.position_ms, "transport pause");
    }

    /// Move the timeline without changing play/pause state.
    pub fn seek(&mut self, seconds: f64) {
        let clamped = seconds.max(0.0);
        self.position_ms = (clamped * 1000.0).round() as u64;
        transport::seek_all(&mut self.registry, self.position_ms);
        info!(position_ms = self.position_ms, "transport seek");
    }

    /// Stop playback and rewind to the start.
    pub fn stop(&mut self) {
        self.scheduler.cancel_all();
        self.position_ms = 0;
        transport::stop_all(&mut self.registry);
        self.state = TransportState::Stopped;
        info!("transport stop");
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn state(&self) -> TransportState {
        self.state
    }

    /// The authoritative logical position in milliseconds.
    pub fn position_ms(&self) -> u64 {
        self.position_ms
    }

    /// Longest duration across loaded track handles, in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        self.registry
            .tracks()
            .filter_map(|t| t.handle.as_ref().and_then(|h| h.duration().ok()))
            .max()
            .unwrap_or(0)
    }

    /// Read access to the registry, for inspection and tests.
    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Deferred echo starts currently armed.
    pub fn pending_fx_starts(&mut self) -> usize {
        self.scheduler.pending()
    }
}
