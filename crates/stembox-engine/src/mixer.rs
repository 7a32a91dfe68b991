//! Effective gain computation.
//!
//! Solo semantics: if any track in the snapshot is soloed, every non-soloed
//! track is forced silent, overriding its own volume and EQ factor. The EQ
//! factor is a tonal-balance proxy over the three band values, not a filter.

use crate::registry::TrackRegistry;
use stembox_core::{EchoKind, EqSettings, MixerTrack};
use tracing::warn;

/// Tonal-balance gain proxy: `0.6 + 0.8 * avg(low, mid, high)`, neutral
/// bands (0.5) giving exactly 1.0.
pub fn eq_factor(eq: Option<&EqSettings>) -> f32 {
    let eq = eq.copied().unwrap_or_default();
    let avg = (eq.low + eq.mid + eq.high) / 3.0;
    0.6 + 0.8 * avg
}

/// Effective volume for one track given the snapshot-wide solo state.
pub fn track_volume(entry: &MixerTrack, any_solo: bool) -> f32 {
    let silenced = entry.mute || (any_solo && !entry.solo);
    if silenced {
        return 0.0;
    }
    let base = entry.volume.clamp(0.0, 1.0);
    let eq = entry.fx.as_ref().and_then(|fx| fx.eq.as_ref());
    (base * eq_factor(eq)).clamp(0.0, 1.0)
}

/// Effective volume for one echo. A silenced owner (volume 0) silences the
/// echo with it.
pub fn echo_volume(track_volume: f32, base_mix: f32, intensity: f32) -> f32 {
    track_volume * base_mix * intensity
}

/// Apply a mixer snapshot to every matching registry track and its echoes.
///
/// Volume applies are fire-and-forget: a glitching backend handle must not
/// take the mixer down, so failures are logged and swallowed.
pub fn apply_snapshot(registry: &mut TrackRegistry, snapshot: &[MixerTrack]) {
    let any_solo = snapshot.iter().any(|t| t.solo);
    for entry in snapshot {
        let Some(track) = registry.get_mut(&entry.id) else {
            continue;
        };

        let volume = track_volume(entry, any_solo);
        if let Some(handle) = track.handle.as_mut() {
            if let Err(e) = handle.set_volume(volume) {
                warn!(id = %entry.id, error = %e, "track volume apply failed");
            }
        }

        let fx = entry.fx.unwrap_or_default();
        for echo in track.fx.iter_mut() {
            let intensity = match echo.kind {
                EchoKind::Delay => fx.delay,
                EchoKind::Reverb => fx.reverb,
            };
            let v = echo_volume(volume, echo.base_mix, intensity);
            if let Err(e) = echo.handle.lock().set_volume(v) {
                warn!(id = %entry.id, kind = ?echo.kind, error = %e, "echo volume apply failed");
            }
        }
    }
}
