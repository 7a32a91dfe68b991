//! Transport state and per-handle fan-out.
//!
//! Every fan-out tolerates per-handle failures: one reclaimed device or
//! stalled stream must not abort the transition for the other handles, so
//! errors are logged and the loop keeps going.

use crate::fx::shifted_position;
use crate::registry::TrackRegistry;
use tracing::warn;

/// Transport state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Playing,
    Paused,
}

/// Seek every loaded handle to `position_ms`; echoes land on their
/// time-shifted position.
pub(crate) fn seek_all(registry: &mut TrackRegistry, position_ms: u64) {
    for track in registry.tracks_mut() {
        if let Some(handle) = track.handle.as_mut() {
            if let Err(e) = handle.seek(position_ms) {
                warn!(id = %track.id, error = %e, "seek failed; continuing");
            }
        }
        for echo in track.fx.iter_mut() {
            let echo_pos = shifted_position(position_ms, echo.offset_ms);
            if let Err(e) = echo.handle.lock().seek(echo_pos) {
                warn!(owner = %echo.owner, kind = ?echo.kind, error = %e, "echo seek failed; continuing");
            }
        }
    }
}

/// Pause everything, capturing the first track position that reads back.
///
/// Echo positions are time-shifted and never consulted; the captured value
/// comes from whichever main handle answers first, trusting all of them to
/// have stayed aligned since the last play.
pub(crate) fn pause_all(registry: &mut TrackRegistry) -> Option<u64> {
    let mut captured = None;
    for track in registry.tracks_mut() {
        if let Some(handle) = track.handle.as_mut() {
            if captured.is_none() {
                if let Ok(pos) = handle.position() {
                    captured = Some(pos);
                }
            }
            if let Err(e) = handle.pause() {
                warn!(id = %track.id, error = %e, "pause failed; continuing");
            }
        }
        for echo in track.fx.iter_mut() {
            if let Err(e) = echo.handle.lock().pause() {
                warn!(owner = %echo.owner, kind = ?echo.kind, error = %e, "echo pause failed; continuing");
            }
        }
    }
    captured
}

/// Stop every loaded handle.
pub(crate) fn stop_all(registry: &mut TrackRegistry) {
    for track in registry.tracks_mut() {
        if let Some(handle) = track.handle.as_mut() {
            if let Err(e) = handle.stop() {
                warn!(id = %track.id, error = %e, "stop failed; continuing");
            }
        }
        for echo in track.fx.iter_mut() {
            if let Err(e) = echo.handle.lock().stop() {
                warn!(owner = %echo.owner, kind = ?echo.kind, error = %e, "echo stop failed; continuing");
            }
        }
    }
}
