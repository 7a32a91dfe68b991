//! FX echo construction.
//!
//! An echo is a second playback instance of a track's own source audio,
//! offset in time. Delay gets one tap; reverb gets two short taps as a crude
//! early-reflection approximation. Every echo owns its own handle (a fresh
//! decode of the same URL) because each one needs an independent playback
//! position.

use parking_lot::Mutex;
use std::sync::Arc;
use stembox_audio::AudioHandle;
use stembox_core::{EchoKind, FxRequest, TrackId};

/// Echo constants.
pub mod taps {
    /// Default delay tap offset when the descriptor gives none.
    pub const DEFAULT_DELAY_OFFSET_MS: u64 = 220;

    /// Base mix level of the delay tap.
    pub const DELAY_BASE_MIX: f32 = 0.6;

    /// Reverb early-reflection taps: (offset ms, base mix).
    pub const REVERB_TAPS: [(u64, f32); 2] = [(60, 0.35), (120, 0.2)];
}

/// An echo's handle is shared with the scheduler's deferred-start timers,
/// which fire on runtime threads.
pub type SharedHandle = Arc<Mutex<Box<dyn AudioHandle>>>;

/// Blueprint for one echo, before its handle is loaded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EchoSpec {
    pub kind: EchoKind,
    pub offset_ms: u64,
    pub base_mix: f32,
}

/// A live echo bound to an owner track.
pub struct FxEcho {
    pub owner: TrackId,
    pub kind: EchoKind,
    pub offset_ms: u64,
    pub base_mix: f32,
    pub handle: SharedHandle,
}

/// The echoes an FX request calls for.
pub fn fx_plan(request: &FxRequest, default_delay_offset_ms: u64) -> Vec<EchoSpec> {
    let mut plan = Vec::new();
    if request.delay > 0.0 {
        plan.push(EchoSpec {
            kind: EchoKind::Delay,
            offset_ms: request.delay_ms.unwrap_or(default_delay_offset_ms),
            base_mix: taps::DELAY_BASE_MIX,
        });
    }
    if request.reverb > 0.0 {
        for (offset_ms, base_mix) in taps::REVERB_TAPS {
            plan.push(EchoSpec {
                kind: EchoKind::Reverb,
                offset_ms,
                base_mix,
            });
        }
    }
    plan
}

/// Where an echo sits when the transport is at `position_ms`.
pub fn shifted_position(position_ms: u64, offset_ms: u64) -> u64 {
    position_ms.saturating_sub(offset_ms)
}

/// True when the descriptor requests a delay tap at a specific offset and a
/// live delay echo sits at a different one. Forces a reload, since a tap
/// offset is baked into the echo at construction time.
pub fn delay_mismatch(request: Option<&FxRequest>, existing: &[FxEcho]) -> bool {
    let Some(request) = request else { return false };
    if request.delay <= 0.0 {
        return false;
    }
    let Some(requested) = request.delay_ms else { return false };
    existing
        .iter()
        .any(|echo| echo.kind == EchoKind::Delay && echo.offset_ms != requested)
}
