//! The audio handle abstraction.

use stembox_core::Result;

/// One playable audio resource bound to a single decoded source.
///
/// Every operation is fallible: a handle may be backed by a device that has
/// been reclaimed, a stream that stalled, or a voice that was already
/// unloaded. Callers that fan out over many handles are expected to log and
/// swallow individual failures rather than abort the aggregate operation.
///
/// A handle is destroyed exactly once via [`AudioHandle::unload`] before its
/// owning slot is reassigned or dropped. Handles are never duplicated; a
/// second playback instance of the same source requires a fresh acquisition
/// through the backend.
pub trait AudioHandle: Send {
    /// Start or resume playback from the current position.
    fn play(&mut self) -> Result<()>;

    /// Pause playback, keeping the current position.
    fn pause(&mut self) -> Result<()>;

    /// Stop playback and rewind to the start.
    fn stop(&mut self) -> Result<()>;

    /// Move the playback position, in milliseconds from the start.
    fn seek(&mut self, position_ms: u64) -> Result<()>;

    /// Set the gain applied to this handle's output.
    fn set_volume(&mut self, volume: f32) -> Result<()>;

    /// Set the playback rate (1.0 = natural speed).
    fn set_rate(&mut self, rate: f32) -> Result<()>;

    /// Current playback position in milliseconds.
    fn position(&self) -> Result<u64>;

    /// Total source duration in milliseconds.
    fn duration(&self) -> Result<u64>;

    /// Release the underlying resource. After this call every other
    /// operation fails.
    fn unload(&mut self) -> Result<()>;
}
