//! The backend seam between the engine and the platform audio subsystem.

use crate::handle::AudioHandle;
use std::future::Future;
use std::pin::Pin;
use stembox_core::Result;

/// Future returned by [`AudioBackend::acquire`].
pub type AcquireFuture<'a> = Pin<Box<dyn Future<Output = Result<Box<dyn AudioHandle>>> + Send + 'a>>;

/// Acquires playable handles from URLs.
///
/// Implementations own fetching and decoding; the engine never touches the
/// network or a codec directly. An acquire future must be cancel-safe:
/// dropping it before completion releases any partially-acquired resource,
/// which is how the [`crate::Loader`] timeout guarantees no handle is left in
/// an indeterminate state.
pub trait AudioBackend: Send + Sync {
    /// Acquire a fully prepared, non-playing handle for `url`.
    fn acquire(&self, url: &str) -> AcquireFuture<'_>;
}
