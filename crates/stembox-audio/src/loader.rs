//! Timeout-bounded handle acquisition.

use crate::backend::AudioBackend;
use crate::handle::AudioHandle;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Default acquisition timeout.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(20);

/// Loads audio handles with a bounded timeout.
///
/// The loader never surfaces failure as an error: a missing URL, a backend
/// error, or a timeout all resolve to `None`, with the detail pushed to the
/// log. A rehearsal should keep going with fewer audible tracks rather than
/// abort on one bad stem.
pub struct Loader {
    backend: Arc<dyn AudioBackend>,
    timeout: Duration,
}

impl Loader {
    /// Create a loader over the given backend with the default timeout.
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        Self::with_timeout(backend, DEFAULT_LOAD_TIMEOUT)
    }

    /// Create a loader with an explicit timeout.
    pub fn with_timeout(backend: Arc<dyn AudioBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Acquire a handle for `url`, or `None` on absence, failure, or timeout.
    ///
    /// On timeout the in-flight acquire future is dropped, which per the
    /// [`AudioBackend`] contract releases any partially-acquired resource.
    pub async fn load(&self, url: Option<&str>) -> Option<Box<dyn AudioHandle>> {
        let url = match url {
            Some(u) if !u.is_empty() => u,
            _ => return None,
        };

        match tokio::time::timeout(self.timeout, self.backend.acquire(url)).await {
            Ok(Ok(handle)) => {
                debug!(url, "audio handle acquired");
                Some(handle)
            }
            Ok(Err(e)) => {
                warn!(url, error = %e, "audio load failed");
                None
            }
            Err(_) => {
                warn!(url, timeout_ms = self.timeout.as_millis() as u64, "audio load timed out");
                None
            }
        }
    }
}
