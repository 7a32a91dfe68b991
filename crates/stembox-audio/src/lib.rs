//! StemBox Audio - Handle abstraction and playback backends
//!
//! Handles loading and controlling individual audio resources.
//!
//! Architecture:
//! - `AudioHandle`: One playable resource with independent transport state
//! - `AudioBackend`: Acquires handles from URLs (the platform audio seam)
//! - `Loader`: Timeout-bounded acquisition that degrades to absence
//! - `DeviceBackend`: cpal-backed backend mixing WAV voices to the default
//!   output device
//! - `testing`: Scriptable mock backend for deterministic engine tests

pub mod backend;
pub mod device;
pub mod handle;
pub mod loader;
pub mod testing;

pub use backend::{AcquireFuture, AudioBackend};
pub use device::DeviceBackend;
pub use handle::AudioHandle;
pub use loader::Loader;
