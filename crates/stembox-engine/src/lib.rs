//! StemBox Engine - Multi-track synchronized playback and mixing
//!
//! Keeps an unbounded, dynamically-changing set of independently-loaded
//! audio handles aligned to one logical timeline.
//!
//! Architecture:
//! - `TrackRegistry`: Owns every live handle, keyed by track id; unload
//!   before replace is enforced by the registry itself
//! - `job`: Normalizes backend job results into one canonical stem list
//! - `fx`: Derives time-offset echo instances for delay/reverb
//! - `mixer`: Computes effective per-track and per-echo gain
//! - `Scheduler`: Arms and cancels deferred echo starts
//! - `Engine`: Transport controller and facade owning all of the above

pub mod engine;
pub mod fx;
pub mod job;
pub mod mixer;
pub mod registry;
pub mod scheduler;
pub mod transport;

pub use engine::{Engine, EngineConfig};
pub use fx::{EchoSpec, FxEcho, SharedHandle};
pub use registry::{CustomTrackMeta, Track, TrackRegistry};
pub use scheduler::{CancelToken, Scheduler};
pub use transport::TransportState;
