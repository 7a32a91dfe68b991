//! StemBox Core - Foundation types for rehearsal playback
//!
//! This crate provides the types shared across the StemBox engine:
//! - Track identity and kinds (stems, auxiliaries, custom tracks)
//! - Boundary descriptors consumed from collaborators (backend job results,
//!   custom track lists, mixer snapshots)
//! - The crate-wide error type

pub mod error;
pub mod types;

pub use error::{Result, StemBoxError};
pub use types::{
    CustomTrackDescriptor, EchoKind, EqSettings, FxRequest, JobResult, MixerFx, MixerTrack,
    StemEntry, StemField, TrackId, TrackKind,
};

/// Well-known track ids for the auxiliary layers.
pub mod aux_tracks {
    /// Metronome click track id.
    pub const CLICK: &str = "click";

    /// Spoken voice guide track id.
    pub const GUIDE: &str = "guide";

    /// Harmonic pad track id.
    pub const PAD: &str = "pad";
}
