//! Track identity and boundary descriptors.
//!
//! Everything here crosses the engine boundary: job results come from the
//! stem-separation backend, custom track descriptors and mixer snapshots come
//! from the UI layer. All of it deserializes from JSON.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

/// Logical track identifier. Stems use their stem type ("vocals", "drums"),
/// auxiliaries use the well-known ids in [`crate::aux_tracks`], custom tracks
/// use caller-supplied ids.
pub type TrackId = String;

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackKind {
    /// Separated instrument/vocal stem.
    Stem,
    /// Metronome click.
    Click,
    /// Spoken voice guide.
    Guide,
    /// Harmonic pad.
    Pad,
    /// Caller-managed custom track.
    Custom,
}

/// Kind of FX echo derived from a track's source audio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EchoKind {
    Delay,
    Reverb,
}

/// Result descriptor produced by a finished stem-separation job.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResult {
    /// Stem entries, either an ordered list or a `type -> url` mapping.
    /// A malformed shape deserializes to `None` rather than failing the
    /// whole result.
    #[serde(default, deserialize_with = "lenient_stems")]
    pub stems: Option<StemField>,
    /// Metronome click track URL.
    #[serde(default)]
    pub click_track: Option<String>,
    /// Spoken voice guide URL.
    #[serde(default)]
    pub voice_guide: Option<String>,
    /// Harmonic pad track URL.
    #[serde(default)]
    pub pad_track: Option<String>,
}

/// The two wire shapes the backend uses for stems. Both normalize to the
/// same ordered `(type, url)` list before anything downstream sees them;
/// map iteration order carries no meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StemField {
    List(Vec<StemEntry>),
    Map(BTreeMap<String, String>),
}

fn lenient_stems<'de, D>(deserializer: D) -> Result<Option<StemField>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// One stem in list form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StemEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

/// Descriptor for one caller-managed custom track.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CustomTrackDescriptor {
    pub id: TrackId,
    /// Source URI; a track without one carries no audio.
    #[serde(default)]
    pub uri: Option<String>,
    /// Requested FX configuration.
    #[serde(default)]
    pub fx: Option<FxRequest>,
}

/// FX configuration requested for a custom track.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FxRequest {
    /// Delay intensity, 0 disables.
    #[serde(default)]
    pub delay: f32,
    /// Reverb intensity, 0 disables.
    #[serde(default)]
    pub reverb: f32,
    /// Delay tap offset override in milliseconds.
    #[serde(default, rename = "delayMs")]
    pub delay_ms: Option<u64>,
}

impl FxRequest {
    /// Whether this request asks for any echo at all.
    pub fn wants_fx(&self) -> bool {
        self.delay > 0.0 || self.reverb > 0.0
    }
}

/// One track's entry in a mixer-state snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MixerTrack {
    pub id: TrackId,
    /// Fader volume, clamped to [0, 1] when applied.
    pub volume: f32,
    #[serde(default)]
    pub mute: bool,
    #[serde(default)]
    pub solo: bool,
    #[serde(default)]
    pub fx: Option<MixerFx>,
}

/// FX intensities and EQ carried in a mixer snapshot.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MixerFx {
    #[serde(default)]
    pub delay: f32,
    #[serde(default)]
    pub reverb: f32,
    #[serde(default)]
    pub eq: Option<EqSettings>,
}

/// Three-band tonal balance, each band in [0, 1] with 0.5 neutral.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqSettings {
    #[serde(default = "neutral_band")]
    pub low: f32,
    #[serde(default = "neutral_band")]
    pub mid: f32,
    #[serde(default = "neutral_band")]
    pub high: f32,
}

fn neutral_band() -> f32 {
    0.5
}

impl Default for EqSettings {
    fn default() -> Self {
        Self {
            low: 0.5,
            mid: 0.5,
            high: 0.5,
        }
    }
}
