//! cpal-backed playback backend.
//!
//! Mixes every live voice into the default output device. Each acquired
//! handle is one voice with its own position, rate, and gain, so tracks and
//! FX echoes stay independently seekable; there is no shared clock beyond
//! the device callback itself.
//!
//! Sources are local WAV files (`file://` URLs or plain paths), decoded with
//! hound. Remote fetching belongs to the platform layer above this crate.

use crate::backend::{AcquireFuture, AudioBackend};
use crate::handle::AudioHandle;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use stembox_core::{Result, StemBoxError};
use tracing::{info, warn};

/// One playing (or paused) source in the output mix.
struct Voice {
    samples: Arc<Vec<f32>>,
    channels: usize,
    sample_rate: u32,
    /// Position in source frames; fractional to support rate changes.
    frame_pos: f64,
    rate: f32,
    volume: f32,
    playing: bool,
}

impl Voice {
    fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1)
    }
}

type VoiceTable = Arc<Mutex<HashMap<u64, Voice>>>;

/// Backend that plays decoded WAV voices through the default cpal device.
pub struct DeviceBackend {
    voices: VoiceTable,
    next_id: AtomicU64,
    shutdown: Arc<AtomicBool>,
}

impl DeviceBackend {
    /// Open the default output device and start the mixing stream.
    pub fn new() -> Result<Self> {
        let voices: VoiceTable = Arc::new(Mutex::new(HashMap::new()));
        let shutdown = Arc::new(AtomicBool::new(false));

        let thread_voices = Arc::clone(&voices);
        let thread_shutdown = Arc::clone(&shutdown);
        std::thread::Builder::new()
            .name("stembox-audio-out".into())
            .spawn(move || {
                // The cpal stream is not Send, so it lives and dies on this
                // thread; the backend only shares the voice table with it.
                if let Err(e) = run_output(thread_voices, thread_shutdown) {
                    warn!(error = %e, "audio output stream stopped");
                }
            })
            .map_err(|e| StemBoxError::Backend(format!("output thread spawn failed: {e}")))?;

        Ok(Self {
            voices,
            next_id: AtomicU64::new(1),
            shutdown,
        })
    }
}

impl Drop for DeviceBackend {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

impl AudioBackend for DeviceBackend {
    fn acquire(&self, url: &str) -> AcquireFuture<'_> {
        let path = local_path(url);
        Box::pin(async move {
            let decoded = tokio::task::spawn_blocking(move || decode_wav(&path))
                .await
                .map_err(|e| StemBoxError::Backend(format!("decode task failed: {e}")))??;

            // Nothing is registered until after the decode completes, so a
            // dropped (timed-out) acquire future holds no voice to release.
            let duration_ms = decoded.duration_ms();
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            self.voices.lock().insert(
                id,
                Voice {
                    samples: Arc::new(decoded.samples),
                    channels: decoded.channels,
                    sample_rate: decoded.sample_rate,
                    frame_pos: 0.0,
                    rate: 1.0,
                    volume: 1.0,
                    playing: false,
                },
            );
            info!(id, duration_ms, "voice registered");

            Ok(Box::new(DeviceHandle {
                id,
                voices: Arc::clone(&self.voices),
            }) as Box<dyn AudioHandle>)
        })
    }
}

/// Handle over one voice in the device mix.
struct DeviceHandle {
    id: u64,
    voices: VoiceTable,
}

impl DeviceHandle {
    fn with_voice<R>(&self, f: impl FnOnce(&mut Voice) -> R) -> Result<R> {
        let mut voices = self.voices.lock();
        let voice = voices
            .get_mut(&self.id)
            .ok_or_else(|| StemBoxError::Operation(format!("voice {} is unloaded", self.id)))?;
        Ok(f(voice))
    }
}

impl AudioHandle for DeviceHandle {
    fn play(&mut self) -> Result<()> {
        self.with_voice(|v| v.playing = true)
    }

    fn pause(&mut self) -> Result<()> {
        self.with_voice(|v| v.playing = false)
    }

    fn stop(&mut self) -> Result<()> {
        self.with_voice(|v| {
            v.playing = false;
            v.frame_pos = 0.0;
        })
    }

    fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.with_voice(|v| {
            let frame = position_ms as f64 * v.sample_rate as f64 / 1000.0;
            v.frame_pos = frame.min(v.frame_count() as f64);
        })
    }

    fn set_volume(&mut self, volume: f32) -> Result<()> {
        self.with_voice(|v| v.volume = volume.max(0.0))
    }

    fn set_rate(&mut self, rate: f32) -> Result<()> {
        self.with_voice(|v| v.rate = rate.max(0.01))
    }

    fn position(&self) -> Result<u64> {
        self.with_voice(|v| (v.frame_pos * 1000.0 / v.sample_rate as f64) as u64)
    }

    fn duration(&self) -> Result<u64> {
        self.with_voice(|v| v.frame_count() as u64 * 1000 / v.sample_rate as u64)
    }

    fn unload(&mut self) -> Result<()> {
        self.voices
            .lock()
            .remove(&self.id)
            .map(|_| ())
            .ok_or_else(|| StemBoxError::Operation(format!("voice {} already unloaded", self.id)))
    }
}

/// Strip a `file://` scheme; anything else is treated as a plain path.
fn local_path(url: &str) -> PathBuf {
    PathBuf::from(url.strip_prefix("file://").unwrap_or(url))
}

struct DecodedAudio {
    samples: Vec<f32>,
    channels: usize,
    sample_rate: u32,
}

impl DecodedAudio {
    fn duration_ms(&self) -> u64 {
        let frames = self.samples.len() / self.channels.max(1);
        frames as u64 * 1000 / self.sample_rate as u64
    }
}

fn decode_wav(path: &std::path::Path) -> Result<DecodedAudio> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| StemBoxError::Decode(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| StemBoxError::Decode(e.to_string()))?,
        hound::SampleFormat::Int => {
            let scale = (1u32 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| StemBoxError::Decode(e.to_string()))?
        }
    };

    Ok(DecodedAudio {
        samples,
        channels: spec.channels as usize,
        sample_rate: spec.sample_rate,
    })
}

/// Own the output stream for the lifetime of the backend.
fn run_output(voices: VoiceTable, shutdown: Arc<AtomicBool>) -> Result<()> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| StemBoxError::Backend("no output device available".into()))?;
    let config = device
        .default_output_config()
        .map_err(|e| StemBoxError::Backend(e.to_string()))?;
    let out_rate = config.sample_rate().0;
    let out_channels = config.channels() as usize;
    info!(out_rate, out_channels, "output stream opening");

    let callback_voices = Arc::clone(&voices);
    let stream = device
        .build_output_stream(
            &config.into(),
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                data.fill(0.0);
                // try_lock: a blocked control thread must not stall the
                // device callback; one silent buffer is acceptable.
                if let Some(mut voices) = callback_voices.try_lock() {
                    mix_into(&mut voices, data, out_channels, out_rate);
                }
            },
            move |err| {
                warn!(error = %err, "audio stream error");
            },
            None,
        )
        .map_err(|e| StemBoxError::Backend(e.to_string()))?;
    stream.play().map_err(|e| StemBoxError::Backend(e.to_string()))?;

    while !shutdown.load(Ordering::SeqCst) {
        std::thread::sleep(std::time::Duration::from_millis(50));
    }
    Ok(())
}

/// Mix every playing voice into an interleaved output buffer.
///
/// Nearest-neighbor resampling; the rate factor covers both the source/device
/// sample-rate mismatch and the per-voice playback rate (pad pitch shift).
fn mix_into(voices: &mut HashMap<u64, Voice>, data: &mut [f32], out_channels: usize, out_rate: u32) {
    let frames = data.len() / out_channels.max(1);
    for voice in voices.values_mut() {
        if !voice.playing {
            continue;
        }
        let step = voice.rate as f64 * voice.sample_rate as f64 / out_rate as f64;
        let total_frames = voice.frame_count();

        for frame in 0..frames {
            let src_frame = voice.frame_pos as usize;
            if src_frame >= total_frames {
                voice.playing = false;
                break;
            }
            let base = src_frame * voice.channels;
            let left = voice.samples[base];
            let right = if voice.channels > 1 {
                voice.samples[base + 1]
            } else {
                left
            };

            let out = frame * out_channels;
            data[out] += left * voice.volume;
            if out_channels > 1 {
                data[out + 1] += right * voice.volume;
            }
            voice.frame_pos += step;
        }
    }
}
