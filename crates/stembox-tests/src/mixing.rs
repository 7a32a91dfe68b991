//! Mixer snapshots applied through the engine.

use std::sync::Arc;
use stembox_audio::testing::MockBackend;
use stembox_audio::AudioBackend;
use stembox_core::{CustomTrackDescriptor, EqSettings, FxRequest, JobResult, MixerFx, MixerTrack};
use stembox_engine::Engine;

fn engine_with(backend: &Arc<MockBackend>) -> Engine {
    Engine::with_defaults(backend.clone() as Arc<dyn AudioBackend>)
}

fn job(json: &str) -> JobResult {
    serde_json::from_str(json).unwrap()
}

fn fader(id: &str, volume: f32) -> MixerTrack {
    MixerTrack {
        id: id.into(),
        volume,
        ..Default::default()
    }
}

#[tokio::test]
async fn solo_silences_every_other_track() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(&job(r#"{"stems":{"vocals":"v.mp3","drums":"d.mp3"}}"#), None)
        .await;

    engine.set_mixer_state(&[
        MixerTrack {
            solo: true,
            ..fader("vocals", 0.8)
        },
        fader("drums", 1.0),
    ]);

    assert!((backend.last_handle("v.mp3").unwrap().lock().volume - 0.8).abs() < 1e-6);
    assert_eq!(backend.last_handle("d.mp3").unwrap().lock().volume, 0.0);
}

#[tokio::test]
async fn mute_wins_even_at_full_volume() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(&job(r#"{"stems":{"bass":"b.mp3"}}"#), None)
        .await;

    engine.set_mixer_state(&[MixerTrack {
        mute: true,
        ..fader("bass", 1.0)
    }]);

    assert_eq!(backend.last_handle("b.mp3").unwrap().lock().volume, 0.0);
}

#[tokio::test]
async fn eq_scales_the_fader_volume() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(&job(r#"{"stems":{"keys":"k.mp3"}}"#), None)
        .await;

    engine.set_mixer_state(&[MixerTrack {
        fx: Some(MixerFx {
            eq: Some(EqSettings {
                low: 0.0,
                mid: 0.0,
                high: 0.0,
            }),
            ..Default::default()
        }),
        ..fader("keys", 1.0)
    }]);

    // Floor of the EQ proxy: 0.6 + 0.8 * 0.
    assert!((backend.last_handle("k.mp3").unwrap().lock().volume - 0.6).abs() < 1e-6);
}

#[tokio::test]
async fn echo_volume_tracks_owner_mix_and_intensity() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[CustomTrackDescriptor {
            id: "loop".into(),
            uri: Some("l.wav".into()),
            fx: Some(FxRequest {
                delay: 0.5,
                reverb: 0.0,
                delay_ms: None,
            }),
        }])
        .await;

    engine.set_mixer_state(&[MixerTrack {
        fx: Some(MixerFx {
            delay: 0.5,
            ..Default::default()
        }),
        ..fader("loop", 0.8)
    }]);

    // track 0.8 * base mix 0.6 * intensity 0.5
    let echo = backend.handles_for("l.wav")[1].clone();
    assert!((echo.lock().volume - 0.24).abs() < 1e-6);
}

#[tokio::test]
async fn muted_owner_silences_its_echoes() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[CustomTrackDescriptor {
            id: "loop".into(),
            uri: Some("l.wav".into()),
            fx: Some(FxRequest {
                delay: 1.0,
                reverb: 0.0,
                delay_ms: None,
            }),
        }])
        .await;

    engine.set_mixer_state(&[MixerTrack {
        mute: true,
        fx: Some(MixerFx {
            delay: 1.0,
            ..Default::default()
        }),
        ..fader("loop", 1.0)
    }]);

    let echo = backend.handles_for("l.wav")[1].clone();
    assert_eq!(echo.lock().volume, 0.0);
}

#[tokio::test]
async fn snapshot_entries_without_a_track_are_skipped() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(&job(r#"{"stems":{"vocals":"v.mp3"}}"#), None)
        .await;

    // Unknown id plus a failing handle: neither takes the mixer down.
    backend.last_handle("v.mp3").unwrap().lock().fail_ops = true;
    engine.set_mixer_state(&[fader("ghost", 1.0), fader("vocals", 0.5)]);
}
