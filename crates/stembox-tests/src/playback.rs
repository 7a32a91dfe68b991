//! End-to-end transport scenarios against the mock backend.

use std::sync::Arc;
use stembox_audio::testing::{Command, MockBackend};
use stembox_audio::AudioBackend;
use stembox_core::JobResult;
use stembox_engine::{Engine, TransportState};

fn engine_with(backend: &Arc<MockBackend>) -> Engine {
    Engine::with_defaults(backend.clone() as Arc<dyn AudioBackend>)
}

fn job(json: &str) -> JobResult {
    serde_json::from_str(json).unwrap()
}

#[tokio::test]
async fn seek_then_play_runs_all_tracks_from_the_same_position() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(
            &job(r#"{"stems":{"vocals":"v.mp3","drums":"d.mp3"},"click_track":"c.mp3"}"#),
            None,
        )
        .await;
    assert_eq!(engine.registry().len(), 3);

    engine.seek(10.0);
    for url in ["v.mp3", "d.mp3", "c.mp3"] {
        let handle = backend.last_handle(url).unwrap();
        assert!(handle.lock().log.contains(&Command::Seek(10_000)));
    }

    engine.play();
    for url in ["v.mp3", "d.mp3", "c.mp3"] {
        let handle = backend.last_handle(url).unwrap();
        let state = handle.lock();
        assert!(state.playing);
        assert_eq!(state.position_ms, 10_000);
    }
    assert_eq!(engine.state(), TransportState::Playing);
}

#[tokio::test]
async fn stop_rewinds_everything() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(&job(r#"{"stems":{"vocals":"v.mp3"}}"#), None)
        .await;

    engine.seek(30.0);
    engine.play();
    engine.stop();

    assert_eq!(engine.position_ms(), 0);
    assert_eq!(engine.state(), TransportState::Stopped);
    let handle = backend.last_handle("v.mp3").unwrap();
    assert_eq!(handle.lock().position_ms, 0);
    assert!(!handle.lock().playing);
}

#[tokio::test]
async fn pause_captures_position_from_a_drifted_handle() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(&job(r#"{"stems":{"vocals":"v.mp3"}}"#), None)
        .await;

    engine.play();
    // Simulate the handle advancing while the cursor stayed put.
    backend.last_handle("v.mp3").unwrap().lock().position_ms = 4_321;
    engine.pause();

    assert_eq!(engine.position_ms(), 4_321);
    assert_eq!(engine.state(), TransportState::Paused);
}

#[tokio::test]
async fn play_reapplies_aux_flags_idempotently() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_from_backend(&job(r#"{"click_track":"c.mp3","pad_track":"p.mp3"}"#), None)
        .await;

    engine.set_click_enabled(false);
    engine.set_pad_pitch(-1.0);
    engine.play();

    let click = backend.last_handle("c.mp3").unwrap();
    assert_eq!(click.lock().volume, 0.0);
    assert!(click.lock().playing);

    let pad = backend.last_handle("p.mp3").unwrap();
    let expected = 2f32.powf(-1.0 / 12.0);
    assert!((pad.lock().rate - expected).abs() < 1e-6);
}

#[tokio::test]
async fn empty_job_result_leaves_the_registry_empty() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine.load_from_backend(&JobResult::default(), None).await;

    assert!(engine.registry().is_empty());
    assert_eq!(engine.duration_ms(), 0);
    // Transport over nothing still completes.
    engine.play();
    engine.pause();
    engine.stop();
}
