//! Deferred echo starts and their cancellation.
//!
//! Runs under tokio's paused clock, so timer behavior is deterministic.

use std::sync::Arc;
use std::time::Duration;
use stembox_audio::testing::{Command, MockBackend, SharedState};
use stembox_audio::AudioBackend;
use stembox_core::{CustomTrackDescriptor, FxRequest};
use stembox_engine::Engine;

fn engine_with(backend: &Arc<MockBackend>) -> Engine {
    Engine::with_defaults(backend.clone() as Arc<dyn AudioBackend>)
}

async fn engine_with_delay_track(backend: &Arc<MockBackend>, delay_ms: u64) -> Engine {
    let mut engine = engine_with(backend);
    engine
        .load_custom_tracks(&[CustomTrackDescriptor {
            id: "loop".into(),
            uri: Some("loop.wav".into()),
            fx: Some(FxRequest {
                delay: 0.8,
                reverb: 0.0,
                delay_ms: Some(delay_ms),
            }),
        }])
        .await;
    engine
}

/// The echo handle is the second acquisition of the source URL.
fn echo_handle(backend: &MockBackend) -> SharedState {
    backend.handles_for("loop.wav")[1].clone()
}

#[tokio::test(start_paused = true)]
async fn play_from_zero_arms_a_deferred_start() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with_delay_track(&backend, 220).await;

    engine.play();

    let echo = echo_handle(&backend);
    assert!(!echo.lock().playing);
    assert_eq!(engine.pending_fx_starts(), 1);

    tokio::time::sleep(Duration::from_millis(221)).await;
    assert!(echo.lock().playing);
    assert_eq!(engine.pending_fx_starts(), 0);
}

#[tokio::test(start_paused = true)]
async fn play_past_the_offset_starts_the_echo_immediately() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with_delay_track(&backend, 220).await;

    engine.seek(0.3);
    engine.play();

    let echo = echo_handle(&backend);
    {
        let state = echo.lock();
        assert!(state.playing);
        // Echo runs 220 ms behind the transport: 300 - 220 = 80.
        assert_eq!(state.position_ms, 80);
    }
    assert_eq!(engine.pending_fx_starts(), 0);
}

#[tokio::test(start_paused = true)]
async fn stop_cancels_armed_timers() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with_delay_track(&backend, 220).await;

    engine.play();
    assert_eq!(engine.pending_fx_starts(), 1);
    engine.stop();
    assert_eq!(engine.pending_fx_starts(), 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    let echo = echo_handle(&backend);
    assert!(!echo.lock().playing);
    assert!(!echo.lock().log.contains(&Command::Play));
}

#[tokio::test(start_paused = true)]
async fn pause_cancels_armed_timers() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with_delay_track(&backend, 1000).await;

    engine.play();
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.pause();

    tokio::time::sleep(Duration::from_millis(2000)).await;
    let echo = echo_handle(&backend);
    assert!(!echo.lock().playing);
}

#[tokio::test(start_paused = true)]
async fn seek_shifts_echo_position_without_starting_it() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with_delay_track(&backend, 220).await;

    engine.seek(10.0);

    let echo = echo_handle(&backend);
    let state = echo.lock();
    assert_eq!(state.position_ms, 9_780);
    assert!(!state.playing);
}

#[tokio::test(start_paused = true)]
async fn echo_before_its_offset_is_parked_at_zero() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with_delay_track(&backend, 220).await;

    engine.seek(0.1);
    engine.play();

    let echo = echo_handle(&backend);
    assert_eq!(echo.lock().position_ms, 0);
    // 120 ms of head start still owed.
    assert_eq!(engine.pending_fx_starts(), 1);
    tokio::time::sleep(Duration::from_millis(121)).await;
    assert!(echo.lock().playing);
}
