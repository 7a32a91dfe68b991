//! Custom-track reconciliation: reload only when something baked into the
//! handles actually changed.

use std::sync::Arc;
use stembox_audio::testing::MockBackend;
use stembox_audio::AudioBackend;
use stembox_core::{CustomTrackDescriptor, FxRequest};
use stembox_engine::Engine;

fn engine_with(backend: &Arc<MockBackend>) -> Engine {
    Engine::with_defaults(backend.clone() as Arc<dyn AudioBackend>)
}

fn plain(id: &str, uri: &str) -> CustomTrackDescriptor {
    CustomTrackDescriptor {
        id: id.into(),
        uri: Some(uri.into()),
        fx: None,
    }
}

fn with_delay(id: &str, uri: &str, delay_ms: Option<u64>) -> CustomTrackDescriptor {
    CustomTrackDescriptor {
        id: id.into(),
        uri: Some(uri.into()),
        fx: Some(FxRequest {
            delay: 0.7,
            reverb: 0.0,
            delay_ms,
        }),
    }
}

#[tokio::test]
async fn identical_descriptor_list_costs_zero_loads() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    let descriptors = vec![plain("loop-a", "a.wav"), with_delay("loop-b", "b.wav", None)];

    engine.load_custom_tracks(&descriptors).await;
    let loads_after_first = backend.load_count();

    engine.load_custom_tracks(&descriptors).await;
    assert_eq!(backend.load_count(), loads_after_first);
}

#[tokio::test]
async fn uri_change_reloads_only_that_track() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[plain("a", "a1.wav"), plain("b", "b.wav")])
        .await;

    engine
        .load_custom_tracks(&[plain("a", "a2.wav"), plain("b", "b.wav")])
        .await;

    assert!(backend.last_handle("a1.wav").unwrap().lock().unloaded);
    assert_eq!(backend.load_count_for("a2.wav"), 1);
    assert_eq!(backend.load_count_for("b.wav"), 1);
}

#[tokio::test]
async fn delay_offset_change_reloads_and_rebuilds_fx() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[with_delay("a", "a.wav", Some(220))])
        .await;
    // Main handle + one delay echo.
    assert_eq!(backend.load_count_for("a.wav"), 2);

    engine
        .load_custom_tracks(&[with_delay("a", "a.wav", Some(300))])
        .await;

    // Exactly one reload: two fresh acquisitions, two old handles unloaded.
    assert_eq!(backend.load_count_for("a.wav"), 4);
    assert_eq!(backend.live_handle_count(), 2);
    let track = engine.registry().get("a").unwrap();
    assert_eq!(track.fx.len(), 1);
    assert_eq!(track.fx[0].offset_ms, 300);
}

#[tokio::test]
async fn adding_fx_to_existing_track_forces_a_reload() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine.load_custom_tracks(&[plain("a", "a.wav")]).await;
    assert_eq!(backend.load_count_for("a.wav"), 1);

    engine
        .load_custom_tracks(&[with_delay("a", "a.wav", None)])
        .await;

    // wants_fx flipped, which forces a reload per the decision table:
    // main handle plus delay echo freshly acquired.
    assert_eq!(backend.load_count_for("a.wav"), 3);
    assert!(engine.registry().get("a").unwrap().has_fx());
}

#[tokio::test]
async fn removing_fx_keeps_the_main_handle_when_uri_is_stable() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[with_delay("a", "a.wav", None)])
        .await;
    let track_handles = backend.handles_for("a.wav");
    assert_eq!(track_handles.len(), 2);

    engine.load_custom_tracks(&[plain("a", "a.wav")]).await;

    // has_fx flipped too, so the table reloads; nothing stale survives.
    assert!(!engine.registry().get("a").unwrap().has_fx());
    assert!(track_handles.iter().all(|h| h.lock().unloaded));
}

#[tokio::test]
async fn vanished_id_is_fully_unloaded() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[with_delay("a", "a.wav", None), plain("b", "b.wav")])
        .await;
    assert_eq!(backend.live_handle_count(), 3);

    engine.load_custom_tracks(&[plain("b", "b.wav")]).await;

    assert!(engine.registry().get("a").is_none());
    assert_eq!(backend.live_handle_count(), 1);

    // A vanished id is forgotten entirely: bringing it back is a fresh load.
    engine.load_custom_tracks(&[plain("a", "a.wav"), plain("b", "b.wav")]).await;
    assert_eq!(backend.load_count_for("a.wav"), 3);
}

#[tokio::test]
async fn descriptor_without_uri_registers_an_empty_track() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[CustomTrackDescriptor {
            id: "silent".into(),
            uri: None,
            fx: None,
        }])
        .await;

    assert_eq!(backend.load_count(), 0);
    let track = engine.registry().get("silent").unwrap();
    assert!(track.handle.is_none());
}

#[tokio::test]
async fn reverb_request_builds_two_taps() {
    let backend = Arc::new(MockBackend::new());
    let mut engine = engine_with(&backend);
    engine
        .load_custom_tracks(&[CustomTrackDescriptor {
            id: "verb".into(),
            uri: Some("v.wav".into()),
            fx: Some(FxRequest {
                delay: 0.0,
                reverb: 0.5,
                delay_ms: None,
            }),
        }])
        .await;

    let track = engine.registry().get("verb").unwrap();
    assert_eq!(track.fx.len(), 2);
    let offsets: Vec<u64> = track.fx.iter().map(|e| e.offset_ms).collect();
    assert_eq!(offsets, vec![60, 120]);
    // Three independent handles: owner plus two taps.
    assert_eq!(backend.load_count_for("v.wav"), 3);
}
