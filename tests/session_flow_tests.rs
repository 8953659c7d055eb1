use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tripkik::artifact::{AnimationEncoder, EncodeError, EncodeRequest, EncodedAnimation, GifAnimationEncoder};
use tripkik::error::ErrorKind;
use tripkik::kernel::state::{IdleNotice, SessionState};
use tripkik::kernel::time::{Clock, ManualClock};
use tripkik::memory::store::{FileStore, KeyValueStore, MemoryStore, StoreError, StoreResult};
use tripkik::outputs::presenter::Affordance;
use tripkik::outputs::Route;
use tripkik::vision::camera::{Camera, SyntheticCamera};
use tripkik::{SessionReactor, TripkikConfig};

/// Resolves only after the test gives up on it.
struct HangingEncoder;

#[async_trait]
impl AnimationEncoder for HangingEncoder {
    async fn encode(&self, _request: EncodeRequest) -> Result<EncodedAnimation, EncodeError> {
        std::future::pending().await
    }
}

struct StubEncoder;

#[async_trait]
impl AnimationEncoder for StubEncoder {
    async fn encode(&self, _request: EncodeRequest) -> Result<EncodedAnimation, EncodeError> {
        Ok(EncodedAnimation {
            bytes: b"GIF89a".to_vec(),
            mime: "image/gif",
            extension: "gif",
        })
    }
}

/// Reads fine, refuses every write.
struct ReadOnlyStore;

impl KeyValueStore for ReadOnlyStore {
    fn get(&self, _key: &str) -> StoreResult<Option<String>> {
        Ok(None)
    }

    fn set(&self, _key: &str, _value: &str) -> StoreResult<()> {
        Err(StoreError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "quota exceeded",
        )))
    }
}

fn quick_config() -> TripkikConfig {
    let mut config = TripkikConfig::default();
    config.camera.stabilization_ms = 5;
    config.session.tension_delay_ms = 5;
    config
}

fn build<C: Camera, S: KeyValueStore>(
    config: &TripkikConfig,
    camera: C,
    encoder: Arc<dyn AnimationEncoder>,
    store: S,
    clock: Arc<ManualClock>,
) -> SessionReactor<C, S> {
    let clock: Arc<dyn Clock> = clock;
    SessionReactor::from_config(config, camera, encoder, store, clock).unwrap()
}

/// Arms the camera and captures prompt, answer and result at the given instants.
async fn capture_three<C: Camera, S: KeyValueStore>(
    reactor: &mut SessionReactor<C, S>,
    clock: &ManualClock,
    instants: [i64; 3],
) {
    assert!(reactor.press().await, "arming should be accepted");
    assert!(matches!(reactor.state(), SessionState::CapturePrompt), "camera should be ready");
    for at in instants {
        clock.set(at);
        assert!(reactor.press().await, "capture at {at} should be accepted");
    }
    assert!(matches!(reactor.state(), SessionState::AwaitingScore { .. }));
}

#[tokio::test]
async fn test_full_session_archives_record_and_gif() {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(32, 24),
        Arc::new(GifAnimationEncoder::new()),
        FileStore::new(dir.path()).unwrap(),
        clock.clone(),
    );

    // 1. Prompt at 0, answer at 1500, result at 4000
    capture_three(&mut reactor, &clock, [0, 1500, 4000]).await;
    assert!(!reactor.camera().is_streaming(), "camera stops after the result capture");

    // 2. Score it
    assert!(reactor.select_score(3).await.unwrap());

    // 3. Artifact and record
    match reactor.state() {
        SessionState::Completed { artifact, record } => {
            assert_eq!(artifact.filename, "tripkik_preuve_4000_3.gif");
            assert_eq!(artifact.holds_ms, [1500, 750, 1000]);
            assert_eq!((artifact.width, artifact.height), (32, 24));
            assert!(artifact.bytes.starts_with(b"GIF89a"));

            assert_eq!(record.id, 4000);
            assert_eq!(record.score, 3);
            assert_eq!(record.duration_s, "1.5");
            assert_eq!(record.ia_reco, 3);

            let saved = artifact.save_in(dir.path()).unwrap();
            assert!(saved.ends_with("tripkik_preuve_4000_3.gif"));
            assert_eq!(std::fs::read(saved).unwrap(), artifact.bytes);
        }
        other => panic!("expected completed session, got {other:?}"),
    }

    let history = reactor.history().unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, 4000);
    assert!(dir.path().join("tripkik_history.json").exists());
}

#[tokio::test]
async fn test_long_thinking_time_caps_prompt_hold() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(16, 12),
        Arc::new(StubEncoder),
        MemoryStore::new(),
        clock.clone(),
    );

    capture_three(&mut reactor, &clock, [0, 10_000, 12_000]).await;
    reactor.select_score(2).await.unwrap();

    match reactor.state() {
        SessionState::Completed { artifact, record } => {
            assert_eq!(artifact.holds_ms, [3000, 750, 1000], "prompt hold is capped at 3s");
            assert_eq!(record.duration_s, "10.0", "recorded time is not capped");
        }
        other => panic!("expected completed session, got {other:?}"),
    }
}

#[tokio::test]
async fn test_camera_denied_offers_retry_without_record() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(16, 12).denying("NotAllowedError"),
        Arc::new(StubEncoder),
        MemoryStore::new(),
        clock,
    );

    assert!(reactor.press().await);
    match reactor.state() {
        SessionState::Idle { notice: Some(IdleNotice::CameraBlocked { reason }) } => {
            assert!(reason.contains("NotAllowedError"));
        }
        other => panic!("expected blocked camera, got {other:?}"),
    }

    let ui = reactor.ui(&Route::Home);
    let status = ui.status.expect("blocked camera shows a status");
    assert_eq!(status.text, "Caméra bloquée.");
    assert_eq!(status.affordance, Some(Affordance::RetryCamera));

    // Retrying with the same refusal lands in the same place
    assert!(reactor.retry_camera().await);
    assert!(matches!(reactor.state(), SessionState::Idle { notice: Some(_) }));
    assert!(reactor.history().unwrap().is_empty());
}

#[tokio::test]
async fn test_disabled_press_is_a_no_op() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(16, 12),
        Arc::new(StubEncoder),
        MemoryStore::new(),
        clock.clone(),
    );

    capture_three(&mut reactor, &clock, [0, 100, 200]).await;

    // Scoring hides the primary control
    assert!(!reactor.press().await);
    assert!(matches!(reactor.state(), SessionState::AwaitingScore { .. }));

    // A score outside 1..=4 changes nothing either
    assert!(reactor.select_score(0).await.is_err());
    assert!(matches!(reactor.state(), SessionState::AwaitingScore { .. }));

    // Scoring twice is ignored once the session has moved on
    assert!(reactor.select_score(4).await.unwrap());
    assert!(!reactor.select_score(1).await.unwrap());
    match reactor.state() {
        SessionState::Completed { record, .. } => assert_eq!(record.score, 4),
        other => panic!("expected completed session, got {other:?}"),
    }

    // "Home" goes back to idle
    assert!(reactor.press().await);
    assert!(matches!(reactor.state(), SessionState::Idle { notice: None }));
}

#[tokio::test]
async fn test_reset_mid_session_discards_it() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(16, 12),
        Arc::new(StubEncoder),
        MemoryStore::new(),
        clock,
    );

    reactor.press().await;
    reactor.press().await;
    assert_eq!(reactor.state().step(), 2);
    assert!(reactor.camera().is_streaming());

    assert!(reactor.reset().await);
    assert!(matches!(reactor.state(), SessionState::Idle { notice: None }));
    assert!(reactor.state().session().is_none());
    assert!(!reactor.camera().is_streaming(), "reset stops the camera");
    assert!(reactor.history().unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_dimension_capture_fails_with_restart() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(0, 0),
        Arc::new(StubEncoder),
        MemoryStore::new(),
        clock,
    );

    reactor.press().await;
    assert!(reactor.press().await);

    match reactor.state() {
        SessionState::Failed { failure } => assert_eq!(failure.kind, ErrorKind::Capture),
        other => panic!("expected failure, got {other:?}"),
    }
    assert!(!reactor.camera().is_streaming());
    let ui = reactor.ui(&Route::Home);
    assert!(ui.primary.is_none());
    assert_eq!(ui.status.and_then(|s| s.affordance), Some(Affordance::Restart));

    // Restart affordance
    reactor.reset().await;
    assert!(reactor.state().is_idle());
}

#[tokio::test(start_paused = true)]
async fn test_stalled_encoder_times_out_into_failure() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &TripkikConfig::default(),
        SyntheticCamera::new(16, 12),
        Arc::new(HangingEncoder),
        MemoryStore::new(),
        clock.clone(),
    );

    capture_three(&mut reactor, &clock, [0, 500, 900]).await;
    reactor.select_score(1).await.unwrap();

    match reactor.state() {
        SessionState::Failed { failure } => {
            assert_eq!(failure.kind, ErrorKind::Encoding);
            assert!(failure.message.contains("30000"), "{}", failure.message);
        }
        other => panic!("expected encoding failure, got {other:?}"),
    }
    assert!(reactor.history().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reset_handle_abandons_compilation() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &TripkikConfig::default(),
        SyntheticCamera::new(16, 12),
        Arc::new(HangingEncoder),
        MemoryStore::new(),
        clock.clone(),
    );
    capture_three(&mut reactor, &clock, [0, 500, 900]).await;

    let handle = reactor.reset_handle();
    let cancel = async {
        tokio::time::sleep(Duration::from_secs(2)).await;
        handle.reset();
    };
    let (scored, _) = tokio::join!(reactor.select_score(3), cancel);

    assert!(scored.unwrap());
    assert!(matches!(reactor.state(), SessionState::Idle { notice: None }));
    assert!(reactor.history().unwrap().is_empty());
}

#[tokio::test]
async fn test_reset_between_presses_abandons_the_session() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(16, 12),
        Arc::new(StubEncoder),
        MemoryStore::new(),
        clock.clone(),
    );

    // 1. Arm and capture the prompt
    reactor.press().await;
    reactor.press().await;
    assert_eq!(reactor.state().step(), 2);

    // 2. Interrupt while nothing is in flight
    reactor.reset_handle().reset();

    // 3. The next press applies the reset instead of capturing
    clock.set(1500);
    assert!(!reactor.press().await, "press should be swallowed by the reset");
    assert!(matches!(reactor.state(), SessionState::Idle { notice: None }));
    assert!(!reactor.camera().is_streaming());
    assert!(!reactor.select_score(3).await.unwrap());
    assert!(reactor.history().unwrap().is_empty(), "no record without a finished session");
}

#[tokio::test]
async fn test_storage_failure_routes_to_failed() {
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(16, 12),
        Arc::new(StubEncoder),
        ReadOnlyStore,
        clock.clone(),
    );

    capture_three(&mut reactor, &clock, [0, 100, 200]).await;
    reactor.select_score(3).await.unwrap();

    match reactor.state() {
        SessionState::Failed { failure } => {
            assert_eq!(failure.kind, ErrorKind::Storage);
            assert!(failure.message.contains("quota exceeded"));
        }
        other => panic!("expected storage failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_history_lists_most_recent_first() {
    let store = Arc::new(MemoryStore::new());
    let clock = Arc::new(ManualClock::new(0));
    let mut reactor = build(
        &quick_config(),
        SyntheticCamera::new(16, 12),
        Arc::new(StubEncoder),
        store.clone(),
        clock.clone(),
    );

    capture_three(&mut reactor, &clock, [0, 1000, 2000]).await;
    reactor.select_score(4).await.unwrap();
    reactor.press().await;

    capture_three(&mut reactor, &clock, [10_000, 12_500, 13_000]).await;
    reactor.select_score(1).await.unwrap();

    let history = reactor.history().unwrap();
    let ids: Vec<i64> = history.iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![13_000, 2000]);
    assert_eq!(history[0].duration_s, "2.5");

    // Raw storage keeps chronological order
    let raw = store.get("tripkik_history").unwrap().unwrap();
    assert!(raw.find("\"id\":2000").unwrap() < raw.find("\"id\":13000").unwrap());
}
