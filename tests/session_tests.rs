// Integration tests for the recording session lifecycle
//
// Most tests drive ticks by hand (no automatic ticker) so durations are
// exact; the ticker itself is covered with a short interval.

use anyhow::Result;
use journal_recorder::audio::{
    AudioBackendConfig, AudioFile, AudioSource, ARTIFACT_CHANNELS, ARTIFACT_SAMPLE_RATE,
};
use journal_recorder::{
    Category, Inventory, JournalError, Recording, SessionConfig, SessionManager, SessionState,
    StaticIdentity, StaticPermission, Uploader,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;

fn session_config(max_duration_secs: u32, tick_interval: Option<Duration>) -> SessionConfig {
    SessionConfig {
        max_duration_secs,
        tick_interval,
        audio: AudioBackendConfig {
            buffer_duration_ms: 10,
            ..Default::default()
        },
        source: AudioSource::silence(),
    }
}

fn manual_manager(dir: &TempDir, max_duration_secs: u32) -> Result<SessionManager> {
    let inventory = Arc::new(Inventory::open(dir.path())?);
    Ok(SessionManager::builder(session_config(max_duration_secs, None), inventory).build())
}

/// Remembers every upload and whether the recording was already committed
struct FakeUploader {
    inventory: Arc<Inventory>,
    fail: bool,
    calls: Mutex<Vec<(String, bool)>>,
}

impl FakeUploader {
    fn new(inventory: Arc<Inventory>, fail: bool) -> Arc<Self> {
        Arc::new(Self {
            inventory,
            fail,
            calls: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl Uploader for FakeUploader {
    async fn upload(&self, recording: &Recording, remote_key: &str) -> journal_recorder::Result<String> {
        let committed = self.inventory.get(recording.id).await.is_ok();
        self.calls.lock().await.push((remote_key.to_string(), committed));

        if self.fail {
            return Err(JournalError::UploadFailure {
                key: remote_key.to_string(),
                reason: "storage offline".to_string(),
            });
        }
        Ok(format!("https://storage.example/{}", remote_key))
    }

    fn name(&self) -> &str {
        "fake"
    }
}

#[tokio::test]
async fn test_three_ticks_then_stop() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;

    let started = manager.start(Category::Grateful).await?;
    assert_eq!(started.state, SessionState::Recording);
    assert_eq!(started.elapsed_seconds, 0);

    for _ in 0..3 {
        assert!(manager.tick().await?.is_none());
    }
    assert_eq!(manager.snapshot().elapsed_seconds, 3);
    assert_eq!(manager.snapshot().remaining_seconds(), 237);

    let recording = manager.stop().await?.expect("a recording");
    assert_eq!(recording.duration_seconds, 3);
    assert_eq!(recording.category, Category::Grateful);
    assert_eq!(Some(recording.id), started.session_id);
    assert_eq!(Some(&recording.file_path), started.target_file.as_ref());
    assert!(recording.file_path.exists());

    let listed = manager.inventory().list(Category::Grateful).await?;
    assert_eq!(listed, vec![recording]);
    assert_eq!(manager.snapshot().state, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_ceiling_stops_automatically() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;

    manager.start(Category::Challenging).await?;

    for second in 1..240 {
        assert!(manager.tick().await?.is_none(), "tick {} should not stop", second);
        assert!(manager.snapshot().elapsed_seconds <= 240);
    }

    let recording = manager.tick().await?.expect("ceiling tick commits");
    assert_eq!(recording.duration_seconds, 240);
    assert_eq!(manager.snapshot().state, SessionState::Idle);

    // Further ticks and a racing manual stop are no-ops
    assert!(manager.tick().await?.is_none());
    assert!(manager.stop().await?.is_none());

    assert_eq!(manager.inventory().list(Category::Challenging).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_start_while_recording_is_rejected() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;

    manager.start(Category::Grateful).await?;
    manager.tick().await?;
    let before = manager.snapshot();

    match manager.start(Category::Beautiful).await {
        Err(JournalError::AlreadyRecording { category }) => assert_eq!(category, Category::Beautiful),
        other => panic!("Expected AlreadyRecording, got {:?}", other),
    }

    assert_eq!(manager.snapshot(), before, "Existing session is unaffected");

    let recording = manager.stop().await?.expect("a recording");
    assert_eq!(recording.category, Category::Grateful);
    assert_eq!(recording.duration_seconds, 1);
    assert!(manager.inventory().list(Category::Beautiful).await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_concurrent_starts_admit_one_session() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;

    let (a, b) = tokio::join!(
        manager.start(Category::Grateful),
        manager.start(Category::Beautiful)
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1, "Exactly one start wins");
    let loser = if a.is_ok() { b } else { a };
    assert!(matches!(loser, Err(JournalError::AlreadyRecording { .. })));

    manager.stop().await?;
    Ok(())
}

#[tokio::test]
async fn test_permission_denied() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let manager = SessionManager::builder(session_config(240, None), inventory.clone())
        .permission(Arc::new(StaticPermission(false)))
        .build();

    match manager.start(Category::Beautiful).await {
        Err(JournalError::PermissionDenied { category }) => assert_eq!(category, Category::Beautiful),
        other => panic!("Expected PermissionDenied, got {:?}", other),
    }

    assert_eq!(manager.snapshot().state, SessionState::Idle);
    let files = std::fs::read_dir(inventory.category_dir(Category::Beautiful))?.count();
    assert_eq!(files, 0, "No artifact should be allocated");

    Ok(())
}

#[tokio::test]
async fn test_stop_while_idle_is_noop() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;

    let before = manager.snapshot();
    assert!(manager.stop().await?.is_none());
    assert!(manager.tick().await?.is_none());
    assert_eq!(manager.snapshot(), before);

    Ok(())
}

#[tokio::test]
async fn test_each_session_gets_a_fresh_file_and_counter() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;

    manager.start(Category::Grateful).await?;
    manager.tick().await?;
    manager.tick().await?;
    let first = manager.stop().await?.expect("first");

    let second_start = manager.start(Category::Grateful).await?;
    assert_eq!(second_start.elapsed_seconds, 0);
    let second = manager.stop().await?.expect("second");

    assert_ne!(first.id, second.id);
    assert_ne!(first.file_path, second.file_path);
    assert_eq!(second.duration_seconds, 0);

    // Deleting the first never lets a later session collide with it
    manager.inventory().delete(first.id).await?;
    manager.start(Category::Grateful).await?;
    let third = manager.stop().await?.expect("third");
    assert_ne!(third.file_path, second.file_path);
    assert_eq!(manager.inventory().count(Category::Grateful).await?, 2);

    Ok(())
}

#[tokio::test]
async fn test_artifact_is_stereo_wav() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let mut config = session_config(240, None);
    config.source = AudioSource::Synthetic {
        tone_hz: 440.0,
        amplitude: 0.5,
    };
    let manager = SessionManager::builder(config, inventory).build();

    manager.start(Category::Beautiful).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let recording = manager.stop().await?.expect("a recording");

    let audio = AudioFile::open(&recording.file_path)?;
    assert_eq!(audio.sample_rate, 44100);
    assert_eq!(audio.channels, 2);
    assert!(!audio.samples.is_empty(), "Captured frames reach the artifact");
    assert!(audio.peak_level() > 0.0);

    Ok(())
}

#[tokio::test]
async fn test_automatic_ticker_hits_ceiling() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let manager = SessionManager::builder(
        session_config(3, Some(Duration::from_millis(20))),
        inventory.clone(),
    )
    .build();

    let mut state = manager.subscribe();
    manager.start(Category::Grateful).await?;

    tokio::time::timeout(
        Duration::from_secs(5),
        state.wait_for(|s| s.state == SessionState::Idle),
    )
    .await??;

    let listed = inventory.list(Category::Grateful).await?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].duration_seconds, 3);

    Ok(())
}

#[tokio::test]
async fn test_no_tick_after_stop() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let manager = SessionManager::builder(
        session_config(240, Some(Duration::from_millis(10))),
        inventory.clone(),
    )
    .build();

    manager.start(Category::Challenging).await?;
    tokio::time::sleep(Duration::from_millis(50)).await;
    let recording = manager.stop().await?.expect("a recording");

    tokio::time::sleep(Duration::from_millis(100)).await;

    let snapshot = manager.snapshot();
    assert_eq!(snapshot.state, SessionState::Idle);
    assert_eq!(snapshot.elapsed_seconds, 0);
    assert_eq!(inventory.get(recording.id).await?, recording, "Committed recording is immutable");

    Ok(())
}

#[tokio::test]
async fn test_subscribers_see_transitions() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;
    let mut state = manager.subscribe();

    manager.start(Category::Grateful).await?;
    assert!(state.has_changed()?);
    assert_eq!(state.borrow_and_update().state, SessionState::Recording);

    manager.tick().await?;
    assert_eq!(state.borrow_and_update().elapsed_seconds, 1);

    manager.stop().await?;
    assert_eq!(state.borrow_and_update().state, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_upload_happens_after_local_commit() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let uploader = FakeUploader::new(inventory.clone(), false);
    let manager = SessionManager::builder(session_config(240, None), inventory)
        .identity(Arc::new(StaticIdentity(Some("grey".to_string()))))
        .uploader(uploader.clone())
        .build();

    manager.start(Category::Grateful).await?;
    let recording = manager.stop().await?.expect("a recording");

    let urls = manager.drain_uploads().await;
    let expected_key = format!("grey/grateful/{}.wav", recording.id);
    assert_eq!(urls, vec![format!("https://storage.example/{}", expected_key)]);

    let calls = uploader.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, expected_key);
    assert!(calls[0].1, "Recording was in the inventory before upload began");

    Ok(())
}

#[tokio::test]
async fn test_upload_failure_keeps_local_copy() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let uploader = FakeUploader::new(inventory.clone(), true);
    let manager = SessionManager::builder(session_config(240, None), inventory.clone())
        .identity(Arc::new(StaticIdentity(Some("grey".to_string()))))
        .uploader(uploader.clone())
        .build();

    manager.start(Category::Beautiful).await?;
    let recording = manager.stop().await?.expect("a recording");

    // A new session is not blocked by the pending upload
    manager.start(Category::Beautiful).await?;
    manager.stop().await?;

    assert!(manager.drain_uploads().await.is_empty());
    assert_eq!(uploader.calls.lock().await.len(), 2);
    assert_eq!(inventory.get(recording.id).await?, recording);
    assert!(recording.file_path.exists());

    Ok(())
}

#[tokio::test]
async fn test_signed_out_stays_local_only() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let uploader = FakeUploader::new(inventory.clone(), false);
    let manager = SessionManager::builder(session_config(240, None), inventory.clone())
        .uploader(uploader.clone())
        .build();

    manager.start(Category::Challenging).await?;
    assert!(manager.stop().await?.is_some());

    assert!(manager.drain_uploads().await.is_empty());
    assert!(uploader.calls.lock().await.is_empty());
    assert_eq!(inventory.count(Category::Challenging).await?, 1);

    Ok(())
}

#[tokio::test]
async fn test_shutdown_commits_active_session() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = manual_manager(&dir, 240)?;

    manager.start(Category::Grateful).await?;
    manager.tick().await?;

    let recording = manager.shutdown().await?.expect("active session saved");
    assert_eq!(recording.duration_seconds, 1);
    assert!(manager.shutdown().await?.is_none());

    Ok(())
}

/// One second of 6-channel audio, a layout the artifact cannot hold
fn surround_source(dir: &TempDir) -> Result<PathBuf> {
    let path = dir.path().join("surround.wav");
    let spec = hound::WavSpec {
        channels: 6,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(&path, spec)?;
    for _ in 0..44100 * 6 {
        writer.write_sample(100i16)?;
    }
    writer.finalize()?;
    Ok(path)
}

fn surround_manager(dir: &TempDir, max_duration_secs: u32) -> Result<SessionManager> {
    let inventory = Arc::new(Inventory::open(dir.path().join("recordings"))?);
    let mut config = session_config(max_duration_secs, None);
    config.source = AudioSource::File(surround_source(dir)?);
    Ok(SessionManager::builder(config, inventory).build())
}

fn artifacts_on_disk(manager: &SessionManager, category: Category) -> Result<usize> {
    Ok(std::fs::read_dir(manager.inventory().category_dir(category))?.count())
}

#[tokio::test]
async fn test_artifact_failure_surfaces_on_stop() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = surround_manager(&dir, 240)?;

    manager.start(Category::Grateful).await?;

    // The failure shows up while the session is still recording
    let mut capture_error = None;
    for _ in 0..100 {
        manager.tick().await?;
        capture_error = manager.snapshot().capture_error;
        if capture_error.is_some() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let capture_error = capture_error.expect("writer failure is reported");
    assert!(capture_error.contains("6 channels"), "{}", capture_error);
    assert_eq!(manager.snapshot().state, SessionState::Recording);

    match manager.stop().await {
        Err(JournalError::ArtifactWriteFailure { .. }) => {}
        other => panic!("Expected ArtifactWriteFailure, got {:?}", other),
    }

    assert_eq!(manager.snapshot().state, SessionState::Idle);
    assert!(manager.inventory().list(Category::Grateful).await?.is_empty());
    assert_eq!(artifacts_on_disk(&manager, Category::Grateful)?, 0, "No orphaned artifact");

    // The slot is free again
    let next = manager.start(Category::Grateful).await?;
    assert_eq!(next.state, SessionState::Recording);
    assert!(next.capture_error.is_none());
    let _ = manager.stop().await;

    Ok(())
}

#[tokio::test]
async fn test_artifact_failure_surfaces_at_ceiling() -> Result<()> {
    let dir = TempDir::new()?;
    let manager = surround_manager(&dir, 2)?;

    manager.start(Category::Beautiful).await?;
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(manager.tick().await?.is_none());
    match manager.tick().await {
        Err(JournalError::ArtifactWriteFailure { .. }) => {}
        other => panic!("Expected ArtifactWriteFailure, got {:?}", other),
    }

    assert_eq!(manager.snapshot().state, SessionState::Idle);
    assert!(manager.tick().await?.is_none());
    assert_eq!(manager.inventory().clear(Category::Beautiful).await?, 0);
    assert_eq!(artifacts_on_disk(&manager, Category::Beautiful)?, 0);

    Ok(())
}

#[tokio::test]
async fn test_artifact_format_is_fixed_regardless_of_capture() -> Result<()> {
    let dir = TempDir::new()?;
    let inventory = Arc::new(Inventory::open(dir.path())?);
    let config = SessionConfig {
        max_duration_secs: 240,
        tick_interval: None,
        audio: AudioBackendConfig {
            target_sample_rate: 22050,
            target_channels: 1,
            buffer_duration_ms: 10,
        },
        source: AudioSource::Synthetic {
            tone_hz: 440.0,
            amplitude: 0.5,
        },
    };
    let manager = SessionManager::builder(config, inventory).build();

    manager.start(Category::Challenging).await?;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let recording = manager.stop().await?.expect("a recording");

    let audio = AudioFile::open(&recording.file_path)?;
    assert_eq!(audio.sample_rate, ARTIFACT_SAMPLE_RATE);
    assert_eq!(audio.channels, ARTIFACT_CHANNELS);
    assert!(!audio.samples.is_empty());

    Ok(())
}
