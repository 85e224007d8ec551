use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::config::SessionConfig;
use super::snapshot::{SessionSnapshot, SessionState};
use crate::access::{IdentityProvider, PermissionCheck, StaticIdentity, StaticPermission};
use crate::audio::{AudioBackend, AudioBackendFactory, AudioFrame, ArtifactSummary, ArtifactWriter};
use crate::category::Category;
use crate::error::{JournalError, Result};
use crate::inventory::{Inventory, Recording};
use crate::upload::{spawn_upload, NoopUploader, Uploader};

/// Owns the lifecycle of the single in-progress recording
///
/// `Idle --start--> Recording --stop/ceiling--> Finishing --commit--> Idle`
///
/// Cheap to clone; all clones drive the same slot.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    config: SessionConfig,
    inventory: Arc<Inventory>,
    permission: Arc<dyn PermissionCheck>,
    identity: Arc<dyn IdentityProvider>,
    uploader: Arc<dyn Uploader>,

    /// At most one session, process-wide
    slot: Mutex<Slot>,

    /// Latest state for pollers and subscribers
    state_tx: watch::Sender<SessionSnapshot>,

    /// Upload handoffs still in flight
    uploads: Mutex<Vec<JoinHandle<Option<String>>>>,
}

enum Slot {
    Idle,
    Recording(ActiveSession),
    Finishing(SessionSnapshot),
}

struct ActiveSession {
    id: Uuid,
    category: Category,
    started_at: DateTime<Utc>,
    elapsed_seconds: u32,
    target_file: PathBuf,
    backend: Box<dyn AudioBackend>,
    writer: WriterTask,
    /// Dropping this ends the ticker task
    ticker: Option<oneshot::Sender<()>>,
}

impl ActiveSession {
    fn snapshot(&self, state: SessionState, max_duration_secs: u32) -> SessionSnapshot {
        SessionSnapshot {
            state,
            session_id: Some(self.id),
            category: Some(self.category),
            started_at: Some(self.started_at),
            elapsed_seconds: self.elapsed_seconds,
            max_duration_secs,
            target_file: Some(self.target_file.clone()),
            capture_error: self.writer.fault(),
        }
    }
}

/// Drains capture frames into the artifact; aborted if the session is torn
/// down without being stopped
struct WriterTask {
    handle: Option<JoinHandle<Result<ArtifactSummary>>>,
    /// Set once if the artifact stopped accepting audio mid-session
    fault: Arc<OnceLock<String>>,
}

impl WriterTask {
    fn spawn(session_id: Uuid, mut rx: mpsc::Receiver<AudioFrame>, mut writer: ArtifactWriter) -> Self {
        let fault = Arc::new(OnceLock::new());
        let task_fault = Arc::clone(&fault);

        let handle = tokio::spawn(async move {
            while let Some(frame) = rx.recv().await {
                if let Err(e) = writer.write_frame(&frame) {
                    error!("Session {} stopped writing audio: {}", session_id, e);
                    let _ = task_fault.set(e.to_string());
                    return Err(e);
                }
            }
            writer.finish()
        });

        Self {
            handle: Some(handle),
            fault,
        }
    }

    fn fault(&self) -> Option<String> {
        self.fault.get().cloned()
    }

    async fn join(mut self, path: &Path) -> Result<ArtifactSummary> {
        let Some(handle) = self.handle.take() else {
            return Err(JournalError::artifact(path, "writer already consumed"));
        };
        handle
            .await
            .map_err(|e| JournalError::artifact(path, format!("writer task failed: {}", e)))?
    }
}

impl Drop for WriterTask {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

/// Builder for [`SessionManager`]; collaborators default to local-only
pub struct SessionManagerBuilder {
    config: SessionConfig,
    inventory: Arc<Inventory>,
    permission: Arc<dyn PermissionCheck>,
    identity: Arc<dyn IdentityProvider>,
    uploader: Arc<dyn Uploader>,
}

impl SessionManagerBuilder {
    pub fn permission(mut self, permission: Arc<dyn PermissionCheck>) -> Self {
        self.permission = permission;
        self
    }

    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = identity;
        self
    }

    pub fn uploader(mut self, uploader: Arc<dyn Uploader>) -> Self {
        self.uploader = uploader;
        self
    }

    pub fn build(self) -> SessionManager {
        let (state_tx, _) = watch::channel(SessionSnapshot::idle(self.config.max_duration_secs));
        SessionManager {
            inner: Arc::new(Inner {
                config: self.config,
                inventory: self.inventory,
                permission: self.permission,
                identity: self.identity,
                uploader: self.uploader,
                slot: Mutex::new(Slot::Idle),
                state_tx,
                uploads: Mutex::new(Vec::new()),
            }),
        }
    }
}

impl SessionManager {
    pub fn builder(config: SessionConfig, inventory: Arc<Inventory>) -> SessionManagerBuilder {
        SessionManagerBuilder {
            config,
            inventory,
            permission: Arc::new(StaticPermission(true)),
            identity: Arc::new(StaticIdentity::default()),
            uploader: Arc::new(NoopUploader),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    pub fn inventory(&self) -> &Arc<Inventory> {
        &self.inner.inventory
    }

    /// Current state, for polling
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.state_tx.borrow().clone()
    }

    /// Push notifications of every state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.state_tx.subscribe()
    }

    fn publish(&self, snapshot: SessionSnapshot) {
        self.inner.state_tx.send_replace(snapshot);
    }

    fn max_duration(&self) -> u32 {
        self.inner.config.max_duration_secs
    }

    /// Begin recording an entry for `category`
    pub async fn start(&self, category: Category) -> Result<SessionSnapshot> {
        let mut slot = self.inner.slot.lock().await;
        let busy_with = match &*slot {
            Slot::Idle => None,
            Slot::Recording(active) => Some(active.id),
            Slot::Finishing(snapshot) => snapshot.session_id,
        };
        if let Some(existing) = busy_with {
            warn!(
                "Session {} still active, rejecting start for {}",
                existing, category
            );
            return Err(JournalError::AlreadyRecording { category });
        }

        if !self.inner.permission.microphone_access().await {
            warn!("Microphone access denied, not starting {} session", category);
            return Err(JournalError::PermissionDenied { category });
        }

        let config = &self.inner.config;
        let id = Uuid::new_v4();
        let target_file = self.inner.inventory.artifact_path(category, id);

        let mut backend = AudioBackendFactory::create(&config.source, config.audio.clone())
            .map_err(|e| JournalError::Capture {
                category,
                reason: format!("{:#}", e),
            })?;

        let writer = ArtifactWriter::create(&target_file)?;

        let frames = match backend.start().await {
            Ok(frames) => frames,
            Err(e) => {
                drop(writer);
                discard_artifact(&target_file).await;
                return Err(JournalError::Capture {
                    category,
                    reason: format!("{:#}", e),
                });
            }
        };

        let ticker = config
            .tick_interval
            .map(|period| spawn_ticker(Arc::downgrade(&self.inner), id, period));

        let session = ActiveSession {
            id,
            category,
            started_at: Utc::now(),
            elapsed_seconds: 0,
            target_file,
            writer: WriterTask::spawn(id, frames, writer),
            backend,
            ticker,
        };

        info!(
            "Recording {} session {} via {} -> {}",
            category,
            id,
            session.backend.name(),
            session.target_file.display()
        );

        let snapshot = session.snapshot(SessionState::Recording, self.max_duration());
        *slot = Slot::Recording(session);
        self.publish(snapshot.clone());

        Ok(snapshot)
    }

    /// Advance the active session by one second
    ///
    /// Returns the committed recording when this tick hit the ceiling.
    /// No-op while idle or finishing.
    pub async fn tick(&self) -> Result<Option<Recording>> {
        self.tick_session(None).await
    }

    async fn tick_session(&self, expected: Option<Uuid>) -> Result<Option<Recording>> {
        let finishing = {
            let mut slot = self.inner.slot.lock().await;
            let Slot::Recording(active) = &mut *slot else {
                return Ok(None);
            };
            if expected.is_some_and(|id| id != active.id) {
                return Ok(None);
            }

            let max = self.max_duration();
            if active.elapsed_seconds < max {
                active.elapsed_seconds += 1;
            }

            if active.elapsed_seconds < max {
                self.publish(active.snapshot(SessionState::Recording, max));
                return Ok(None);
            }

            info!(
                "Session {} reached the {}s ceiling, stopping",
                active.id, max
            );
            Self::begin_finish(&mut slot, max)
        };

        match finishing {
            Some(active) => self.commit(active).await.map(Some),
            None => Ok(None),
        }
    }

    /// Stop the active session and commit its recording
    ///
    /// Returns `Ok(None)` if nothing was recording; manual stops can race the
    /// automatic ceiling stop.
    pub async fn stop(&self) -> Result<Option<Recording>> {
        let finishing = {
            let mut slot = self.inner.slot.lock().await;
            Self::begin_finish(&mut slot, self.max_duration())
        };

        match finishing {
            Some(active) => self.commit(active).await.map(Some),
            None => {
                debug!("Stop requested with no active recording");
                Ok(None)
            }
        }
    }

    /// Recording -> Finishing under the slot lock
    fn begin_finish(slot: &mut Slot, max_duration_secs: u32) -> Option<ActiveSession> {
        match std::mem::replace(slot, Slot::Idle) {
            Slot::Recording(active) => {
                *slot = Slot::Finishing(active.snapshot(SessionState::Finishing, max_duration_secs));
                Some(active)
            }
            other => {
                *slot = other;
                None
            }
        }
    }

    /// Finalize, ingest, go idle, then hand off for upload
    async fn commit(&self, active: ActiveSession) -> Result<Recording> {
        self.publish(active.snapshot(SessionState::Finishing, self.max_duration()));

        let result = self.finalize(active).await;

        *self.inner.slot.lock().await = Slot::Idle;
        self.publish(SessionSnapshot::idle(self.max_duration()));

        let recording = result?;

        if let Some(handle) = spawn_upload(
            Arc::clone(&self.inner.uploader),
            self.inner.identity.as_ref(),
            recording.clone(),
        ) {
            let mut uploads = self.inner.uploads.lock().await;
            uploads.retain(|h| !h.is_finished());
            uploads.push(handle);
        }

        Ok(recording)
    }

    async fn finalize(&self, active: ActiveSession) -> Result<Recording> {
        let ActiveSession {
            id,
            category,
            elapsed_seconds,
            target_file,
            mut backend,
            writer,
            ticker,
            ..
        } = active;
        drop(ticker);

        if let Err(e) = backend.stop().await {
            warn!("Failed to stop {} backend: {:#}", backend.name(), e);
        }

        let summary = match writer.join(&target_file).await {
            Ok(summary) => summary,
            Err(e) => {
                error!("Session {} artifact failed: {}", id, e);
                discard_artifact(&target_file).await;
                return Err(e);
            }
        };

        let recording = Recording {
            id,
            category,
            file_path: summary.path.clone(),
            created_at: Utc::now(),
            duration_seconds: elapsed_seconds,
        };

        if let Err(e) = self.inner.inventory.ingest(&recording).await {
            error!("Session {} could not be committed: {}", id, e);
            // Same id in the same category means the file is already listed
            let listed = matches!(e, JournalError::DuplicateId { .. })
                && self
                    .inner
                    .inventory
                    .get(id)
                    .await
                    .is_ok_and(|existing| existing.category == category);
            if !listed {
                discard_artifact(&target_file).await;
            }
            return Err(e);
        }

        info!(
            "Committed {} recording {} ({}s, {:.1}s of audio)",
            category,
            id,
            elapsed_seconds,
            summary.audio_seconds()
        );

        Ok(recording)
    }

    /// Wait for in-flight uploads; returns the URLs that succeeded
    pub async fn drain_uploads(&self) -> Vec<String> {
        let handles: Vec<_> = std::mem::take(&mut *self.inner.uploads.lock().await);
        let mut urls = Vec::new();
        for handle in handles {
            match handle.await {
                Ok(Some(url)) => urls.push(url),
                Ok(None) => {}
                Err(e) => error!("Upload task panicked: {}", e),
            }
        }
        urls
    }

    /// Teardown: commit any active session and flush uploads
    pub async fn shutdown(&self) -> Result<Option<Recording>> {
        let recording = self.stop().await?;
        self.drain_uploads().await;
        Ok(recording)
    }
}

/// Remove an artifact that will never be listed
async fn discard_artifact(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!("Discarded artifact {}", path.display()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove orphaned artifact {}: {}", path.display(), e),
    }
}

/// Periodic tick source bound to one session
///
/// Ends when the sender half is dropped with the session, when the manager
/// is gone, or when a tick finds its session no longer recording.
fn spawn_ticker(inner: Weak<Inner>, session_id: Uuid, period: Duration) -> oneshot::Sender<()> {
    let (cancel_tx, mut cancel_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                biased;
                _ = &mut cancel_rx => break,
                _ = interval.tick() => {
                    let Some(inner) = inner.upgrade() else { break };
                    let manager = SessionManager { inner };

                    match manager.tick_session(Some(session_id)).await {
                        Ok(Some(_)) => break,
                        Ok(None) => {
                            if manager.snapshot().session_id != Some(session_id) {
                                break;
                            }
                        }
                        Err(e) => {
                            error!("Automatic stop of session {} failed: {}", session_id, e);
                            break;
                        }
                    }
                }
            }
        }

        debug!("Ticker for session {} finished", session_id);
    });

    cancel_tx
}
