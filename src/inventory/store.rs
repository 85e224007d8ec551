use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::recording::Recording;
use crate::audio::AudioFile;
use crate::category::Category;
use crate::error::{DeleteFailure, DeleteStage, JournalError, Result};

const ARTIFACT_EXT: &str = "wav";
const METADATA_EXT: &str = "json";

/// Durable listing of committed recordings
///
/// Layout: `<root>/<category>/<id>.wav` plus a `<id>.json` metadata sidecar.
/// Listing re-scans the sidecars on every call, so it always reflects disk.
pub struct Inventory {
    root: PathBuf,
    /// One lock per category, indexed by `Category::index`
    locks: [Mutex<()>; 3],
}

impl Inventory {
    /// Open (and create if needed) an inventory rooted at `root`
    pub fn open(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for category in Category::ALL {
            let dir = root.join(category.slug());
            std::fs::create_dir_all(&dir).map_err(|e| JournalError::storage(&dir, e))?;
        }

        info!("Recording inventory at {}", root.display());

        Ok(Self {
            root,
            locks: [Mutex::new(()), Mutex::new(()), Mutex::new(())],
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn category_dir(&self, category: Category) -> PathBuf {
        self.root.join(category.slug())
    }

    /// Where a recording's audio lives
    pub fn artifact_path(&self, category: Category, id: Uuid) -> PathBuf {
        self.category_dir(category)
            .join(format!("{}.{}", id, ARTIFACT_EXT))
    }

    fn metadata_path(&self, category: Category, id: Uuid) -> PathBuf {
        self.category_dir(category)
            .join(format!("{}.{}", id, METADATA_EXT))
    }

    /// Load a sidecar, resolving its artifact inside this store
    ///
    /// The stored `file_path` is informational only; the artifact always
    /// lives next to its sidecar, so a relocated root keeps working and a
    /// hand-edited path can never point a delete outside the root.
    async fn read_recording(&self, category: Category, path: &Path) -> Result<Recording> {
        let mut recording = read_metadata(path).await?;
        let artifact = self.artifact_path(category, recording.id);
        if recording.file_path != artifact || recording.category != category {
            debug!(
                "Sidecar {} points at {}, using {}",
                path.display(),
                recording.file_path.display(),
                artifact.display()
            );
        }
        recording.category = category;
        recording.file_path = artifact;
        Ok(recording)
    }

    fn lock(&self, category: Category) -> &Mutex<()> {
        &self.locks[category.index()]
    }

    /// All recordings for `category`, oldest first
    pub async fn list(&self, category: Category) -> Result<Vec<Recording>> {
        let dir = self.category_dir(category);
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(JournalError::storage(&dir, e)),
        };

        let mut recordings = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| JournalError::storage(&dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(METADATA_EXT) {
                continue;
            }

            match self.read_recording(category, &path).await {
                Ok(recording) => {
                    if !recording.artifact_exists() {
                        warn!(
                            "Recording {} is missing its artifact at {}",
                            recording.id,
                            recording.file_path.display()
                        );
                    }
                    recordings.push(recording);
                }
                Err(e) => warn!("Skipping unreadable metadata: {}", e),
            }
        }

        recordings.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(recordings)
    }

    pub async fn count(&self, category: Category) -> Result<usize> {
        Ok(self.list(category).await?.len())
    }

    /// Look up a recording in any category
    pub async fn get(&self, id: Uuid) -> Result<Recording> {
        for category in Category::ALL {
            let path = self.metadata_path(category, id);
            if tokio::fs::try_exists(&path)
                .await
                .map_err(|e| JournalError::storage(&path, e))?
            {
                return self.read_recording(category, &path).await;
            }
        }
        Err(JournalError::NotFound { id })
    }

    /// Playback handle for a recording's audio
    pub async fn open_audio(&self, id: Uuid) -> Result<AudioFile> {
        let recording = self.get(id).await?;
        let path = recording.file_path.clone();

        tokio::task::spawn_blocking(move || AudioFile::open(&path))
            .await
            .map_err(|e| JournalError::storage(&recording.file_path, io::Error::other(e)))?
            .map_err(|e| {
                JournalError::storage(
                    &recording.file_path,
                    io::Error::new(io::ErrorKind::InvalidData, format!("{:#}", e)),
                )
            })
    }

    /// Register a freshly committed recording
    pub async fn ingest(&self, recording: &Recording) -> Result<()> {
        let _guard = self.lock(recording.category).lock().await;

        for category in Category::ALL {
            let existing = self.metadata_path(category, recording.id);
            if tokio::fs::try_exists(&existing)
                .await
                .map_err(|e| JournalError::storage(&existing, e))?
            {
                return Err(JournalError::DuplicateId { id: recording.id });
            }
        }

        let path = self.metadata_path(recording.category, recording.id);
        let tmp = path.with_extension(format!("{}.tmp", METADATA_EXT));
        let payload = serde_json::to_vec_pretty(recording).map_err(|e| JournalError::Metadata {
            path: path.clone(),
            source: e,
        })?;

        tokio::fs::write(&tmp, payload)
            .await
            .map_err(|e| JournalError::storage(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| JournalError::storage(&path, e))?;

        info!(
            "Ingested {} recording {} ({}s)",
            recording.category, recording.id, recording.duration_seconds
        );
        Ok(())
    }

    /// Remove a recording's metadata and artifact
    pub async fn delete(&self, id: Uuid) -> Result<Recording> {
        let recording = self.get(id).await?;
        let _guard = self.lock(recording.category).lock().await;

        // Another caller may have won the race for the lock
        let metadata = self.metadata_path(recording.category, id);
        if !tokio::fs::try_exists(&metadata)
            .await
            .map_err(|e| JournalError::storage(&metadata, e))?
        {
            return Err(JournalError::NotFound { id });
        }

        self.remove(&recording)
            .await
            .map_err(|failure| JournalError::PartialDeleteFailure {
                category: recording.category,
                removed: 0,
                failures: vec![failure],
            })?;

        info!("Deleted {} recording {}", recording.category, id);
        Ok(recording)
    }

    /// Delete every recording in `category`, returning how many were removed
    pub async fn clear(&self, category: Category) -> Result<usize> {
        let _guard = self.lock(category).lock().await;
        let recordings = self.list(category).await?;

        let mut removed = 0;
        let mut failures = Vec::new();
        for recording in &recordings {
            match self.remove(recording).await {
                Ok(()) => removed += 1,
                Err(failure) => {
                    warn!("Failed to delete {}", failure);
                    failures.push(failure);
                }
            }
        }

        if !failures.is_empty() {
            return Err(JournalError::PartialDeleteFailure {
                category,
                removed,
                failures,
            });
        }

        info!("Cleared {} recordings from {}", removed, category);
        Ok(removed)
    }

    /// Artifact first, then metadata, so a failure never leaves a listed
    /// recording that points at nothing without being reported
    async fn remove(&self, recording: &Recording) -> std::result::Result<(), DeleteFailure> {
        let artifact = self.artifact_path(recording.category, recording.id);
        match tokio::fs::remove_file(&artifact).await {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!("Artifact for {} already gone: {}", recording.id, artifact.display());
            }
            Err(e) => {
                return Err(DeleteFailure {
                    id: recording.id,
                    path: artifact,
                    stage: DeleteStage::Artifact,
                    reason: e.to_string(),
                });
            }
        }

        let metadata = self.metadata_path(recording.category, recording.id);
        match tokio::fs::remove_file(&metadata).await {
            Ok(()) => {
                debug!("Removed {}", metadata.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(DeleteFailure {
                id: recording.id,
                path: metadata,
                stage: DeleteStage::Metadata,
                reason: e.to_string(),
            }),
        }
    }
}

async fn read_metadata(path: &Path) -> Result<Recording> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| JournalError::storage(path, e))?;
    serde_json::from_slice(&bytes).map_err(|e| JournalError::Metadata {
        path: path.to_path_buf(),
        source: e,
    })
}
