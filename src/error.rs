use std::path::PathBuf;

use uuid::Uuid;

use crate::category::Category;

/// Which half of a recording could not be removed
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeleteStage {
    /// The `.wav` artifact
    Artifact,
    /// The JSON metadata sidecar
    Metadata,
}

/// One recording that could not be fully deleted
#[derive(Debug, Clone, serde::Serialize)]
pub struct DeleteFailure {
    pub id: Uuid,
    pub path: PathBuf,
    pub stage: DeleteStage,
    pub reason: String,
}

impl std::fmt::Display for DeleteFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let stage = match self.stage {
            DeleteStage::Artifact => "artifact",
            DeleteStage::Metadata => "metadata",
        };
        write!(f, "{} ({} at {}): {}", self.id, stage, self.path.display(), self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("a recording session is already active (requested category: {category})")]
    AlreadyRecording { category: Category },

    #[error("microphone access denied (requested category: {category})")]
    PermissionDenied { category: Category },

    #[error("audio capture for {category} could not start: {reason}")]
    Capture { category: Category, reason: String },

    #[error("failed to write audio artifact {}: {reason}", path.display())]
    ArtifactWriteFailure { path: PathBuf, reason: String },

    #[error("recording {id} not found")]
    NotFound { id: Uuid },

    #[error("recording {id} already exists")]
    DuplicateId { id: Uuid },

    #[error(
        "partial delete in {category}: {removed} removed, {} failed: {}",
        failures.len(),
        failures.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ")
    )]
    PartialDeleteFailure {
        category: Category,
        removed: usize,
        failures: Vec<DeleteFailure>,
    },

    #[error("upload of {key} failed: {reason}")]
    UploadFailure { key: String, reason: String },

    #[error("storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid recording metadata at {}: {source}", path.display())]
    Metadata {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl JournalError {
    pub(crate) fn storage(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Storage {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ArtifactWriteFailure {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, JournalError>;
