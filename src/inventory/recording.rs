use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::category::Category;

/// A committed journal recording
///
/// Never mutated once ingested; corrections are delete-and-recreate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    /// Unique recording identifier (also the artifact file stem)
    pub id: Uuid,

    /// Prompt the recording answers
    pub category: Category,

    /// Location of the `.wav` artifact
    pub file_path: PathBuf,

    /// When capture completed
    pub created_at: DateTime<Utc>,

    /// Elapsed session ticks at stop time
    pub duration_seconds: u32,
}

impl Recording {
    pub fn artifact_exists(&self) -> bool {
        self.file_path.is_file()
    }

    /// `mm:ss` label for list rows
    pub fn duration_label(&self) -> String {
        format!("{}:{:02}", self.duration_seconds / 60, self.duration_seconds % 60)
    }
}
