use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::category::Category;

/// Lifecycle state of the session slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Idle,
    Recording,
    Finishing,
}

/// What observers see of the current session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: SessionState,

    /// Session identifier, also the id of the recording it will produce
    pub session_id: Option<Uuid>,

    pub category: Option<Category>,

    /// When recording started
    pub started_at: Option<DateTime<Utc>>,

    /// Ticks elapsed since start
    pub elapsed_seconds: u32,

    /// Configured ceiling
    pub max_duration_secs: u32,

    /// Where the artifact is being written
    pub target_file: Option<PathBuf>,

    /// Why audio stopped reaching the artifact, if it did; surfaced again
    /// as the commit error on stop
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capture_error: Option<String>,
}

impl SessionSnapshot {
    pub fn idle(max_duration_secs: u32) -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            category: None,
            started_at: None,
            elapsed_seconds: 0,
            max_duration_secs,
            target_file: None,
            capture_error: None,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    pub fn remaining_seconds(&self) -> u32 {
        self.max_duration_secs.saturating_sub(self.elapsed_seconds)
    }
}
