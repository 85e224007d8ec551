use std::time::Duration;

use crate::audio::{AudioBackendConfig, AudioSource};

/// Hard cap on a single journal entry
pub const DEFAULT_MAX_DURATION_SECS: u32 = 240;

/// Configuration for recording sessions
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Ceiling on elapsed ticks; reaching it stops the session
    pub max_duration_secs: u32,

    /// Period of the automatic ticker. `None` leaves ticking to the caller
    /// via `SessionManager::tick`.
    pub tick_interval: Option<Duration>,

    /// Artifact format (44.1kHz stereo by default)
    pub audio: AudioBackendConfig,

    /// Where captured audio comes from
    pub source: AudioSource,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_duration_secs: DEFAULT_MAX_DURATION_SECS,
            tick_interval: Some(Duration::from_secs(1)),
            audio: AudioBackendConfig::default(),
            source: AudioSource::default(),
        }
    }
}
