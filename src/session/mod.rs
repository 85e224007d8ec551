//! Recording session management
//!
//! This module provides the `SessionManager` that owns the single in-progress
//! recording:
//! - Microphone permission check before a session is allocated
//! - Audio capture into a uniquely named WAV artifact
//! - One-second ticks with a hard duration ceiling
//! - Commit to the inventory, then best-effort upload

mod config;
mod manager;
mod snapshot;

pub use config::{SessionConfig, DEFAULT_MAX_DURATION_SECS};
pub use manager::{SessionManager, SessionManagerBuilder};
pub use snapshot::{SessionSnapshot, SessionState};
