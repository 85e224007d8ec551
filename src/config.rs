use anyhow::{bail, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::{AudioBackendConfig, AudioSource};
use crate::session::SessionConfig;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub audio: AudioConfig,
    pub session: SessionSettings,
    pub permissions: PermissionsConfig,
    pub upload: UploadConfig,
    #[serde(default)]
    pub identity: IdentityConfig,
}

#[derive(Debug, Deserialize)]
pub struct ServiceConfig {
    pub name: String,
    pub http: HttpConfig,
}

#[derive(Debug, Deserialize)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    pub recordings_path: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    /// Capture format; artifacts are always written as 44.1 kHz stereo
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_duration_ms: u64,
    /// "synthetic" or "file"
    pub source: String,
    /// WAV to replay when `source = "file"`
    #[serde(default)]
    pub file: Option<String>,
    pub tone_hz: f32,
    pub amplitude: f32,
}

#[derive(Debug, Deserialize)]
pub struct SessionSettings {
    pub max_duration_secs: u32,
    pub tick_interval_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct PermissionsConfig {
    pub microphone: bool,
}

#[derive(Debug, Deserialize)]
pub struct UploadConfig {
    pub enabled: bool,
    pub nats_url: String,
    pub subject: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdentityConfig {
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Config {
    /// Defaults, then the optional file at `path`, then `JOURNAL_*` env vars
    /// (`JOURNAL_SESSION__MAX_DURATION_SECS=120`)
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("service.name", "journal-recorder")?
            .set_default("service.http.bind", "127.0.0.1")?
            .set_default("service.http.port", 7878_i64)?
            .set_default("storage.recordings_path", "~/.journal/recordings")?
            .set_default("audio.sample_rate", 44100_i64)?
            .set_default("audio.channels", 2_i64)?
            .set_default("audio.buffer_duration_ms", 100_i64)?
            .set_default("audio.source", "synthetic")?
            .set_default("audio.tone_hz", 440.0)?
            .set_default("audio.amplitude", 0.2)?
            .set_default("session.max_duration_secs", 240_i64)?
            .set_default("session.tick_interval_ms", 1000_i64)?
            .set_default("permissions.microphone", true)?
            .set_default("upload.enabled", false)?
            .set_default("upload.nats_url", "nats://localhost:4222")?
            .set_default("upload.subject", "journal.upload")?
            .set_default("upload.timeout_secs", 30_i64)?
            .add_source(config::File::with_name(path).required(false))
            .add_source(
                config::Environment::with_prefix("JOURNAL")
                    .prefix_separator("_")
                    .separator("__"),
            )
            .build()?;

        let cfg: Self = settings.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.session.max_duration_secs == 0 {
            bail!("session.max_duration_secs must be at least 1");
        }
        if self.session.tick_interval_ms == 0 {
            bail!("session.tick_interval_ms must be at least 1");
        }
        if !matches!(self.audio.channels, 1 | 2) {
            bail!("audio.channels must be 1 or 2, got {}", self.audio.channels);
        }
        if self.audio.sample_rate == 0 {
            bail!("audio.sample_rate must be positive");
        }
        if self.audio.source == "file" && self.audio.file.is_none() {
            bail!("audio.file is required when audio.source = \"file\"");
        }
        Ok(())
    }

    /// Storage root with `~` expanded
    pub fn recordings_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.storage.recordings_path).into_owned())
    }

    pub fn audio_source(&self) -> Result<AudioSource> {
        match self.audio.source.as_str() {
            "synthetic" => Ok(AudioSource::Synthetic {
                tone_hz: self.audio.tone_hz,
                amplitude: self.audio.amplitude,
            }),
            "file" => match &self.audio.file {
                Some(file) => Ok(AudioSource::File(PathBuf::from(
                    shellexpand::tilde(file).into_owned(),
                ))),
                None => bail!("audio.file is required when audio.source = \"file\""),
            },
            other => bail!("Unknown audio source '{}' (expected synthetic or file)", other),
        }
    }

    pub fn session_config(&self) -> Result<SessionConfig> {
        Ok(SessionConfig {
            max_duration_secs: self.session.max_duration_secs,
            tick_interval: Some(Duration::from_millis(self.session.tick_interval_ms)),
            audio: AudioBackendConfig {
                target_sample_rate: self.audio.sample_rate,
                target_channels: self.audio.channels,
                buffer_duration_ms: self.audio.buffer_duration_ms,
            },
            source: self.audio_source()?,
        })
    }
}
