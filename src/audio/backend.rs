use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

use super::replay::ReplayBackend;
use super::synthetic::SyntheticBackend;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Number of sample frames (samples per channel)
    pub fn frame_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Capture format requested from the backend
///
/// The artifact format is fixed; see [`super::writer::ARTIFACT_SAMPLE_RATE`].
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Capture sample rate
    pub target_sample_rate: u32,
    /// Capture channel count (1 = mono, 2 = stereo)
    pub target_channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 44100, // CD-quality linear PCM
            target_channels: 2,        // Stereo
            buffer_duration_ms: 100,   // 100ms buffers
        }
    }
}

/// Audio capture backend trait
///
/// Implementations available in this crate:
/// - Synthetic: generated tone or silence (demo mode, tests)
/// - Replay: stream an existing WAV file in real time
///
/// Platform microphone capture plugs in through the same trait.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The channel
    /// closes once the backend is stopped or runs out of input.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend for the given source
    pub fn create(
        source: &AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Synthetic { tone_hz, amplitude } => {
                Ok(Box::new(SyntheticBackend::new(config, *tone_hz, *amplitude)))
            }
            AudioSource::File(path) => Ok(Box::new(ReplayBackend::new(config, path.clone())?)),
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Generated sine tone; zero amplitude yields silence
    Synthetic { tone_hz: f32, amplitude: f32 },
    /// Replay an existing WAV file
    File(PathBuf),
}

impl AudioSource {
    pub fn silence() -> Self {
        AudioSource::Synthetic {
            tone_hz: 0.0,
            amplitude: 0.0,
        }
    }
}

impl Default for AudioSource {
    fn default() -> Self {
        AudioSource::Synthetic {
            tone_hz: 440.0,
            amplitude: 0.2,
        }
    }
}
