use anyhow::{Context, Result};
use hound::WavReader;
use std::path::Path;
use tracing::debug;

/// A recording loaded back from disk for playback
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .with_context(|| format!("Failed to open WAV file: {}", path.display()))?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        debug!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Peak absolute sample level in 0.0..=1.0, for a simple waveform badge
    pub fn peak_level(&self) -> f32 {
        self.samples
            .iter()
            .map(|&s| (s as i32).unsigned_abs())
            .max()
            .map(|peak| peak as f32 / i16::MAX as f32)
            .unwrap_or(0.0)
            .min(1.0)
    }
}
