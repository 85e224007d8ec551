use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::backend::AudioFrame;
use crate::error::{JournalError, Result};

/// Every artifact is CD-quality stereo, whatever the capture format
pub const ARTIFACT_SAMPLE_RATE: u32 = 44100;
pub const ARTIFACT_CHANNELS: u16 = 2;

/// What a finalized artifact contains
#[derive(Debug, Clone)]
pub struct ArtifactSummary {
    pub path: PathBuf,
    pub sample_rate: u32,
    pub channels: u16,
    /// Total interleaved samples written
    pub sample_count: usize,
}

impl ArtifactSummary {
    /// Length of captured audio, independent of the session tick counter
    pub fn audio_seconds(&self) -> f64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0.0;
        }
        self.sample_count as f64 / (self.sample_rate as f64 * self.channels as f64)
    }
}

/// Writes one session's audio to disk as a 44.1 kHz stereo linear PCM WAV
///
/// Incoming frames are converted to the artifact's format: mono is
/// duplicated to both channels and the sample rate is mapped with
/// nearest-neighbour resampling.
pub struct ArtifactWriter {
    writer: Option<hound::WavWriter<BufWriter<File>>>,
    summary: ArtifactSummary,
}

impl ArtifactWriter {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let spec = hound::WavSpec {
            channels: ARTIFACT_CHANNELS,
            sample_rate: ARTIFACT_SAMPLE_RATE,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| JournalError::storage(parent, e))?;
        }

        let writer =
            hound::WavWriter::create(&path, spec).map_err(|e| JournalError::artifact(&path, e))?;

        debug!("Artifact opened: {}", path.display());

        Ok(Self {
            writer: Some(writer),
            summary: ArtifactSummary {
                path,
                sample_rate: spec.sample_rate,
                channels: spec.channels,
                sample_count: 0,
            },
        })
    }

    pub fn write_frame(&mut self, frame: &AudioFrame) -> Result<()> {
        let converted = convert_frame(frame, self.summary.sample_rate, self.summary.channels)
            .ok_or_else(|| {
                JournalError::artifact(
                    &self.summary.path,
                    format!("unsupported channel layout: {} channels", frame.channels),
                )
            })?;

        if let Some(writer) = &mut self.writer {
            for &sample in &converted {
                writer
                    .write_sample(sample)
                    .map_err(|e| JournalError::artifact(&self.summary.path, e))?;
            }
            self.summary.sample_count += converted.len();
        }

        Ok(())
    }

    /// Finalize the WAV header and flush to disk
    pub fn finish(mut self) -> Result<ArtifactSummary> {
        if let Some(writer) = self.writer.take() {
            writer
                .finalize()
                .map_err(|e| JournalError::artifact(&self.summary.path, e))?;
        }

        Ok(self.summary.clone())
    }
}

impl Drop for ArtifactWriter {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            if let Err(e) = writer.finalize() {
                warn!("Failed to finalize WAV writer on drop: {}", e);
            }
        }
    }
}

/// Convert a frame to the target layout; `None` for layouts we cannot map
fn convert_frame(frame: &AudioFrame, target_rate: u32, target_channels: u16) -> Option<Vec<i16>> {
    let remixed = remix(&frame.samples, frame.channels, target_channels)?;
    Some(resample_nearest(
        &remixed,
        target_channels,
        frame.sample_rate,
        target_rate,
    ))
}

fn remix(samples: &[i16], from: u16, to: u16) -> Option<Vec<i16>> {
    match (from, to) {
        (a, b) if a == b => Some(samples.to_vec()),
        (1, 2) => Some(samples.iter().flat_map(|&s| [s, s]).collect()),
        (2, 1) => Some(
            samples
                .chunks_exact(2)
                .map(|pair| ((pair[0] as i32 + pair[1] as i32) / 2) as i16)
                .collect(),
        ),
        _ => None,
    }
}

fn resample_nearest(samples: &[i16], channels: u16, from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || from_rate == 0 || channels == 0 {
        return samples.to_vec();
    }

    let channels = channels as usize;
    let in_frames = samples.len() / channels;
    let out_frames = (in_frames as u64 * to_rate as u64 / from_rate as u64) as usize;
    let mut out = Vec::with_capacity(out_frames * channels);

    for i in 0..out_frames {
        let src = ((i as u64 * from_rate as u64) / to_rate as u64) as usize;
        let src = src.min(in_frames.saturating_sub(1));
        out.extend_from_slice(&samples[src * channels..(src + 1) * channels]);
    }

    out
}
