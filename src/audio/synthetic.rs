// Generated audio for demo mode and tests

use anyhow::{bail, Result};
use std::f32::consts::TAU;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

/// Produces a sine tone at the configured format in real time
pub struct SyntheticBackend {
    config: AudioBackendConfig,
    tone_hz: f32,
    amplitude: f32,
    producer: Option<JoinHandle<()>>,
}

impl SyntheticBackend {
    pub fn new(config: AudioBackendConfig, tone_hz: f32, amplitude: f32) -> Self {
        Self {
            config,
            tone_hz,
            amplitude: amplitude.clamp(0.0, 1.0),
            producer: None,
        }
    }
}

/// Render `frames` sample frames of a sine starting at absolute frame `offset`
pub(crate) fn render_tone(
    tone_hz: f32,
    amplitude: f32,
    sample_rate: u32,
    channels: u16,
    offset: u64,
    frames: usize,
) -> Vec<i16> {
    let mut samples = Vec::with_capacity(frames * channels as usize);
    for i in 0..frames as u64 {
        let t = (offset + i) as f32 / sample_rate as f32;
        let value = (TAU * tone_hz * t).sin() * amplitude * i16::MAX as f32;
        let sample = value as i16;
        for _ in 0..channels {
            samples.push(sample);
        }
    }
    samples
}

#[async_trait::async_trait]
impl AudioBackend for SyntheticBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.producer.is_some() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(64);
        let sample_rate = self.config.target_sample_rate;
        let channels = self.config.target_channels;
        let buffer_ms = self.config.buffer_duration_ms.max(1);
        let frames_per_buffer = (sample_rate as u64 * buffer_ms / 1000) as usize;
        let (tone_hz, amplitude) = (self.tone_hz, self.amplitude);

        info!(
            "Synthetic backend started ({}Hz, {} channels, {:.0}Hz tone)",
            sample_rate, channels, tone_hz
        );

        self.producer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(buffer_ms));
            let mut offset: u64 = 0;

            loop {
                interval.tick().await;
                let frame = AudioFrame {
                    samples: render_tone(
                        tone_hz,
                        amplitude,
                        sample_rate,
                        channels,
                        offset,
                        frames_per_buffer,
                    ),
                    sample_rate,
                    channels,
                    timestamp_ms: offset * 1000 / sample_rate as u64,
                };
                offset += frames_per_buffer as u64;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(producer) = self.producer.take() {
            producer.abort();
            let _ = producer.await;
            info!("Synthetic backend stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.producer.as_ref().is_some_and(|p| !p.is_finished())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}
