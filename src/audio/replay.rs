// Streams an existing WAV file as if it were being captured live

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use super::file::AudioFile;

pub struct ReplayBackend {
    config: AudioBackendConfig,
    path: PathBuf,
    producer: Option<JoinHandle<()>>,
}

impl ReplayBackend {
    pub fn new(config: AudioBackendConfig, path: PathBuf) -> Result<Self> {
        if !path.exists() {
            bail!("Replay source not found: {}", path.display());
        }
        Ok(Self {
            config,
            path,
            producer: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for ReplayBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.producer.is_some() {
            bail!("Already capturing");
        }

        let audio = AudioFile::open(&self.path)?;
        let buffer_ms = self.config.buffer_duration_ms.max(1);
        let frames_per_buffer = (audio.sample_rate as u64 * buffer_ms / 1000).max(1) as usize;
        let chunk_len = frames_per_buffer * audio.channels.max(1) as usize;

        info!(
            "Replaying {} ({:.1}s, {}Hz, {} channels)",
            audio.path, audio.duration_seconds, audio.sample_rate, audio.channels
        );

        let (tx, rx) = mpsc::channel(64);
        self.producer = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_millis(buffer_ms));

            for (index, chunk) in audio.samples.chunks(chunk_len).enumerate() {
                interval.tick().await;
                let frame = AudioFrame {
                    samples: chunk.to_vec(),
                    sample_rate: audio.sample_rate,
                    channels: audio.channels,
                    timestamp_ms: index as u64 * buffer_ms,
                };
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
            info!("Replay of {} stopped", self.path.display());
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.producer.as_ref().is_some_and(|p| !p.is_finished())
    }

    fn name(&self) -> &str {
        "replay"
    }
}
