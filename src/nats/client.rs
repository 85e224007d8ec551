use anyhow::{Context, Result};
use async_nats::Client;
use base64::Engine;
use std::time::Duration;
use tracing::{debug, info};

use super::messages::{UploadChunk, UploadReply, UploadRequest};
use crate::error::JournalError;
use crate::inventory::Recording;
use crate::upload::Uploader;

/// nats-server default, used until the server has announced its own
pub const DEFAULT_MAX_PAYLOAD: usize = 1024 * 1024;

/// Headroom for the JSON fields around each chunk's base64 body
const CHUNK_ENVELOPE_BYTES: usize = 512;

/// Uploads recordings to a storage service over NATS request/reply
pub struct NatsUploader {
    client: Client,
    subject_prefix: String,
    timeout: Duration,
}

impl NatsUploader {
    /// Connect to NATS server
    pub async fn connect(url: &str, subject_prefix: String, timeout: Duration) -> Result<Self> {
        info!("Connecting to NATS at {}", url);

        let client = async_nats::connect(url)
            .await
            .context("Failed to connect to NATS")?;

        info!("Connected to NATS successfully");

        Ok(Self {
            client,
            subject_prefix,
            timeout,
        })
    }

    /// Subject a recording's upload is requested on
    pub fn subject_for(&self, recording: &Recording) -> String {
        format!("{}.{}", self.subject_prefix, recording.category)
    }

    async fn request(&self, recording: &Recording, remote_key: &str) -> Result<String> {
        let bytes = tokio::fs::read(&recording.file_path)
            .await
            .with_context(|| format!("Failed to read {}", recording.file_path.display()))?;

        let subject = self.subject_for(recording);
        let chunk_subject = format!("{}.chunk", subject);
        let max_payload = match self.client.server_info().max_payload {
            0 => DEFAULT_MAX_PAYLOAD,
            n => n,
        };
        let chunks = build_chunks(recording, &bytes, max_payload);

        debug!(
            "Requesting upload on {} (key={}, bytes={}, chunks={})",
            subject,
            remote_key,
            bytes.len(),
            chunks.len()
        );

        tokio::time::timeout(self.timeout, async {
            for chunk in &chunks {
                let payload = serde_json::to_vec(chunk)?;
                self.client
                    .publish(chunk_subject.clone(), payload.into())
                    .await
                    .with_context(|| format!("Failed to publish chunk {} of {}", chunk.seq, chunk.total))?;
            }
            self.client.flush().await.context("Failed to flush upload chunks")?;
            Ok::<_, anyhow::Error>(())
        })
        .await
        .with_context(|| format!("Sending chunks on {} timed out", chunk_subject))??;

        let message = build_request(recording, remote_key, bytes.len() as u64, chunks.len() as u32);
        let payload = serde_json::to_vec(&message)?;

        let reply = tokio::time::timeout(
            self.timeout,
            self.client.request(subject.clone(), payload.into()),
        )
        .await
        .with_context(|| format!("Upload request on {} timed out", subject))?
        .context("Upload request failed")?;

        let reply: UploadReply =
            serde_json::from_slice(&reply.payload).context("Malformed upload reply")?;
        parse_reply(reply)
    }
}

/// Raw artifact bytes carried per chunk so the JSON message stays within
/// `max_payload` after base64 expansion
pub fn chunk_size_for(max_payload: usize) -> usize {
    let budget = max_payload.saturating_sub(CHUNK_ENVELOPE_BYTES);
    (budget / 4 * 3).max(3)
}

/// Split an artifact into ordered chunk messages
pub fn build_chunks(recording: &Recording, bytes: &[u8], max_payload: usize) -> Vec<UploadChunk> {
    let engine = base64::engine::general_purpose::STANDARD;
    let slices: Vec<&[u8]> = bytes.chunks(chunk_size_for(max_payload)).collect();
    let total = slices.len() as u32;

    slices
        .into_iter()
        .enumerate()
        .map(|(seq, slice)| UploadChunk {
            recording_id: recording.id.to_string(),
            seq: seq as u32,
            total,
            bytes: engine.encode(slice),
        })
        .collect()
}

pub fn build_request(
    recording: &Recording,
    remote_key: &str,
    size_bytes: u64,
    chunks: u32,
) -> UploadRequest {
    UploadRequest {
        remote_key: remote_key.to_string(),
        recording_id: recording.id.to_string(),
        category: recording.category.to_string(),
        content_type: "audio/wav".to_string(),
        size_bytes,
        chunks,
        created_at: recording.created_at.to_rfc3339(),
        duration_seconds: recording.duration_seconds,
    }
}

pub fn parse_reply(reply: UploadReply) -> Result<String> {
    match (reply.url, reply.error) {
        (_, Some(error)) => anyhow::bail!("Storage service rejected upload: {}", error),
        (Some(url), None) => Ok(url),
        (None, None) => anyhow::bail!("Storage service replied without a URL"),
    }
}

#[async_trait::async_trait]
impl Uploader for NatsUploader {
    async fn upload(&self, recording: &Recording, remote_key: &str) -> crate::error::Result<String> {
        self.request(recording, remote_key)
            .await
            .map_err(|e| JournalError::UploadFailure {
                key: remote_key.to_string(),
                reason: format!("{:#}", e),
            })
    }

    fn name(&self) -> &str {
        "nats"
    }
}
