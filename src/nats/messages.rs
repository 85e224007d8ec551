use serde::{Deserialize, Serialize};

/// Upload request sent to the storage service once every chunk is out
///
/// The artifact itself travels as `chunks` [`UploadChunk`] messages on the
/// `<subject>.chunk` subject, published ahead of this request.
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadRequest {
    pub remote_key: String,
    pub recording_id: String,
    pub category: String,
    pub content_type: String,
    pub size_bytes: u64,
    pub chunks: u32,
    pub created_at: String,  // RFC3339 timestamp
    pub duration_seconds: u32,
}

/// One slice of an artifact, sized to fit the server's max payload
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadChunk {
    pub recording_id: String,
    pub seq: u32,
    pub total: u32,
    pub bytes: String,  // Base64-encoded slice of the WAV file
}

/// Reply from the storage service: a URL on success, an error otherwise
#[derive(Debug, Serialize, Deserialize)]
pub struct UploadReply {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
