//! Best-effort upload of committed recordings to the remote store

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::access::IdentityProvider;
use crate::error::Result;
use crate::inventory::Recording;

/// Remote storage collaborator
///
/// Uploads the artifact bytes under `remote_key` and resolves to a fetchable
/// URL. Callers only log failures; no retry contract is defined here.
#[async_trait::async_trait]
pub trait Uploader: Send + Sync {
    async fn upload(&self, recording: &Recording, remote_key: &str) -> Result<String>;

    /// Get uploader name for logging
    fn name(&self) -> &str;
}

/// Local-only persistence
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopUploader;

#[async_trait::async_trait]
impl Uploader for NoopUploader {
    async fn upload(&self, recording: &Recording, _remote_key: &str) -> Result<String> {
        Ok(format!("file://{}", recording.file_path.display()))
    }

    fn name(&self) -> &str {
        "local-only"
    }
}

/// Remote key for a recording owned by `user`
pub fn remote_key(user: &str, recording: &Recording) -> String {
    format!("{}/{}/{}.wav", user, recording.category, recording.id)
}

/// Hand a committed recording to the uploader without waiting for it
///
/// Returns `None` when nobody is signed in; the recording stays local-only.
pub fn spawn_upload(
    uploader: Arc<dyn Uploader>,
    identity: &dyn IdentityProvider,
    recording: Recording,
) -> Option<JoinHandle<Option<String>>> {
    let Some(user) = identity.current_user() else {
        info!("No signed-in user, keeping {} local-only", recording.id);
        return None;
    };

    let key = remote_key(&user, &recording);
    Some(tokio::spawn(async move {
        match uploader.upload(&recording, &key).await {
            Ok(url) => {
                info!("Uploaded {} via {} to {}", recording.id, uploader.name(), url);
                Some(url)
            }
            Err(e) => {
                warn!("Upload of {} via {} failed: {}", recording.id, uploader.name(), e);
                None
            }
        }
    }))
}
