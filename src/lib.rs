pub mod access;
pub mod audio;
pub mod category;
pub mod config;
pub mod error;
pub mod http;
pub mod inventory;
pub mod nats;
pub mod session;
pub mod upload;

pub use access::{IdentityProvider, PermissionCheck, StaticIdentity, StaticPermission};
pub use audio::{
    ArtifactSummary, ArtifactWriter, AudioBackend, AudioBackendConfig, AudioBackendFactory,
    AudioFile, AudioFrame, AudioSource,
};
pub use category::Category;
pub use config::Config;
pub use error::{DeleteFailure, DeleteStage, JournalError, Result};
pub use http::{create_router, AppState};
pub use inventory::{Inventory, Recording};
pub use nats::{NatsUploader, UploadChunk, UploadReply, UploadRequest};
pub use session::{SessionConfig, SessionManager, SessionSnapshot, SessionState};
pub use upload::{NoopUploader, Uploader};
