pub mod client;
pub mod messages;

pub use client::NatsUploader;
pub use messages::{UploadChunk, UploadReply, UploadRequest};
