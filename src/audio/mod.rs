pub mod backend;
pub mod file;
pub mod replay;
pub mod synthetic;
pub mod writer;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use file::AudioFile;
pub use writer::{ArtifactSummary, ArtifactWriter, ARTIFACT_CHANNELS, ARTIFACT_SAMPLE_RATE};
