//! Subtitle backend collaborator
//!
//! The backend transcribes, translates and encodes subtitle files. The client
//! only sees the four request/response operations of [`SubtitleBackend`].

pub mod http;
pub mod models;

use async_trait::async_trait;

use crate::config::BackendConfig;
use crate::error::BackendError;
use crate::intake::MediaFile;
use crate::selection::UserSelection;

pub use http::HttpBackend;
pub use models::{GeneratedSubtitles, SaveRequest};

/// Trait for subtitle backends
#[async_trait]
pub trait SubtitleBackend: Send + Sync {
    /// Upload the media file, returning the server-assigned filename token
    async fn upload(&self, file: &MediaFile) -> Result<String, BackendError>;

    /// Generate subtitles for an uploaded file
    async fn generate(&self, upload_token: &str, selection: &UserSelection) -> Result<GeneratedSubtitles, BackendError>;

    /// Re-encode an edited transcript, returning the new output token
    async fn save_edits(&self, request: &SaveRequest) -> Result<String, BackendError>;

    /// Fetch the encoded subtitle file for an output token
    async fn download(&self, subtitle_file: &str) -> Result<Vec<u8>, BackendError>;

    /// Where requests are sent, for display
    fn origin(&self) -> &str;
}

/// Create the HTTP backend from configuration
pub fn create_backend(config: &BackendConfig) -> Result<Box<dyn SubtitleBackend>, BackendError> {
    Ok(Box::new(HttpBackend::new(config.clone())?))
}
