//! Media file selection and validation

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::IntakeConfig;
use crate::error::IntakeError;

/// Extensions accepted by default
pub const DEFAULT_EXTENSIONS: [&str; 8] = ["mp3", "wav", "m4a", "ogg", "mp4", "avi", "mov", "mkv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MediaKind {
    Audio,
    Video,
}

impl MediaKind {
    fn from_mime(mime: &str) -> Option<Self> {
        match mime.split('/').next()?.trim().to_ascii_lowercase().as_str() {
            "audio" => Some(MediaKind::Audio),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

/// MIME type implied by a known media extension
fn mime_for_extension(extension: &str) -> Option<&'static str> {
    match extension {
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "m4a" => Some("audio/mp4"),
        "ogg" => Some("audio/ogg"),
        "flac" => Some("audio/flac"),
        "mp4" => Some("video/mp4"),
        "avi" => Some("video/x-msvideo"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        "webm" => Some("video/webm"),
        _ => None,
    }
}

fn extension_of(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// The single user-selected file. Never mutated after selection.
#[derive(Debug, Clone)]
pub struct MediaFile {
    name: String,
    mime: String,
    kind: MediaKind,
    content: Arc<Vec<u8>>,
}

impl MediaFile {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn content(&self) -> &[u8] {
        &self.content
    }

    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }
}

/// A file offered for selection, before validation
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub mime: Option<String>,
    pub content: Vec<u8>,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: None,
            content,
        }
    }

    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

/// Holds at most one selected media file
#[derive(Debug, Clone)]
pub struct MediaIntake {
    allowed_extensions: Vec<String>,
    max_file_size: u64,
    selected: Option<MediaFile>,
}

impl MediaIntake {
    pub fn new(config: &IntakeConfig) -> Self {
        Self {
            allowed_extensions: config
                .allowed_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            max_file_size: config.max_file_size,
            selected: None,
        }
    }

    pub fn selected(&self) -> Option<&MediaFile> {
        self.selected.as_ref()
    }

    /// Comma separated list of accepted extensions
    pub fn accepted_label(&self) -> String {
        self.allowed_extensions.join(", ")
    }

    /// Check name and declared type, returning the MIME type and kind to use
    pub fn check(&self, name: &str, declared_mime: Option<&str>) -> Result<(String, MediaKind), IntakeError> {
        let unsupported = || IntakeError::UnsupportedType {
            name: name.to_string(),
            accepted: self.accepted_label(),
        };

        let extension = extension_of(name).ok_or_else(unsupported)?;
        if !self.allowed_extensions.contains(&extension) {
            return Err(unsupported());
        }

        let mime = match declared_mime {
            Some(mime) => mime.trim().to_string(),
            None => mime_for_extension(&extension).ok_or_else(unsupported)?.to_string(),
        };
        let kind = MediaKind::from_mime(&mime).ok_or_else(unsupported)?;

        Ok((mime, kind))
    }

    fn check_size(&self, name: &str, size: u64) -> Result<(), IntakeError> {
        if self.max_file_size > 0 && size > self.max_file_size {
            return Err(IntakeError::TooLarge {
                name: name.to_string(),
                size,
                limit: self.max_file_size,
            });
        }
        Ok(())
    }

    /// Select the first candidate, ignoring the rest.
    ///
    /// On rejection the previous selection is kept.
    pub fn select_file(&mut self, candidates: Vec<FileCandidate>) -> Result<&MediaFile, IntakeError> {
        let total = candidates.len();
        let candidate = candidates.into_iter().next().ok_or(IntakeError::NoFiles)?;
        if total > 1 {
            debug!("Ignoring {} extra file(s), only {} is used", total - 1, candidate.name);
        }

        let (mime, kind) = self.check(&candidate.name, candidate.mime.as_deref())?;
        self.check_size(&candidate.name, candidate.content.len() as u64)?;

        Ok(self.replace(MediaFile {
            name: candidate.name,
            mime,
            kind,
            content: Arc::new(candidate.content),
        }))
    }

    /// Select the first path, validating before reading its content
    pub async fn select_path(&mut self, paths: &[PathBuf]) -> Result<&MediaFile, IntakeError> {
        let path = paths.first().ok_or(IntakeError::NoFiles)?;
        if paths.len() > 1 {
            debug!("Ignoring {} extra path(s)", paths.len() - 1);
        }

        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| IntakeError::UnsupportedType {
                name: path.display().to_string(),
                accepted: self.accepted_label(),
            })?
            .to_string();

        let (mime, kind) = self.check(&name, None)?;

        let unreadable = |e: std::io::Error| IntakeError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        let metadata = tokio::fs::metadata(path).await.map_err(unreadable)?;
        self.check_size(&name, metadata.len())?;
        let content = tokio::fs::read(path).await.map_err(unreadable)?;

        Ok(self.replace(MediaFile {
            name,
            mime,
            kind,
            content: Arc::new(content),
        }))
    }

    fn replace(&mut self, file: MediaFile) -> &MediaFile {
        if let Some(previous) = &self.selected {
            warn!("Replacing selected file {} with {}", previous.name, file.name);
        }
        info!("📁 Selected {} ({}, {:.1} MB)", file.name, file.mime, file.size() as f64 / 1_000_000.0);
        self.selected.insert(file)
    }
}
