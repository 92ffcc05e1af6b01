//! Error types for every layer of the client
//!
//! Each layer owns one `thiserror` enum. `PipelineError` is the only one that
//! reaches the user as a notification, so its `Display` text is the
//! user-facing message.

use thiserror::Error;

use crate::pipeline::Phase;
use crate::transcript::SegmentField;

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Rejections raised while selecting a media file
#[derive(Error, Debug, Clone, PartialEq)]
pub enum IntakeError {
    #[error("No file was provided")]
    NoFiles,

    #[error("Unsupported file type: {name} (accepted: {accepted})")]
    UnsupportedType { name: String, accepted: String },

    #[error("File {name} is {size} bytes, limit is {limit} bytes")]
    TooLarge { name: String, size: u64, limit: u64 },

    #[error("Could not read {path}: {reason}")]
    Unreadable { path: String, reason: String },
}

/// Unknown codes for the fixed language and format lists
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SelectionError {
    #[error("Unknown language code: {0}")]
    UnknownLanguage(String),

    #[error("Unknown subtitle format: {0}")]
    UnknownFormat(String),
}

/// Rejected segment edits
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("Segments can only be changed in edit mode")]
    NotEditing,

    #[error("Segment {index} does not exist (transcript has {len} segments)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Unknown segment field: {0} (expected start, end or text)")]
    UnknownField(String),

    #[error("{field} must be a finite number, got {value}")]
    NonFinite { field: SegmentField, value: f64 },

    #[error("{field} expects {expected}")]
    FieldMismatch {
        field: SegmentField,
        expected: &'static str,
    },

    #[error("Invalid value for {field}: {input}")]
    Unparseable { field: SegmentField, input: String },
}

/// Failures talking to the subtitle backend
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Backend returned {status}")]
    Rejected { status: u16, detail: Option<String> },

    #[error("Backend unreachable: {0}")]
    Unreachable(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Invalid backend URL: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Server supplied detail, if the backend rejected the request with one
    pub fn detail(&self) -> Option<&str> {
        match self {
            BackendError::Rejected { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

/// Failures of a pipeline run, one variant per user-visible outcome
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("Please select a file first!")]
    NoFileSelected,

    #[error("Failed to upload file: {}", .detail.as_deref().unwrap_or("Unknown error"))]
    UploadFailed { detail: Option<String> },

    #[error("Failed to generate subtitles: {}", .detail.as_deref().unwrap_or("Unknown error"))]
    GenerateFailed { detail: Option<String> },

    #[error("Failed to save edits. Please try again.")]
    SaveFailed { detail: Option<String> },

    #[error("Unexpected failure: {0}")]
    UnexpectedFailure(String),

    #[error("Failed to download {token}: {reason}")]
    DownloadFailed { token: String, reason: String },

    #[error("A pipeline run is already in progress")]
    Busy,

    #[error("Cannot {action} while the pipeline is {phase}")]
    InvalidTransition { action: &'static str, phase: Phase },
}

/// Configuration loading and validation failures
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid backend URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
