/// Subtitle Client
///
/// Client side of a subtitle generation service: pick a media file, choose a
/// target language and output format, have the backend transcribe it, review
/// and edit the timed segments, then save and download the re-encoded file.

pub mod backend;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod intake;
pub mod notify;
pub mod pipeline;
pub mod selection;
pub mod session;
pub mod transcript;

// Re-export main types for easy access
pub use crate::backend::{create_backend, HttpBackend, SubtitleBackend};
pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{BackendError, ConfigError, EditError, IntakeError, PipelineError, SelectionError};
pub use crate::intake::{FileCandidate, MediaFile};
pub use crate::pipeline::{Phase, PipelineController, PipelineState, RunOutcome};
pub use crate::selection::{Language, SubtitleFormat, UserSelection};
pub use crate::transcript::{FieldValue, SegmentField, SubtitleSegment, Transcript};
