//! Wire models for the subtitle backend API

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::selection::{Language, SubtitleFormat, UserSelection};
use crate::transcript::{SubtitleSegment, Transcript};

/// Reply to `POST /api/upload`
#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub filename: String,
}

/// Body of `POST /api/generate-subtitles`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenerateRequest {
    pub target_language: Language,
    pub output_format: SubtitleFormat,
    pub translate: bool,
}

impl From<&UserSelection> for GenerateRequest {
    fn from(selection: &UserSelection) -> Self {
        Self {
            target_language: selection.target_language,
            output_format: selection.output_format,
            translate: selection.translate,
        }
    }
}

/// Segment as sent by the backend. Extra fields such as `index` are ignored.
#[derive(Debug, Deserialize)]
pub struct WireSegment {
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Reply to `POST /api/generate-subtitles`
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    pub subtitle_file: String,
    pub subtitles: Vec<WireSegment>,
}

/// Output token plus the transcript it was encoded from
#[derive(Debug, Clone)]
pub struct GeneratedSubtitles {
    pub subtitle_file: String,
    pub transcript: Transcript,
}

impl GenerateResponse {
    /// Validate the payload and turn it into a transcript
    pub fn into_generated(self) -> Result<GeneratedSubtitles, BackendError> {
        let subtitle_file = non_empty_token(self.subtitle_file, "subtitle_file")?;

        let mut segments = Vec::with_capacity(self.subtitles.len());
        for (index, wire) in self.subtitles.into_iter().enumerate() {
            if !wire.start.is_finite() || !wire.end.is_finite() {
                return Err(BackendError::Malformed(format!(
                    "segment {} has non-finite timing ({}, {})",
                    index, wire.start, wire.end
                )));
            }
            segments.push(SubtitleSegment::new(wire.start, wire.end, wire.text));
        }

        Ok(GeneratedSubtitles {
            subtitle_file,
            transcript: Transcript::from_segments(segments),
        })
    }
}

/// One entry of the save payload
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EditEntry {
    /// 1-based position
    pub index: usize,
    pub start: f64,
    pub end: f64,
    pub text: String,
}

/// Body of `POST /api/edit-subtitles`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SaveRequest {
    pub filename: String,
    pub edits: Vec<EditEntry>,
    pub output_format: SubtitleFormat,
}

impl SaveRequest {
    /// Serialize the whole transcript, in order
    pub fn new(filename: impl Into<String>, transcript: &Transcript, output_format: SubtitleFormat) -> Self {
        let edits = transcript
            .iter()
            .enumerate()
            .map(|(i, segment)| EditEntry {
                index: i + 1,
                start: segment.start,
                end: segment.end,
                text: segment.text.clone(),
            })
            .collect();

        Self {
            filename: filename.into(),
            edits,
            output_format,
        }
    }
}

/// Reply to `POST /api/edit-subtitles`
#[derive(Debug, Deserialize)]
pub struct SaveResponse {
    pub subtitle_file: String,
}

/// Error body of a non-2xx response
#[derive(Debug, Deserialize)]
pub struct ErrorBody {
    pub detail: Option<serde_json::Value>,
}

impl ErrorBody {
    /// Extract a human readable detail from a raw response body
    pub fn detail_from(body: &[u8]) -> Option<String> {
        let parsed: ErrorBody = serde_json::from_slice(body).ok()?;
        match parsed.detail? {
            serde_json::Value::String(detail) => Some(detail),
            serde_json::Value::Null => None,
            // validation errors arrive as a list of objects
            other => Some(other.to_string()),
        }
    }
}

pub(crate) fn non_empty_token(token: String, field: &str) -> Result<String, BackendError> {
    if token.trim().is_empty() {
        return Err(BackendError::Malformed(format!("empty {} in response", field)));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_response_ignores_extra_fields() {
        let body = r#"{
            "status": "success",
            "subtitle_file": "clip_abc.vtt",
            "subtitles": [
                {"index": 1, "start": 0, "end": 2.5, "text": "Hola"},
                {"index": 2, "start": 2.5, "end": 4.0, "text": "Mundo"}
            ]
        }"#;
        let response: GenerateResponse = serde_json::from_str(body).unwrap();
        let generated = response.into_generated().unwrap();

        assert_eq!(generated.subtitle_file, "clip_abc.vtt");
        assert_eq!(generated.transcript.len(), 2);
        assert_eq!(generated.transcript.get(0).unwrap(), &SubtitleSegment::new(0.0, 2.5, "Hola"));
    }

    #[test]
    fn test_generate_response_missing_field_is_rejected() {
        let body = r#"{"subtitle_file": "a.srt", "subtitles": [{"start": 0, "text": "no end"}]}"#;
        assert!(serde_json::from_str::<GenerateResponse>(body).is_err());

        let body = r#"{"subtitle_file": "a.srt", "subtitles": [{"start": "0", "end": 1, "text": "x"}]}"#;
        assert!(serde_json::from_str::<GenerateResponse>(body).is_err());
    }

    #[test]
    fn test_empty_token_is_malformed() {
        let response = GenerateResponse {
            subtitle_file: " ".to_string(),
            subtitles: vec![],
        };
        assert!(matches!(response.into_generated(), Err(BackendError::Malformed(_))));
    }

    #[test]
    fn test_save_request_serializes_every_segment_in_order() {
        let transcript = Transcript::from_segments(vec![
            SubtitleSegment::new(0.0, 1.0, "one"),
            SubtitleSegment::new(1.0, 2.0, "two"),
        ]);
        let request = SaveRequest::new("clip.mp4", &transcript, SubtitleFormat::Vtt);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["filename"], "clip.mp4");
        assert_eq!(json["output_format"], "vtt");
        assert_eq!(json["edits"][0]["index"], 1);
        assert_eq!(json["edits"][1]["text"], "two");
        assert_eq!(json["edits"][1]["start"], 1.0);
    }

    #[test]
    fn test_error_detail_extraction() {
        assert_eq!(
            ErrorBody::detail_from(br#"{"detail": "model overloaded"}"#),
            Some("model overloaded".to_string())
        );
        assert_eq!(ErrorBody::detail_from(br#"{"detail": null}"#), None);
        assert_eq!(ErrorBody::detail_from(b"<html>502</html>"), None);
        assert!(ErrorBody::detail_from(br#"{"detail": [{"loc": ["query", "filename"]}]}"#)
            .unwrap()
            .contains("filename"));
    }
}
