//! Read-only and editable presentation of the transcript

use crate::error::EditError;
use crate::transcript::{FieldValue, SegmentField, Transcript};

/// Tracks whether the transcript is presented for editing
#[derive(Debug, Clone, Default)]
pub struct EditSession {
    editing: bool,
}

impl EditSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Switch presentation mode. Returns true if the mode changed.
    pub fn set_editing(&mut self, editing: bool) -> bool {
        let changed = self.editing != editing;
        self.editing = editing;
        changed
    }

    /// Apply one field edit, producing the next transcript
    pub fn apply(
        &self,
        transcript: &Transcript,
        index: usize,
        field: SegmentField,
        value: FieldValue,
    ) -> Result<Transcript, EditError> {
        if !self.editing {
            return Err(EditError::NotEditing);
        }
        transcript.with_field(index, field, value)
    }

    /// Render the transcript in the current mode
    pub fn render(&self, transcript: &Transcript) -> String {
        if transcript.is_empty() {
            return "No subtitles yet.\n".to_string();
        }

        let mut out = String::new();
        for (index, segment) in transcript.iter().enumerate() {
            if self.editing {
                out.push_str(&format!(
                    "#{:<4} start={}  end={}\n      text={:?}\n",
                    index, segment.start, segment.end, segment.text
                ));
            } else {
                out.push_str(&format!("[{}] {}\n    {}\n", index, segment.time_range_label(), segment.text));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::SubtitleSegment;

    fn transcript() -> Transcript {
        Transcript::from_segments(vec![
            SubtitleSegment::new(0.0, 2.5, "Hola"),
            SubtitleSegment::new(2.5, 4.0, "Mundo"),
        ])
    }

    #[test]
    fn test_edits_rejected_outside_edit_mode() {
        let session = EditSession::new();
        let err = session
            .apply(&transcript(), 0, SegmentField::Text, FieldValue::Text("x".to_string()))
            .unwrap_err();
        assert_eq!(err, EditError::NotEditing);
    }

    #[test]
    fn test_toggle_reports_change() {
        let mut session = EditSession::new();
        assert!(session.set_editing(true));
        assert!(!session.set_editing(true));
        assert!(session.set_editing(false));
        assert!(!session.is_editing());
    }

    #[test]
    fn test_read_only_render() {
        let rendered = EditSession::new().render(&transcript());
        assert!(rendered.contains("[0] 0.00s - 2.50s"));
        assert!(rendered.contains("    Hola"));
        assert!(rendered.contains("[1] 2.50s - 4.00s"));
    }

    #[test]
    fn test_editable_render_shows_raw_values() {
        let mut session = EditSession::new();
        session.set_editing(true);
        let rendered = session.render(&transcript());
        assert!(rendered.contains("start=0  end=2.5"));
        assert!(rendered.contains("text=\"Mundo\""));
    }

    #[test]
    fn test_empty_render() {
        assert_eq!(EditSession::new().render(&Transcript::new()), "No subtitles yet.\n");
    }
}
