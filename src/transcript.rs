use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::error::EditError;

/// One timed caption
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubtitleSegment {
    /// Start time in seconds
    pub start: f64,
    /// End time in seconds
    pub end: f64,
    /// Caption text
    pub text: String,
}

impl SubtitleSegment {
    pub fn new(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Time range as shown in the read-only view
    pub fn time_range_label(&self) -> String {
        format!("{:.2}s - {:.2}s", self.start, self.end)
    }
}

/// Editable fields of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentField {
    Start,
    End,
    Text,
}

impl SegmentField {
    pub fn is_numeric(self) -> bool {
        matches!(self, SegmentField::Start | SegmentField::End)
    }
}

impl fmt::Display for SegmentField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SegmentField::Start => "start",
            SegmentField::End => "end",
            SegmentField::Text => "text",
        })
    }
}

impl FromStr for SegmentField {
    type Err = EditError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "start" => Ok(SegmentField::Start),
            "end" => Ok(SegmentField::End),
            "text" => Ok(SegmentField::Text),
            _ => Err(EditError::UnknownField(s.to_string())),
        }
    }
}

/// New value for one field
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Seconds(f64),
    Text(String),
}

impl FieldValue {
    /// Parse raw user input for `field`
    pub fn parse(field: SegmentField, input: &str) -> Result<Self, EditError> {
        if field.is_numeric() {
            let value: f64 = input.trim().parse().map_err(|_| EditError::Unparseable {
                field,
                input: input.to_string(),
            })?;
            Ok(FieldValue::Seconds(value))
        } else {
            Ok(FieldValue::Text(input.to_string()))
        }
    }
}

/// Timing problems found by [`Transcript::timing_issues`]
#[derive(Debug, Clone, PartialEq)]
pub enum TimingIssue {
    NegativeStart { index: usize },
    EndBeforeStart { index: usize },
    OutOfOrder { index: usize },
    EmptyText { index: usize },
}

impl fmt::Display for TimingIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimingIssue::NegativeStart { index } => write!(f, "Segment {}: start time is negative", index),
            TimingIssue::EndBeforeStart { index } => write!(f, "Segment {}: end time is before start time", index),
            TimingIssue::OutOfOrder { index } => {
                write!(f, "Segment {}: starts before the previous segment", index)
            }
            TimingIssue::EmptyText { index } => write!(f, "Segment {}: empty text", index),
        }
    }
}

/// Ordered sequence of segments.
///
/// Cloning is cheap and produces an immutable snapshot: edits build a new
/// transcript that shares every untouched segment with the old one.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    segments: Arc<Vec<Arc<SubtitleSegment>>>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<SubtitleSegment>) -> Self {
        Self {
            segments: Arc::new(segments.into_iter().map(Arc::new).collect()),
        }
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&SubtitleSegment> {
        self.segments.get(index).map(|segment| segment.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &SubtitleSegment> + '_ {
        self.segments.iter().map(|segment| segment.as_ref())
    }

    /// True when both transcripts hold the very same segment allocation at `index`
    pub fn shares_segment(&self, other: &Transcript, index: usize) -> bool {
        match (self.segments.get(index), other.segments.get(index)) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Owned copy of every segment, in order, for submission
    pub fn snapshot(&self) -> Vec<SubtitleSegment> {
        self.iter().cloned().collect()
    }

    /// Return a transcript with one field of one segment replaced.
    ///
    /// `self` is left untouched.
    pub fn with_field(&self, index: usize, field: SegmentField, value: FieldValue) -> Result<Transcript, EditError> {
        let current = self.segments.get(index).ok_or(EditError::IndexOutOfRange {
            index,
            len: self.len(),
        })?;

        let mut updated = SubtitleSegment::clone(current);
        match (field, value) {
            (SegmentField::Start | SegmentField::End, FieldValue::Seconds(seconds)) => {
                if !seconds.is_finite() {
                    return Err(EditError::NonFinite { field, value: seconds });
                }
                if field == SegmentField::Start {
                    updated.start = seconds;
                } else {
                    updated.end = seconds;
                }
            }
            (SegmentField::Text, FieldValue::Text(text)) => updated.text = text,
            (SegmentField::Text, FieldValue::Seconds(_)) => {
                return Err(EditError::FieldMismatch {
                    field,
                    expected: "text",
                })
            }
            (_, FieldValue::Text(_)) => {
                return Err(EditError::FieldMismatch {
                    field,
                    expected: "a number of seconds",
                })
            }
        }

        let mut segments: Vec<Arc<SubtitleSegment>> = self.segments.iter().cloned().collect();
        segments[index] = Arc::new(updated);

        Ok(Transcript {
            segments: Arc::new(segments),
        })
    }

    /// Advisory timing checks; nothing here blocks a save
    pub fn timing_issues(&self) -> Vec<TimingIssue> {
        let mut issues = Vec::new();
        let mut previous_start: Option<f64> = None;

        for (index, segment) in self.iter().enumerate() {
            if segment.start < 0.0 {
                issues.push(TimingIssue::NegativeStart { index });
            }
            if segment.end < segment.start {
                issues.push(TimingIssue::EndBeforeStart { index });
            }
            if previous_start.is_some_and(|prev| segment.start < prev) {
                issues.push(TimingIssue::OutOfOrder { index });
            }
            if segment.text.trim().is_empty() {
                issues.push(TimingIssue::EmptyText { index });
            }
            previous_start = Some(segment.start);
        }

        issues
    }

    /// End time of the last-ending segment
    pub fn total_duration(&self) -> f64 {
        self.iter().map(|segment| segment.end).fold(0.0, f64::max)
    }
}

impl PartialEq for Transcript {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}

impl From<Vec<SubtitleSegment>> for Transcript {
    fn from(segments: Vec<SubtitleSegment>) -> Self {
        Self::from_segments(segments)
    }
}
