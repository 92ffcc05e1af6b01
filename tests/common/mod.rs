#![allow(dead_code)]

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::watch;

use subtitle_client::backend::{GeneratedSubtitles, SaveRequest, SubtitleBackend};
use subtitle_client::{BackendError, MediaFile, PipelineState, SubtitleSegment, Transcript, UserSelection};

/// Scripted reply: a value or a rejection with optional detail
pub type Reply<T> = Result<T, (u16, Option<String>)>;

fn reply<T: Clone>(scripted: &Reply<T>) -> Result<T, BackendError> {
    scripted.clone().map_err(|(status, detail)| BackendError::Rejected { status, detail })
}

pub struct MockState {
    pub upload: Reply<String>,
    pub generate: Reply<(String, Vec<SubtitleSegment>)>,
    pub save: Reply<String>,
    pub download: Reply<Vec<u8>>,

    pub uploaded: Vec<String>,
    pub generate_calls: Vec<(String, UserSelection)>,
    pub saved: Vec<SaveRequest>,
    pub downloaded: Vec<String>,

    /// When set, the state seen while generate is in flight is recorded
    pub probe: Option<watch::Receiver<PipelineState>>,
    pub observed: Option<PipelineState>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            upload: Ok("clip.mp4".to_string()),
            generate: Ok((
                "clip_abc.vtt".to_string(),
                vec![SubtitleSegment::new(0.0, 2.5, "Hola")],
            )),
            save: Ok("clip_edited.vtt".to_string()),
            download: Ok(b"WEBVTT\n\n00:00.000 --> 00:02.500\nHola\n".to_vec()),
            uploaded: Vec::new(),
            generate_calls: Vec::new(),
            saved: Vec::new(),
            downloaded: Vec::new(),
            probe: None,
            observed: None,
        }
    }
}

/// In-memory backend with scripted replies and recorded calls
#[derive(Clone, Default)]
pub struct MockBackend {
    pub state: Arc<Mutex<MockState>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn boxed(&self) -> Box<dyn SubtitleBackend> {
        Box::new(self.clone())
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut MockState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }
}

#[async_trait]
impl SubtitleBackend for MockBackend {
    async fn upload(&self, file: &MediaFile) -> Result<String, BackendError> {
        self.with(|s| {
            s.uploaded.push(file.name().to_string());
            reply(&s.upload)
        })
    }

    async fn generate(&self, upload_token: &str, selection: &UserSelection) -> Result<GeneratedSubtitles, BackendError> {
        // Let the watch channel settle before sampling it
        tokio::task::yield_now().await;
        self.with(|s| {
            if let Some(probe) = &s.probe {
                s.observed = Some(*probe.borrow());
            }
            s.generate_calls.push((upload_token.to_string(), selection.clone()));
            reply(&s.generate).map(|(subtitle_file, segments)| GeneratedSubtitles {
                subtitle_file,
                transcript: Transcript::from_segments(segments),
            })
        })
    }

    async fn save_edits(&self, request: &SaveRequest) -> Result<String, BackendError> {
        self.with(|s| {
            s.saved.push(request.clone());
            reply(&s.save)
        })
    }

    async fn download(&self, subtitle_file: &str) -> Result<Vec<u8>, BackendError> {
        self.with(|s| {
            s.downloaded.push(subtitle_file.to_string());
            reply(&s.download)
        })
    }

    fn origin(&self) -> &str {
        "mock://backend"
    }
}
