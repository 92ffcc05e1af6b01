//! Upload → generate → edit → save orchestration
//!
//! [`PipelineController`] owns all session state: the selected file, the user's
//! choices, the transcript, the edit session and the run state. Runs move
//! through an explicit [`Phase`] machine and the observable
//! [`PipelineState`] is published on a watch channel so a presentation layer
//! can render progress while a run is in flight.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::backend::{SaveRequest, SubtitleBackend};
use crate::config::Config;
use crate::download::Downloader;
use crate::error::{BackendError, EditError, IntakeError, PipelineError, Result};
use crate::intake::{FileCandidate, MediaFile, MediaIntake};
use crate::notify::{Notification, Notifications};
use crate::selection::{Language, SubtitleFormat, UserSelection};
use crate::session::EditSession;
use crate::transcript::{FieldValue, SegmentField, Transcript};

/// Progress reported once the upload finished
pub const UPLOAD_PROGRESS: u8 = 30;
/// Progress reported once subtitles were generated
pub const GENERATE_PROGRESS: u8 = 100;

/// Where the pipeline is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    /// Nothing generated yet
    #[default]
    Idle,
    Uploading,
    Generating,
    /// A transcript is held and can be edited or saved
    Ready,
    Saving,
}

/// Events that move the pipeline forward
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    StartGenerate,
    Uploaded,
    Generated,
    StartSave,
    Saved,
}

impl Phase {
    /// Next phase for `event`, or None if the event is illegal here.
    /// Failures are not events: a failed run returns to the phase it started from.
    pub fn on(self, event: PipelineEvent) -> Option<Phase> {
        use PipelineEvent::*;
        match (self, event) {
            (Phase::Idle | Phase::Ready, StartGenerate) => Some(Phase::Uploading),
            (Phase::Uploading, Uploaded) => Some(Phase::Generating),
            (Phase::Generating, Generated) => Some(Phase::Ready),
            (Phase::Ready, StartSave) => Some(Phase::Saving),
            (Phase::Saving, Saved) => Some(Phase::Ready),
            _ => None,
        }
    }

    pub fn is_busy(self) -> bool {
        matches!(self, Phase::Uploading | Phase::Generating | Phase::Saving)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Idle => "idle",
            Phase::Uploading => "uploading",
            Phase::Generating => "generating",
            Phase::Ready => "ready",
            Phase::Saving => "saving",
        })
    }
}

/// Observable run state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PipelineState {
    pub busy: bool,
    /// 0..=100
    pub progress: u8,
    pub editing: bool,
    pub phase: Phase,
}

/// Result of a successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Output token issued by the backend
    pub subtitle_file: String,
    /// Where the downloaded file was written
    pub downloaded_to: PathBuf,
}

#[derive(Debug, Clone, Copy)]
enum Stage {
    Upload,
    Generate,
    Save,
}

/// Map a backend failure onto the user-facing error for `stage`
fn stage_failure(stage: Stage, err: BackendError) -> PipelineError {
    let detail = match err {
        BackendError::Rejected { detail, .. } => detail,
        BackendError::Malformed(reason) => Some(format!("malformed response ({})", reason)),
        other => match stage {
            Stage::Save => Some(other.to_string()),
            _ => return PipelineError::UnexpectedFailure(other.to_string()),
        },
    };

    match stage {
        Stage::Upload => PipelineError::UploadFailed { detail },
        Stage::Generate => PipelineError::GenerateFailed { detail },
        Stage::Save => PipelineError::SaveFailed { detail },
    }
}

/// Marks a run in flight. Dropping it returns the state to idle, whichever
/// way the run ends.
struct RunGuard {
    state: Arc<watch::Sender<PipelineState>>,
    resting: Phase,
}

impl RunGuard {
    fn begin(state: Arc<watch::Sender<PipelineState>>, phase: Phase, resting: Phase) -> Self {
        state.send_modify(|s| {
            s.busy = true;
            s.progress = 0;
            s.phase = phase;
        });
        Self { state, resting }
    }

    /// Apply a pipeline event, optionally reporting progress
    fn advance(&self, event: PipelineEvent, progress: Option<u8>) {
        self.state.send_modify(|s| {
            match s.phase.on(event) {
                Some(next) => s.phase = next,
                None => debug_assert!(false, "illegal event {:?} in phase {}", event, s.phase),
            }
            if let Some(progress) = progress {
                s.progress = progress;
            }
        });
    }

    /// Phase to return to when the run ends
    fn settle(&mut self, phase: Phase) {
        self.resting = phase;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        let resting = self.resting;
        self.state.send_modify(|s| {
            s.busy = false;
            s.progress = 0;
            s.phase = resting;
        });
    }
}

/// Owns the whole client session and drives the request pipeline
pub struct PipelineController {
    backend: Box<dyn SubtitleBackend>,
    downloader: Downloader,
    intake: MediaIntake,
    selection: UserSelection,
    transcript: Transcript,
    session: EditSession,
    notifications: Notifications,
    state: Arc<watch::Sender<PipelineState>>,
    /// Name of the file the current transcript was generated from
    source_name: Option<String>,
    last_output: Option<String>,
    last_download: Option<PathBuf>,
    unsaved_edits: bool,
}

impl PipelineController {
    pub fn new(backend: Box<dyn SubtitleBackend>, config: &Config) -> Self {
        let (state, _) = watch::channel(PipelineState::default());
        info!("🔧 Pipeline ready, backend at {}", backend.origin());

        Self {
            backend,
            downloader: Downloader::new(config.output.download_dir.clone()),
            intake: MediaIntake::new(&config.intake),
            selection: config.selection.clone(),
            transcript: Transcript::new(),
            session: EditSession::new(),
            notifications: Notifications::new(),
            state: Arc::new(state),
            source_name: None,
            last_output: None,
            last_download: None,
            unsaved_edits: false,
        }
    }

    /// Receive every state change
    pub fn subscribe(&self) -> watch::Receiver<PipelineState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> PipelineState {
        *self.state.borrow()
    }

    pub fn phase(&self) -> Phase {
        self.state().phase
    }

    pub fn backend(&self) -> &dyn SubtitleBackend {
        self.backend.as_ref()
    }

    pub fn download_dir(&self) -> &Path {
        self.downloader.dir()
    }

    // ---- media intake ----

    pub fn selected_file(&self) -> Option<&MediaFile> {
        self.intake.selected()
    }

    pub fn accepted_extensions(&self) -> String {
        self.intake.accepted_label()
    }

    /// Select the first of several in-memory candidates
    pub fn select_file(&mut self, candidates: Vec<FileCandidate>) -> std::result::Result<&MediaFile, IntakeError> {
        let outcome = self.intake.select_file(candidates).map(|file| file.name().to_string());
        self.report_selection(outcome)?;
        self.intake.selected().ok_or(IntakeError::NoFiles)
    }

    /// Select the first of several paths
    pub async fn select_path(&mut self, paths: &[PathBuf]) -> std::result::Result<&MediaFile, IntakeError> {
        let outcome = self.intake.select_path(paths).await.map(|file| file.name().to_string());
        self.report_selection(outcome)?;
        self.intake.selected().ok_or(IntakeError::NoFiles)
    }

    fn report_selection(&mut self, outcome: std::result::Result<String, IntakeError>) -> std::result::Result<(), IntakeError> {
        match outcome {
            Ok(name) => {
                self.notifications.success(format!("File selected successfully: {}", name));
                Ok(())
            }
            Err(e) => {
                self.notifications.error(e.to_string());
                Err(e)
            }
        }
    }

    // ---- user selection ----

    pub fn selection(&self) -> &UserSelection {
        &self.selection
    }

    pub fn set_target_language(&mut self, language: Language) {
        self.selection.target_language = language;
    }

    pub fn set_output_format(&mut self, format: SubtitleFormat) {
        self.selection.output_format = format;
    }

    pub fn set_translate(&mut self, translate: bool) {
        self.selection.translate = translate;
    }

    // ---- transcript and editing ----

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn is_editing(&self) -> bool {
        self.session.is_editing()
    }

    /// True once an edit was applied and not yet saved
    pub fn has_unsaved_edits(&self) -> bool {
        self.unsaved_edits
    }

    pub fn set_editing(&mut self, editing: bool) {
        if self.session.set_editing(editing) {
            debug!("Edit mode {}", if editing { "on" } else { "off" });
            self.state.send_modify(|s| s.editing = editing);
        }
    }

    /// Replace one field of one segment
    pub fn edit_segment(&mut self, index: usize, field: SegmentField, value: FieldValue) -> std::result::Result<(), EditError> {
        self.transcript = self.session.apply(&self.transcript, index, field, value)?;
        self.unsaved_edits = true;
        debug!("Edited segment {} field {}", index, field);
        Ok(())
    }

    /// Render the transcript in the current presentation mode
    pub fn render_transcript(&self) -> String {
        self.session.render(&self.transcript)
    }

    // ---- notifications ----

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        self.notifications.drain()
    }

    // ---- runs ----

    /// Output token of the last successful generate or save
    pub fn last_output(&self) -> Option<&str> {
        self.last_output.as_deref()
    }

    pub fn last_download(&self) -> Option<&Path> {
        self.last_download.as_deref()
    }

    fn begin(&self, action: &'static str, event: PipelineEvent) -> Result<RunGuard> {
        let current = self.phase();
        if current.is_busy() || self.state().busy {
            return Err(PipelineError::Busy);
        }
        let next = current
            .on(event)
            .ok_or(PipelineError::InvalidTransition { action, phase: current })?;
        Ok(RunGuard::begin(Arc::clone(&self.state), next, current))
    }

    /// Upload the selected file and generate subtitles for it.
    ///
    /// On success the transcript is replaced wholesale and the subtitle file is
    /// downloaded. Unsaved edits from an earlier run are discarded.
    pub async fn run_generate(&mut self) -> Result<RunOutcome> {
        let result = self.generate().await;
        match &result {
            Ok(_) => self.notifications.success("Subtitles generated successfully!"),
            Err(e) => self.notifications.error(e.to_string()),
        }
        result
    }

    async fn generate(&mut self) -> Result<RunOutcome> {
        let file = self.intake.selected().cloned().ok_or(PipelineError::NoFileSelected)?;
        let mut run = self.begin("generate subtitles", PipelineEvent::StartGenerate)?;

        if self.unsaved_edits {
            warn!("Discarding unsaved edits, transcript will be replaced");
        }
        if self.selection.translate && !self.selection.translation_applies() {
            warn!("Translation to English requested, backend only transcribes");
        }

        info!("📤 Uploading {}", file.name());
        let upload_token = self
            .backend
            .upload(&file)
            .await
            .map_err(|e| stage_failure(Stage::Upload, e))?;
        info!("✅ Uploaded as {}", upload_token);
        run.advance(PipelineEvent::Uploaded, Some(UPLOAD_PROGRESS));

        info!("🎬 Generating subtitles ({})", self.selection.summary());
        let generated = self
            .backend
            .generate(&upload_token, &self.selection)
            .await
            .map_err(|e| stage_failure(Stage::Generate, e))?;
        run.advance(PipelineEvent::Generated, Some(GENERATE_PROGRESS));
        run.settle(Phase::Ready);

        info!(
            "📝 Received {} segments, output {}",
            generated.transcript.len(),
            generated.subtitle_file
        );
        self.transcript = generated.transcript;
        self.unsaved_edits = false;
        self.source_name = Some(file.name().to_string());
        self.last_output = Some(generated.subtitle_file.clone());

        let downloaded_to = self.downloader.fetch(self.backend.as_ref(), &generated.subtitle_file).await?;
        self.last_download = Some(downloaded_to.clone());

        Ok(RunOutcome {
            subtitle_file: generated.subtitle_file,
            downloaded_to,
        })
    }

    /// Send the full transcript back for re-encoding and download the result.
    ///
    /// Leaves edit mode on success. A failed save keeps edit mode and the
    /// transcript so the user can retry.
    pub async fn run_save(&mut self) -> Result<RunOutcome> {
        let result = self.save().await;
        match &result {
            Ok(_) => self.notifications.success("Edits saved successfully!"),
            Err(e) => self.notifications.error(e.to_string()),
        }
        result
    }

    async fn save(&mut self) -> Result<RunOutcome> {
        let run = self.begin("save edits", PipelineEvent::StartSave)?;

        let filename = self
            .source_name
            .clone()
            .or_else(|| self.intake.selected().map(|file| file.name().to_string()))
            .ok_or(PipelineError::NoFileSelected)?;

        for issue in self.transcript.timing_issues() {
            warn!("{}", issue);
        }

        let request = SaveRequest::new(filename, &self.transcript, self.selection.output_format);
        info!("💾 Saving {} segments for {}", request.edits.len(), request.filename);

        let subtitle_file = self
            .backend
            .save_edits(&request)
            .await
            .map_err(|e| stage_failure(Stage::Save, e))?;
        run.advance(PipelineEvent::Saved, None);

        self.last_output = Some(subtitle_file.clone());
        self.unsaved_edits = false;
        self.set_editing(false);

        let downloaded_to = self.downloader.fetch(self.backend.as_ref(), &subtitle_file).await?;
        self.last_download = Some(downloaded_to.clone());

        Ok(RunOutcome {
            subtitle_file,
            downloaded_to,
        })
    }

    /// Download the last output again
    pub async fn download_latest(&mut self) -> Result<PathBuf> {
        let result = match self.last_output.clone() {
            Some(token) => self.downloader.fetch(self.backend.as_ref(), &token).await,
            None => Err(PipelineError::InvalidTransition {
                action: "download",
                phase: self.phase(),
            }),
        };

        match &result {
            Ok(path) => {
                self.last_download = Some(path.clone());
                self.notifications.success(format!("Downloaded to {}", path.display()));
            }
            Err(e) => self.notifications.error(e.to_string()),
        }
        result
    }
}
