mod common;

use common::MockBackend;
use tempfile::TempDir;
use tokio_test::{assert_err, assert_ok};

use subtitle_client::{
    ConfigBuilder, EditError, FieldValue, FileCandidate, Language, Phase, PipelineController, PipelineError,
    SegmentField, SubtitleFormat, SubtitleSegment, UserSelection,
};

fn controller(mock: &MockBackend, dir: &TempDir) -> PipelineController {
    let config = ConfigBuilder::new()
        .with_download_dir(dir.path().to_path_buf())
        .build();
    PipelineController::new(mock.boxed(), &config)
}

fn select(controller: &mut PipelineController, name: &str) {
    controller
        .select_file(vec![FileCandidate::new(name, b"fake media".to_vec())])
        .unwrap();
}

fn two_segments(mock: &MockBackend) {
    mock.with(|s| {
        s.generate = Ok((
            "clip_abc.srt".to_string(),
            vec![
                SubtitleSegment::new(0.0, 2.5, "Hello"),
                SubtitleSegment::new(2.5, 4.0, "World"),
            ],
        ))
    });
}

fn last_message(controller: &mut PipelineController) -> String {
    controller
        .take_notifications()
        .pop()
        .map(|n| n.message)
        .unwrap_or_default()
}

#[tokio::test]
async fn test_generate_translated_vtt() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);

    select(&mut controller, "clip.mp4");
    controller.set_target_language(Language::Es);
    controller.set_output_format(SubtitleFormat::Vtt);
    controller.set_translate(true);

    let outcome = assert_ok!(controller.run_generate().await);

    assert_eq!(controller.transcript().snapshot(), vec![SubtitleSegment::new(0.0, 2.5, "Hola")]);
    assert_eq!(outcome.subtitle_file, "clip_abc.vtt");
    assert_eq!(outcome.downloaded_to, dir.path().join("clip_abc.vtt"));
    assert!(outcome.downloaded_to.exists());
    assert_eq!(controller.last_output(), Some("clip_abc.vtt"));

    let state = controller.state();
    assert!(!state.busy);
    assert_eq!(state.progress, 0);
    assert_eq!(state.phase, Phase::Ready);

    mock.with(|s| {
        assert_eq!(s.uploaded, vec!["clip.mp4".to_string()]);
        assert_eq!(
            s.generate_calls,
            vec![(
                "clip.mp4".to_string(),
                UserSelection::new(Language::Es, SubtitleFormat::Vtt, true)
            )]
        );
        assert_eq!(s.downloaded, vec!["clip_abc.vtt".to_string()]);
    });
    assert_eq!(last_message(&mut controller), "Subtitles generated successfully!");
}

#[tokio::test]
async fn test_progress_is_reported_mid_run() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");

    let probe = controller.subscribe();
    mock.with(|s| s.probe = Some(probe));

    assert_ok!(controller.run_generate().await);

    let observed = mock.with(|s| s.observed).unwrap();
    assert!(observed.busy);
    assert_eq!(observed.progress, 30);
    assert_eq!(observed.phase, Phase::Generating);
    assert!(!controller.state().busy);
}

#[tokio::test]
async fn test_upload_failure_skips_generate() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    mock.with(|s| s.upload = Err((500, Some("disk full".to_string()))));
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");

    let err = assert_err!(controller.run_generate().await);
    assert_eq!(
        err,
        PipelineError::UploadFailed {
            detail: Some("disk full".to_string())
        }
    );

    assert!(mock.with(|s| s.generate_calls.is_empty()));
    assert!(controller.transcript().is_empty());
    assert_eq!(controller.state().phase, Phase::Idle);
    assert!(!controller.state().busy);
    assert_eq!(last_message(&mut controller), "Failed to upload file: disk full");
}

#[tokio::test]
async fn test_upload_failure_without_detail() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    mock.with(|s| s.upload = Err((502, None)));
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");

    assert_err!(controller.run_generate().await);
    assert_eq!(last_message(&mut controller), "Failed to upload file: Unknown error");
}

#[tokio::test]
async fn test_generate_failure_keeps_previous_transcript() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");
    assert_ok!(controller.run_generate().await);
    let before = controller.transcript().clone();

    mock.with(|s| s.generate = Err((503, Some("model overloaded".to_string()))));
    let err = assert_err!(controller.run_generate().await);

    assert!(matches!(err, PipelineError::GenerateFailed { .. }));
    assert_eq!(controller.transcript(), &before);
    assert!(last_message(&mut controller).contains("model overloaded"));

    let state = controller.state();
    assert!(!state.busy);
    assert_eq!(state.progress, 0);
    assert_eq!(state.phase, Phase::Ready);
}

#[tokio::test]
async fn test_generate_without_file() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);

    let err = assert_err!(controller.run_generate().await);
    assert_eq!(err, PipelineError::NoFileSelected);
    assert!(mock.with(|s| s.uploaded.is_empty()));
    assert_eq!(last_message(&mut controller), "Please select a file first!");
}

#[tokio::test]
async fn test_download_failure_after_generate() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    mock.with(|s| s.download = Err((404, Some("not found".to_string()))));
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");

    let err = assert_err!(controller.run_generate().await);
    assert!(matches!(err, PipelineError::DownloadFailed { .. }));

    // The transcript still arrived and the output can be fetched again
    assert_eq!(controller.transcript().len(), 1);
    assert_eq!(controller.last_output(), Some("clip_abc.vtt"));
    assert_eq!(controller.state().phase, Phase::Ready);

    mock.with(|s| s.download = Ok(b"1\n".to_vec()));
    let path = assert_ok!(controller.download_latest().await);
    assert_eq!(path, dir.path().join("clip_abc.vtt"));
}

#[tokio::test]
async fn test_selection_replaced_and_rejection_keeps_previous() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);

    select(&mut controller, "a.mp4");
    select(&mut controller, "b.mp3");
    assert_eq!(controller.selected_file().unwrap().name(), "b.mp3");
    assert_eq!(controller.selected_file().unwrap().mime(), "audio/mpeg");

    let rejected = controller.select_file(vec![FileCandidate::new("notes.txt", b"hi".to_vec())]);
    assert!(rejected.is_err());
    assert_eq!(controller.selected_file().unwrap().name(), "b.mp3");
}

#[tokio::test]
async fn test_select_path_reads_file() {
    let dir = TempDir::new().unwrap();
    let media = dir.path().join("talk.wav");
    tokio::fs::write(&media, b"RIFF....WAVE").await.unwrap();

    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);

    let file = assert_ok!(controller.select_path(&[media]).await);
    assert_eq!(file.name(), "talk.wav");
    assert_eq!(file.size(), 12);
    assert_eq!(last_message(&mut controller), "File selected successfully: talk.wav");
}

#[tokio::test]
async fn test_edit_shares_untouched_segments() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    two_segments(&mock);
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");
    assert_ok!(controller.run_generate().await);

    let before = controller.transcript().clone();
    controller.set_editing(true);
    assert_ok!(controller.edit_segment(1, SegmentField::Text, FieldValue::Text("Everyone".to_string())));

    let after = controller.transcript();
    assert!(after.shares_segment(&before, 0));
    assert!(!after.shares_segment(&before, 1));
    assert_eq!(after.get(1).unwrap().text, "Everyone");
    assert_eq!(before.get(1).unwrap().text, "World");
    assert!(controller.has_unsaved_edits());
}

#[tokio::test]
async fn test_edit_rules() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    two_segments(&mock);
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");
    assert_ok!(controller.run_generate().await);

    assert_eq!(
        controller.edit_segment(0, SegmentField::Start, FieldValue::Seconds(1.0)),
        Err(EditError::NotEditing)
    );

    controller.set_editing(true);
    assert_eq!(
        controller.edit_segment(5, SegmentField::Start, FieldValue::Seconds(1.0)),
        Err(EditError::IndexOutOfRange { index: 5, len: 2 })
    );
    assert!(matches!(
        controller.edit_segment(0, SegmentField::End, FieldValue::Seconds(f64::NAN)),
        Err(EditError::NonFinite { .. })
    ));

    // end before start is accepted and only reported
    assert_ok!(controller.edit_segment(0, SegmentField::End, FieldValue::Seconds(-1.0)));
    assert!(!controller.transcript().timing_issues().is_empty());
}

#[tokio::test]
async fn test_toggling_edit_mode_keeps_transcript() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    two_segments(&mock);
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");
    assert_ok!(controller.run_generate().await);

    let before = controller.transcript().clone();
    controller.set_editing(true);
    assert!(controller.state().editing);
    controller.set_editing(false);
    assert!(!controller.state().editing);

    assert_eq!(controller.transcript(), &before);
    assert!(!controller.has_unsaved_edits());
}

#[tokio::test]
async fn test_save_sends_full_transcript_and_leaves_edit_mode() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    two_segments(&mock);
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");
    controller.set_output_format(SubtitleFormat::Ass);
    assert_ok!(controller.run_generate().await);

    controller.set_editing(true);
    assert_ok!(controller.edit_segment(0, SegmentField::Text, FieldValue::Text("Hi".to_string())));

    let outcome = assert_ok!(controller.run_save().await);
    assert_eq!(outcome.subtitle_file, "clip_edited.vtt");
    assert_eq!(outcome.downloaded_to, dir.path().join("clip_edited.vtt"));
    assert!(!controller.is_editing());
    assert!(!controller.state().editing);
    assert!(!controller.has_unsaved_edits());
    assert_eq!(controller.last_output(), Some("clip_edited.vtt"));
    assert_eq!(last_message(&mut controller), "Edits saved successfully!");

    let saved = mock.with(|s| s.saved.clone());
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].filename, "clip.mp4");
    assert_eq!(saved[0].output_format, SubtitleFormat::Ass);
    let texts: Vec<&str> = saved[0].edits.iter().map(|e| e.text.as_str()).collect();
    assert_eq!(texts, vec!["Hi", "World"]);
    assert_eq!(saved[0].edits[1].index, 2);
}

#[tokio::test]
async fn test_failed_save_keeps_edits() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    two_segments(&mock);
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");
    assert_ok!(controller.run_generate().await);

    controller.set_editing(true);
    assert_ok!(controller.edit_segment(1, SegmentField::Start, FieldValue::Seconds(3.0)));
    let edited = controller.transcript().clone();

    mock.with(|s| s.save = Err((500, Some("encoder crashed".to_string()))));
    let err = assert_err!(controller.run_save().await);
    assert!(matches!(err, PipelineError::SaveFailed { .. }));
    assert_eq!(last_message(&mut controller), "Failed to save edits. Please try again.");

    assert!(controller.is_editing());
    assert!(controller.has_unsaved_edits());
    assert_eq!(controller.transcript(), &edited);
    assert_eq!(controller.state().phase, Phase::Ready);
}

#[tokio::test]
async fn test_save_before_generate_is_rejected() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");

    let err = assert_err!(controller.run_save().await);
    assert!(matches!(err, PipelineError::InvalidTransition { phase: Phase::Idle, .. }));
    assert!(mock.with(|s| s.saved.is_empty()));
}

#[tokio::test]
async fn test_regenerate_replaces_edited_transcript() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    two_segments(&mock);
    let mut controller = controller(&mock, &dir);
    select(&mut controller, "clip.mp4");
    assert_ok!(controller.run_generate().await);

    controller.set_editing(true);
    assert_ok!(controller.edit_segment(0, SegmentField::Text, FieldValue::Text("Edited".to_string())));

    mock.with(|s| s.generate = Ok(("clip_new.srt".to_string(), vec![SubtitleSegment::new(0.0, 1.0, "Fresh")])));
    assert_ok!(controller.run_generate().await);

    assert_eq!(controller.transcript().snapshot(), vec![SubtitleSegment::new(0.0, 1.0, "Fresh")]);
    assert!(!controller.has_unsaved_edits());
}

#[tokio::test]
async fn test_download_latest_requires_output() {
    let dir = TempDir::new().unwrap();
    let mock = MockBackend::new();
    let mut controller = controller(&mock, &dir);

    let err = assert_err!(controller.download_latest().await);
    assert!(matches!(err, PipelineError::InvalidTransition { .. }));

    select(&mut controller, "clip.mp4");
    assert_ok!(controller.run_generate().await);
    assert_ok!(controller.download_latest().await);
    assert_eq!(mock.with(|s| s.downloaded.len()), 2);
}
