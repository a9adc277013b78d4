//! Export Integration Tests
//!
//! Tests the export flow against scripted collaborators:
//! - Selection and transform are hidden from the capture and restored after
//! - Capture, save and permission failures map to user messages
//! - The settle delay elapses before capture

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use meme_core::{
    CanvasCapture, CanvasFrame, CanvasTransform, CapturedImage, EditorConfig, ExportConfig,
    ExportCoordinator, ExportError, ExportOutcome, GestureState, ManualClock, MediaLibrary,
    MemeEditor, MemeError, MemeResult, PermissionStatus, PinchEvent, SavedAsset, TextElement,
    UserMessage,
};
use tokio::time::Instant;

/// Capture that records frames and the instant it was asked to capture.
#[derive(Debug, Default)]
struct ScriptedCapture {
    frames: Mutex<Vec<(CanvasFrame, Instant)>>,
    error: Option<String>,
}

#[async_trait]
impl CanvasCapture for ScriptedCapture {
    async fn capture(&self, frame: &CanvasFrame) -> MemeResult<CapturedImage> {
        self.frames
            .lock()
            .expect("should lock")
            .push((frame.clone(), Instant::now()));
        match &self.error {
            Some(msg) => Err(MemeError::CaptureFailed(msg.clone())),
            None => Ok(CapturedImage {
                width: 4,
                height: 4,
                data: vec![0x89, b'P', b'N', b'G'],
            }),
        }
    }
}

/// Library with a fixed permission answer and optional save failure.
#[derive(Debug)]
struct ScriptedLibrary {
    permission: PermissionStatus,
    fail_save: bool,
    saved: Mutex<Vec<Option<String>>>,
}

impl ScriptedLibrary {
    fn granting() -> Self {
        Self {
            permission: PermissionStatus::Granted,
            fail_save: false,
            saved: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl MediaLibrary for ScriptedLibrary {
    async fn request_permission(&self) -> PermissionStatus {
        self.permission
    }

    async fn save_image(
        &self,
        _image: &CapturedImage,
        album: Option<&str>,
    ) -> MemeResult<SavedAsset> {
        if self.fail_save {
            return Err(MemeError::SaveFailed("disk full".into()));
        }
        self.saved
            .lock()
            .expect("should lock")
            .push(album.map(str::to_string));
        Ok(SavedAsset {
            id: "meme-1.png".into(),
            album: album.map(str::to_string),
        })
    }
}

/// Editor with text "1" selected and the canvas zoomed to 2x.
fn zoomed_editor_with_selection() -> MemeEditor {
    let clock = ManualClock::new(0);
    let mut editor = MemeEditor::with_config(EditorConfig::default(), Arc::new(clock));
    editor.add_text(TextElement::new("top text").with_id("1"));
    editor.select_text(Some("1".into()));
    editor.on_canvas_pinch(&PinchEvent::new(GestureState::Active, 2.0));
    editor.on_canvas_pinch(&PinchEvent::new(GestureState::End, 2.0));
    editor
}

// ============================================================================
// Success Path
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_export_hides_selection_and_resets_zoom() {
    let coordinator =
        ExportCoordinator::new(ScriptedCapture::default(), ScriptedLibrary::granting());
    let mut editor = zoomed_editor_with_selection();
    let started = Instant::now();

    let outcome = coordinator.export(&mut editor).await;
    assert!(outcome.is_saved());
    assert_eq!(outcome.user_message(), Some(UserMessage::success()));

    let frames = coordinator.capture().frames.lock().expect("should lock");
    let (frame, captured_at) = &frames[0];
    assert!(frame.selected.is_none());
    assert_eq!(frame.transform, CanvasTransform::IDENTITY);
    assert!(captured_at.duration_since(started) >= Duration::from_millis(100));

    let albums = coordinator.library().saved.lock().expect("should lock");
    assert_eq!(albums.as_slice(), &[Some("MemeGene".to_string())]);

    assert_eq!(editor.selection().selected_text_id(), Some(&"1".into()));
    assert!((editor.transform().committed().scale - 2.0).abs() < f32::EPSILON);
}

#[tokio::test(start_paused = true)]
async fn test_export_can_keep_transform() {
    let config = ExportConfig {
        reset_transform: false,
        album: None,
        ..ExportConfig::default()
    };
    let coordinator = ExportCoordinator::with_config(
        ScriptedCapture::default(),
        ScriptedLibrary::granting(),
        config,
    );
    let mut editor = zoomed_editor_with_selection();

    let outcome = coordinator.export(&mut editor).await;
    assert!(outcome.is_saved());

    let frames = coordinator.capture().frames.lock().expect("should lock");
    assert!((frames[0].0.transform.scale - 2.0).abs() < f32::EPSILON);
    let albums = coordinator.library().saved.lock().expect("should lock");
    assert_eq!(albums.as_slice(), &[None]);
}

// ============================================================================
// Failure Paths
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_capture_failure_restores_selection() {
    let capture = ScriptedCapture {
        error: Some("snapshot view missing".into()),
        ..ScriptedCapture::default()
    };
    let coordinator = ExportCoordinator::new(capture, ScriptedLibrary::granting());
    let mut editor = zoomed_editor_with_selection();

    let outcome = coordinator.export(&mut editor).await;

    assert_eq!(
        outcome,
        ExportOutcome::Failed(ExportError::CaptureFailed("snapshot view missing".into()))
    );
    assert_eq!(outcome.user_message(), Some(UserMessage::export_failed()));
    assert_eq!(editor.selection().selected_text_id(), Some(&"1".into()));
    assert!((editor.transform().committed().scale - 2.0).abs() < f32::EPSILON);
    assert!(coordinator.library().saved.lock().expect("should lock").is_empty());
    assert!(!coordinator.is_exporting());
}

#[tokio::test(start_paused = true)]
async fn test_save_failure_reports_export_failed() {
    let library = ScriptedLibrary {
        fail_save: true,
        ..ScriptedLibrary::granting()
    };
    let coordinator = ExportCoordinator::new(ScriptedCapture::default(), library);
    let mut editor = zoomed_editor_with_selection();

    let outcome = coordinator.export(&mut editor).await;

    assert_eq!(
        outcome,
        ExportOutcome::Failed(ExportError::SaveFailed("disk full".into()))
    );
    let message = outcome.user_message().expect("failure has a message");
    assert_eq!(message.title, "Export Failed");
    assert_eq!(editor.selection().selected_text_id(), Some(&"1".into()));
}

#[tokio::test]
async fn test_permission_denied_leaves_editor_untouched() {
    let library = ScriptedLibrary {
        permission: PermissionStatus::Denied,
        ..ScriptedLibrary::granting()
    };
    let coordinator = ExportCoordinator::new(ScriptedCapture::default(), library);
    let mut editor = zoomed_editor_with_selection();

    let outcome = coordinator.export(&mut editor).await;

    let message = outcome.user_message().expect("denial has a message");
    assert_eq!(message.title, "Permission Required");
    assert_eq!(
        message.body,
        "Please allow access to your photo library to save memes."
    );
    assert!(coordinator.capture().frames.lock().expect("should lock").is_empty());
    assert_eq!(editor.selection().selected_text_id(), Some(&"1".into()));

    // A later export is not blocked by the aborted one.
    assert!(!coordinator.is_exporting());
}
