//! # Export Coordinator
//!
//! Flattens the canvas into a raster and saves it to the photo library.
//!
//! ```text
//! request_permission ──denied──► PermissionDenied
//!        │ granted
//!        ▼
//! stash selection + transform, clear selection, reset transform
//!        │
//!        ▼ settle delay
//! capture(frame) ──► save_image(album)
//!        │
//!        ▼ always
//! restore selection + transform
//! ```
//!
//! Only one export runs at a time per coordinator; a request made while
//! another is in flight returns [`ExportOutcome::Skipped`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::ExportConfig;
use crate::editor::{CanvasFrame, MemeEditor};
use crate::error::{ExportError, MemeError, MemeResult};
use crate::transform::CanvasTransform;

/// Answer to a photo library permission request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    /// Access granted.
    Granted,
    /// Access refused.
    Denied,
}

/// An encoded raster of the canvas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// PNG-encoded bytes.
    pub data: Vec<u8>,
}

/// Where a saved image ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAsset {
    /// Library identifier (a path for file-backed libraries).
    pub id: String,
    /// Album the asset was added to, if any.
    pub album: Option<String>,
}

/// Rendering surface able to rasterize a frame.
#[async_trait]
pub trait CanvasCapture: Send + Sync {
    /// Rasterize `frame`.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::CaptureFailed`] if no raster could be produced.
    async fn capture(&self, frame: &CanvasFrame) -> MemeResult<CapturedImage>;
}

/// Platform photo library.
#[async_trait]
pub trait MediaLibrary: Send + Sync {
    /// Ask for write access.
    async fn request_permission(&self) -> PermissionStatus;

    /// Persist `image`, adding it to `album` when given.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::SaveFailed`] if the image could not be stored.
    async fn save_image(&self, image: &CapturedImage, album: Option<&str>)
        -> MemeResult<SavedAsset>;
}

/// A title and body to show in an alert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMessage {
    /// Alert title.
    pub title: String,
    /// Alert body.
    pub body: String,
}

impl UserMessage {
    fn new(title: &str, body: &str) -> Self {
        Self {
            title: title.to_string(),
            body: body.to_string(),
        }
    }

    /// Shown after a successful export.
    #[must_use]
    pub fn success() -> Self {
        Self::new("Success!", "Your meme has been saved to your photo library.")
    }

    /// Shown when photo library access is refused.
    #[must_use]
    pub fn permission_required() -> Self {
        Self::new(
            "Permission Required",
            "Please allow access to your photo library to save memes.",
        )
    }

    /// Shown when capture or save fails.
    #[must_use]
    pub fn export_failed() -> Self {
        Self::new("Export Failed", "Could not save your meme. Please try again.")
    }
}

impl ExportError {
    /// The alert for this failure.
    #[must_use]
    pub fn user_message(&self) -> UserMessage {
        match self {
            Self::PermissionDenied => UserMessage::permission_required(),
            Self::CaptureFailed(_) | Self::SaveFailed(_) => UserMessage::export_failed(),
        }
    }
}

/// Result of an export request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    /// The image was saved.
    Saved(SavedAsset),
    /// The export failed; the editor state has been restored.
    Failed(ExportError),
    /// Another export was already running.
    Skipped,
}

impl ExportOutcome {
    /// Whether the image was saved.
    #[must_use]
    pub const fn is_saved(&self) -> bool {
        matches!(self, Self::Saved(_))
    }

    /// The alert to show, if any.
    #[must_use]
    pub fn user_message(&self) -> Option<UserMessage> {
        match self {
            Self::Saved(_) => Some(UserMessage::success()),
            Self::Failed(err) => Some(err.user_message()),
            Self::Skipped => None,
        }
    }
}

/// Clears the in-flight flag when dropped, whatever path the export took.
struct ExportGuard<'a>(&'a AtomicBool);

impl<'a> ExportGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ExportGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives the export flow against a rendering surface and a photo library.
#[derive(Debug)]
pub struct ExportCoordinator<C, L> {
    capture: C,
    library: L,
    config: ExportConfig,
    exporting: AtomicBool,
}

impl<C: CanvasCapture, L: MediaLibrary> ExportCoordinator<C, L> {
    /// Create a coordinator with default settings.
    #[must_use]
    pub fn new(capture: C, library: L) -> Self {
        Self::with_config(capture, library, ExportConfig::default())
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(capture: C, library: L, config: ExportConfig) -> Self {
        Self {
            capture,
            library,
            config,
            exporting: AtomicBool::new(false),
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// The rendering surface.
    #[must_use]
    pub const fn capture(&self) -> &C {
        &self.capture
    }

    /// The photo library.
    #[must_use]
    pub const fn library(&self) -> &L {
        &self.library
    }

    /// Whether an export is in flight.
    #[must_use]
    pub fn is_exporting(&self) -> bool {
        self.exporting.load(Ordering::Acquire)
    }

    /// Export the editor's canvas.
    ///
    /// The selection and canvas transform are restored before returning on
    /// every path, and failures are reported in the outcome rather than
    /// propagated.
    pub async fn export(&self, editor: &mut MemeEditor) -> ExportOutcome {
        let Some(_guard) = ExportGuard::acquire(&self.exporting) else {
            tracing::debug!("Export already in progress");
            return ExportOutcome::Skipped;
        };
        tracing::info!("Export started");

        if self.library.request_permission().await != PermissionStatus::Granted {
            tracing::warn!("Export aborted: photo library permission denied");
            return ExportOutcome::Failed(ExportError::PermissionDenied);
        }

        let selection = editor.selection().current().cloned();
        let transform = editor.transform().committed();
        editor.clear_selection();
        if self.config.reset_transform {
            editor.transform_mut().set_immediate(CanvasTransform::IDENTITY);
        }

        let result = self.capture_and_save(editor).await;

        editor.selection_mut().restore(selection);
        if self.config.reset_transform {
            editor.transform_mut().set_immediate(transform);
        }

        match result {
            Ok(asset) => {
                tracing::info!("Meme saved as {}", asset.id);
                ExportOutcome::Saved(asset)
            }
            Err(e) => {
                tracing::error!("Export failed: {e}");
                ExportOutcome::Failed(e)
            }
        }
    }

    async fn capture_and_save(&self, editor: &MemeEditor) -> Result<SavedAsset, ExportError> {
        if self.config.settle_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.settle_delay_ms)).await;
        }

        let frame = editor.frame();
        let image = self
            .capture
            .capture(&frame)
            .await
            .map_err(|e| ExportError::CaptureFailed(failure_detail(e)))?;
        tracing::debug!("Captured {}x{} canvas", image.width, image.height);

        self.library
            .save_image(&image, self.config.album.as_deref())
            .await
            .map_err(|e| ExportError::SaveFailed(failure_detail(e)))
    }
}

fn failure_detail(err: MemeError) -> String {
    match err {
        MemeError::CaptureFailed(msg) | MemeError::SaveFailed(msg) => msg,
        other => other.to_string(),
    }
}
