//! Error types for editor operations.

use thiserror::Error;

/// Result type for editor operations.
pub type MemeResult<T> = Result<T, MemeError>;

/// Errors that can occur in editor operations.
#[derive(Debug, Error)]
pub enum MemeError {
    /// Element not found in the store.
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// An element with this ID already exists in the layer.
    #[error("Duplicate element: {0}")]
    DuplicateElement(String),

    /// Operation that does not apply to the current editor state.
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// The host platform refused access to the photo library.
    #[error("Media library permission denied")]
    PermissionDenied,

    /// The rendering surface could not produce a raster of the canvas.
    #[error("Canvas capture failed: {0}")]
    CaptureFailed(String),

    /// The platform could not persist the captured image.
    #[error("Saving image failed: {0}")]
    SaveFailed(String),

    /// Crop rectangle outside the unit square.
    #[error("Invalid crop rectangle: {0}")]
    InvalidCrop(String),

    /// Configuration values that cannot work together.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl MemeError {
    /// Whether this error comes from the host platform during export.
    #[must_use]
    pub const fn is_export_failure(&self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::CaptureFailed(_) | Self::SaveFailed(_)
        )
    }
}

/// Failures surfaced to the user by the export flow.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExportError {
    /// Photo library access was refused.
    #[error("Media library permission denied")]
    PermissionDenied,

    /// The canvas could not be rasterized.
    #[error("Canvas capture failed: {0}")]
    CaptureFailed(String),

    /// The raster could not be saved.
    #[error("Saving image failed: {0}")]
    SaveFailed(String),
}

impl From<ExportError> for MemeError {
    fn from(err: ExportError) -> Self {
        match err {
            ExportError::PermissionDenied => Self::PermissionDenied,
            ExportError::CaptureFailed(msg) => Self::CaptureFailed(msg),
            ExportError::SaveFailed(msg) => Self::SaveFailed(msg),
        }
    }
}
