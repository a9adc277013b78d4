//! # Meme Core
//!
//! Editor state machine for composing memes: text and image overlays on a
//! pannable, zoomable canvas with undo/redo and export to a photo library.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 MemeEditor                  │
//! ├─────────────────────────────────────────────┤
//! │  Element Store   │  Selection               │
//! │  - Image layer   │  - One text or one image │
//! │  - Text layer    │                          │
//! ├─────────────────────────────────────────────┤
//! │  History         │  Transform Controller    │
//! │  - Undo / redo   │  - Pan / pinch           │
//! │  - Idle save     │  - Animated zoom         │
//! └─────────────────────────────────────────────┘
//!                       │ CanvasFrame
//!                       ▼
//!              ExportCoordinator ──► CanvasCapture / MediaLibrary
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod config;
pub mod editor;
pub mod element;
pub mod error;
pub mod event;
pub mod export;
pub mod history;
pub mod selection;
pub mod store;
pub mod timer;
pub mod transform;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EditorConfig, ElementConfig, ExportConfig, HistoryConfig, TransformConfig};
pub use editor::{CanvasFrame, EditorModal, MemeEditor};
pub use element::{
    CropRect, Dimensions, ElementId, FontWeight, ImageElement, ImagePatch, Overlay, ResizeHandle,
    TextAlign, TextDecoration, TextElement, TextPatch, TextStyle, TextTransform,
};
pub use error::{ExportError, MemeError, MemeResult};
pub use event::{GestureState, PanEvent, PinchEvent, TapEvent};
pub use export::{
    CanvasCapture, CapturedImage, ExportCoordinator, ExportOutcome, MediaLibrary,
    PermissionStatus, SavedAsset, UserMessage,
};
pub use history::{History, HistoryAction, HistoryEntry, SaveOutcome};
pub use selection::Selection;
pub use store::{ElementRef, ElementSnapshot, ElementStore, Layer};
pub use timer::IdleTimer;
pub use transform::{CanvasTransform, TransformController};

/// Meme core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
