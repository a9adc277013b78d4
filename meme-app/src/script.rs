//! Editor scripts.
//!
//! A script is a JSON document listing editor steps in order:
//!
//! ```json
//! { "steps": [
//!     { "op": "add_text", "id": "top", "text": "one does not simply", "x": 20, "y": 40 },
//!     { "op": "move", "target": { "layer": "text", "id": "top" }, "dx": 0, "dy": 30 },
//!     { "op": "wait", "ms": 5000 },
//!     { "op": "export" }
//! ] }
//! ```
//!
//! Time is simulated: the runner owns a [`ManualClock`] that `wait` and the
//! gesture frames advance, so debounce windows behave as on a device without
//! the run taking that long.

use std::path::Path;
use std::sync::Arc;

use meme_core::{
    CanvasCapture, Clock, Dimensions, EditorConfig, ElementId, ElementRef, ElementSnapshot,
    ExportCoordinator, ExportOutcome, GestureState, ImageElement, ManualClock, MediaLibrary,
    MemeEditor, PanEvent, PinchEvent, ResizeHandle, SystemClock, TapEvent, TextElement,
    TextStyle,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Simulated time between two gesture updates.
const FRAME_MS: u64 = 16;

/// Script loading and replay errors.
#[derive(Debug, Error)]
pub enum ScriptError {
    /// The script file could not be read.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The script is not valid JSON for [`Script`].
    #[error("Invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    /// A step adds an element under an id that is already taken.
    #[error("Step {step}: element {id} already exists")]
    DuplicateElement {
        /// Zero-based step index.
        step: usize,
        /// The duplicated identifier.
        id: String,
    },

    /// A step names an element that does not exist.
    #[error("Step {step}: unknown element {id}")]
    UnknownElement {
        /// Zero-based step index.
        step: usize,
        /// The missing identifier.
        id: String,
    },
}

/// A sequence of editor steps.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Script {
    /// Steps in execution order.
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse a script from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON does not describe a script.
    pub fn from_json(json: &str) -> Result<Self, ScriptError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Read and parse a script file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self, ScriptError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }
}

const fn one() -> f32 {
    1.0
}

const fn default_frames() -> u32 {
    10
}

/// One editor command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    /// Add a text overlay.
    AddText {
        /// Identifier to use; generated when absent.
        #[serde(default)]
        id: Option<String>,
        /// Text content.
        text: String,
        /// X position.
        #[serde(default)]
        x: Option<f32>,
        /// Y position.
        #[serde(default)]
        y: Option<f32>,
        /// Style; the default meme style when absent.
        #[serde(default)]
        style: Option<TextStyle>,
    },
    /// Add an image overlay.
    AddImage {
        /// Identifier to use; generated when absent.
        #[serde(default)]
        id: Option<String>,
        /// Image URI.
        uri: String,
        /// Source width in pixels.
        width: f32,
        /// Source height in pixels.
        height: f32,
        /// X position.
        #[serde(default)]
        x: f32,
        /// Y position.
        #[serde(default)]
        y: f32,
    },
    /// Select a text overlay, or clear the text selection.
    SelectText {
        /// Element to select.
        #[serde(default)]
        id: Option<String>,
    },
    /// Select an image overlay, or clear the image selection.
    SelectImage {
        /// Element to select.
        #[serde(default)]
        id: Option<String>,
    },
    /// Clear the selection.
    ClearSelection,
    /// Drag an element.
    Move {
        /// Element to drag.
        target: ElementRef,
        /// Total horizontal movement.
        dx: f32,
        /// Total vertical movement.
        dy: f32,
        /// Gesture updates between start and end.
        #[serde(default = "default_frames")]
        frames: u32,
    },
    /// Drag a resize handle of an image.
    Resize {
        /// Image to resize.
        id: String,
        /// Handle being dragged.
        handle: ResizeHandle,
        /// Total horizontal movement.
        dx: f32,
        /// Total vertical movement.
        dy: f32,
    },
    /// Delete the selected element.
    DeleteSelected,
    /// Duplicate the selected element.
    DuplicateSelected,
    /// Restyle a text overlay.
    StyleText {
        /// Text to restyle.
        id: String,
        /// New style.
        style: TextStyle,
    },
    /// Change an image's opacity.
    OpacityImage {
        /// Image to change.
        id: String,
        /// New opacity.
        opacity: f32,
    },
    /// Adjust an image's crop with preview gestures.
    CropImage {
        /// Image to crop.
        id: String,
        /// Pinch scale applied first.
        #[serde(default = "one")]
        scale: f32,
        /// Horizontal preview pan applied second.
        #[serde(default)]
        dx: f32,
        /// Vertical preview pan applied second.
        #[serde(default)]
        dy: f32,
    },
    /// Pan the canvas view.
    PanCanvas {
        /// Horizontal movement.
        dx: f32,
        /// Vertical movement.
        dy: f32,
    },
    /// Pinch the canvas view.
    PinchCanvas {
        /// Scale ratio.
        scale: f32,
    },
    /// Double tap the canvas view.
    DoubleTap,
    /// Zoom-in button.
    ZoomIn,
    /// Zoom-out button.
    ZoomOut,
    /// Reset-zoom button.
    ResetZoom,
    /// Undo button.
    Undo,
    /// Redo button.
    Redo,
    /// Let time pass, running any due idle save.
    Wait {
        /// Milliseconds to advance.
        ms: u64,
    },
    /// Export the canvas.
    Export,
}

/// What a script run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    /// Steps executed.
    pub steps: usize,
    /// Result of each export, in order.
    pub exports: Vec<ExportOutcome>,
    /// Final elements.
    pub elements: ElementSnapshot,
    /// Final undo stack depth.
    pub undo_depth: usize,
}

/// Replays scripts against an editor.
#[derive(Debug)]
pub struct ScriptRunner<C, L> {
    editor: MemeEditor,
    clock: ManualClock,
    coordinator: ExportCoordinator<C, L>,
    steps: usize,
    exports: Vec<ExportOutcome>,
}

impl<C: CanvasCapture, L: MediaLibrary> ScriptRunner<C, L> {
    /// Create a runner with a fresh editor whose clock starts at the
    /// current wall-clock time.
    #[must_use]
    pub fn new(config: EditorConfig, capture: C, library: L) -> Self {
        let clock = ManualClock::new(SystemClock.now_ms());
        let coordinator = ExportCoordinator::with_config(capture, library, config.export.clone());
        let editor = MemeEditor::with_config(config, Arc::new(clock.clone()));
        Self {
            editor,
            clock,
            coordinator,
            steps: 0,
            exports: Vec::new(),
        }
    }

    /// The editor being driven.
    #[must_use]
    pub const fn editor(&self) -> &MemeEditor {
        &self.editor
    }

    /// The simulated clock.
    #[must_use]
    pub const fn clock(&self) -> &ManualClock {
        &self.clock
    }

    /// The export coordinator.
    #[must_use]
    pub const fn coordinator(&self) -> &ExportCoordinator<C, L> {
        &self.coordinator
    }

    /// Run every step of `script`.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::UnknownElement`] when a step names an element
    /// that does not exist, or [`ScriptError::DuplicateElement`] when a step
    /// adds an element under a taken id; earlier steps stay applied.
    pub async fn run(&mut self, script: &Script) -> Result<(), ScriptError> {
        for step in &script.steps {
            self.apply(step).await?;
        }
        Ok(())
    }

    /// Run one step.
    ///
    /// # Errors
    ///
    /// Returns [`ScriptError::UnknownElement`] when the step names an element
    /// that does not exist, or [`ScriptError::DuplicateElement`] when it adds
    /// an element under a taken id.
    pub async fn apply(&mut self, step: &Step) -> Result<(), ScriptError> {
        let index = self.steps;
        tracing::debug!("Step {index}: {step:?}");
        match step {
            Step::AddText { id, text, x, y, style } => {
                let mut element = TextElement::new(text.clone());
                if let Some(id) = id {
                    element = element.with_id(id.as_str());
                }
                element.x = *x;
                element.y = *y;
                if let Some(style) = style {
                    element = element.with_style(style.clone());
                }
                let id = element.id.to_string();
                if self.editor.add_text(element).is_none() {
                    return Err(ScriptError::DuplicateElement { step: index, id });
                }
            }
            Step::AddImage { id, uri, width, height, x, y } => {
                let mut element =
                    ImageElement::new(uri.clone(), Dimensions::new(*width, *height), (*x, *y));
                if let Some(id) = id {
                    element = element.with_id(id.as_str());
                }
                let id = element.id.to_string();
                if self.editor.add_image(element).is_none() {
                    return Err(ScriptError::DuplicateElement { step: index, id });
                }
            }
            Step::SelectText { id } => {
                let id = id.as_deref().map(|id| self.text_id(index, id)).transpose()?;
                self.editor.select_text(id);
            }
            Step::SelectImage { id } => {
                let id = id.as_deref().map(|id| self.image_id(index, id)).transpose()?;
                self.editor.select_image(id);
            }
            Step::ClearSelection => self.editor.clear_selection(),
            Step::Move { target, dx, dy, frames } => {
                if !self.editor.store().contains(target) {
                    return Err(unknown(index, target.id().as_str()));
                }
                self.drag(*dx, *dy, *frames, |editor, event| {
                    editor.on_element_pan(target, event);
                });
            }
            Step::Resize { id, handle, dx, dy } => {
                let id = self.image_id(index, id)?;
                let handle = *handle;
                self.drag(*dx, *dy, default_frames(), |editor, event| {
                    editor.on_resize_handle(&id, handle, event);
                });
            }
            Step::DeleteSelected => {
                self.editor.delete_selected();
            }
            Step::DuplicateSelected => {
                self.editor.duplicate_selected();
            }
            Step::StyleText { id, style } => {
                let id = self.text_id(index, id)?;
                self.editor.set_text_style(&id, style.clone());
            }
            Step::OpacityImage { id, opacity } => {
                let id = self.image_id(index, id)?;
                self.editor.set_image_opacity(&id, *opacity);
            }
            Step::CropImage { id, scale, dx, dy } => {
                let id = self.image_id(index, id)?;
                if (*scale - 1.0).abs() > f32::EPSILON {
                    self.editor.pinch_image_crop(&id, *scale);
                }
                if dx.abs() > f32::EPSILON || dy.abs() > f32::EPSILON {
                    self.editor.pan_image_crop(&id, *dx, *dy);
                }
            }
            Step::PanCanvas { dx, dy } => {
                self.editor
                    .on_canvas_pan(&PanEvent::new(GestureState::Began, 0.0, 0.0));
                self.editor
                    .on_canvas_pan(&PanEvent::new(GestureState::Active, *dx, *dy));
                self.editor
                    .on_canvas_pan(&PanEvent::new(GestureState::End, *dx, *dy));
            }
            Step::PinchCanvas { scale } => {
                self.editor
                    .on_canvas_pinch(&PinchEvent::new(GestureState::Began, 1.0));
                self.editor
                    .on_canvas_pinch(&PinchEvent::new(GestureState::Active, *scale));
                self.editor
                    .on_canvas_pinch(&PinchEvent::new(GestureState::End, *scale));
            }
            Step::DoubleTap => self.editor.on_canvas_double_tap(&TapEvent {
                state: GestureState::Active,
            }),
            Step::ZoomIn => self.editor.zoom_in(),
            Step::ZoomOut => self.editor.zoom_out(),
            Step::ResetZoom => self.editor.reset_zoom(),
            Step::Undo => {
                self.editor.undo();
            }
            Step::Redo => {
                self.editor.redo();
            }
            Step::Wait { ms } => {
                self.clock.advance(*ms);
                if let Some(outcome) = self.editor.tick() {
                    tracing::debug!("Idle save: {outcome:?}");
                }
            }
            Step::Export => self.export().await,
        }
        self.steps += 1;
        Ok(())
    }

    /// Export the canvas now, recording the outcome.
    pub async fn export(&mut self) {
        let outcome = self.coordinator.export(&mut self.editor).await;
        if let Some(message) = outcome.user_message() {
            tracing::info!("{}: {}", message.title, message.body);
        }
        self.exports.push(outcome);
    }

    /// Finish, returning what the run produced.
    #[must_use]
    pub fn into_report(self) -> RunReport {
        RunReport {
            steps: self.steps,
            exports: self.exports,
            elements: self.editor.snapshot(),
            undo_depth: self.editor.history().undo_len(),
        }
    }

    /// Feed a began/active.../end gesture moving by `(dx, dy)` in `frames`
    /// equal updates, advancing the clock one frame per update.
    fn drag<F>(&mut self, dx: f32, dy: f32, frames: u32, mut send: F)
    where
        F: FnMut(&mut MemeEditor, &PanEvent),
    {
        let frames = frames.max(1);
        send(&mut self.editor, &PanEvent::new(GestureState::Began, 0.0, 0.0));
        for frame in 1..=frames {
            self.clock.advance(FRAME_MS);
            #[allow(clippy::cast_precision_loss)]
            let t = frame as f32 / frames as f32;
            send(
                &mut self.editor,
                &PanEvent::new(GestureState::Active, dx * t, dy * t),
            );
        }
        send(&mut self.editor, &PanEvent::new(GestureState::End, dx, dy));
    }

    fn text_id(&self, step: usize, id: &str) -> Result<ElementId, ScriptError> {
        let id = ElementId::from(id);
        if self.editor.store().texts.contains(&id) {
            Ok(id)
        } else {
            Err(unknown(step, id.as_str()))
        }
    }

    fn image_id(&self, step: usize, id: &str) -> Result<ElementId, ScriptError> {
        let id = ElementId::from(id);
        if self.editor.store().images.contains(&id) {
            Ok(id)
        } else {
            Err(unknown(step, id.as_str()))
        }
    }
}

fn unknown(step: usize, id: &str) -> ScriptError {
    ScriptError::UnknownElement {
        step,
        id: id.to_string(),
    }
}
