//! Editor session.
//!
//! [`MemeEditor`] ties the element store, selection, canvas transform and
//! history together the way the editor screen uses them: every discrete
//! action records the state *before* it is applied, continuous gestures are
//! drag-bracketed, and every element change re-arms the idle auto-save.
//!
//! Operations that do not apply to the current state (undo with an empty
//! stack, delete with nothing selected, updates to unknown elements) are
//! logged and ignored.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::clock::{Clock, SystemClock};
use crate::config::EditorConfig;
use crate::element::{
    CropRect, ElementId, ImageElement, ImagePatch, ResizeHandle, TextElement, TextPatch,
    TextStyle,
};
use crate::event::{GestureState, PanEvent, PinchEvent, TapEvent};
use crate::history::{History, HistoryAction, SaveOutcome};
use crate::selection::Selection;
use crate::store::{ElementRef, ElementSnapshot, ElementStore};
use crate::transform::{CanvasTransform, TransformController};

/// Which sub-editor, if any, is open.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum EditorModal {
    /// No sub-editor open.
    #[default]
    Closed,
    /// Text editor, creating a new element or editing `editing`.
    Text {
        /// Element being edited, `None` when creating.
        editing: Option<ElementId>,
    },
    /// Image editor, creating a new element or editing `editing`.
    Image {
        /// Element being edited, `None` when creating.
        editing: Option<ElementId>,
    },
}

/// Everything the rendering surface needs to draw one frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasFrame {
    /// Both layers in drawing order.
    pub elements: ElementSnapshot,
    /// View transform to apply.
    pub transform: CanvasTransform,
    /// Element to decorate with a selection border.
    pub selected: Option<ElementRef>,
}

#[derive(Debug, Clone)]
enum DragKind {
    Move { origin: (f32, f32) },
    Resize { handle: ResizeHandle, start: ImageElement },
}

#[derive(Debug, Clone)]
struct DragSession {
    target: ElementRef,
    kind: DragKind,
}

/// An in-memory meme editing session.
#[derive(Debug)]
pub struct MemeEditor {
    config: EditorConfig,
    clock: Arc<dyn Clock>,
    store: ElementStore,
    selection: Selection,
    transform: TransformController,
    history: History,
    modal: EditorModal,
    drag: Option<DragSession>,
}

impl Default for MemeEditor {
    fn default() -> Self {
        Self::new()
    }
}

impl MemeEditor {
    /// Create an empty editor on the system clock with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(EditorConfig::default(), Arc::new(SystemClock))
    }

    /// Create with custom configuration and time source.
    #[must_use]
    pub fn with_config(config: EditorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            transform: TransformController::with_config(config.transform.clone()),
            history: History::with_config(config.history.clone(), Arc::clone(&clock)),
            config,
            clock,
            store: ElementStore::new(),
            selection: Selection::new(),
            modal: EditorModal::Closed,
            drag: None,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// Current time on the editor's clock.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.clock.now_ms()
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// The element store.
    #[must_use]
    pub const fn store(&self) -> &ElementStore {
        &self.store
    }

    /// Text overlays in drawing order.
    #[must_use]
    pub fn text_elements(&self) -> &[TextElement] {
        self.store.texts.as_slice()
    }

    /// Image overlays in drawing order.
    #[must_use]
    pub fn image_elements(&self) -> &[ImageElement] {
        self.store.images.as_slice()
    }

    /// Deep copy of both layers.
    #[must_use]
    pub fn snapshot(&self) -> ElementSnapshot {
        self.store.snapshot()
    }

    /// The selection.
    #[must_use]
    pub const fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Mutable access to the selection.
    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    /// The canvas transform controller.
    #[must_use]
    pub const fn transform(&self) -> &TransformController {
        &self.transform
    }

    /// Mutable access to the canvas transform controller.
    pub fn transform_mut(&mut self) -> &mut TransformController {
        &mut self.transform
    }

    /// The history.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// The open sub-editor.
    #[must_use]
    pub const fn modal(&self) -> &EditorModal {
        &self.modal
    }

    /// Whether the undo button should be enabled.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    /// Whether the redo button should be enabled.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// What to draw at the current time.
    #[must_use]
    pub fn frame(&self) -> CanvasFrame {
        CanvasFrame {
            elements: self.store.snapshot(),
            transform: self.transform.displayed(self.clock.now_ms()),
            selected: self.selection.current().cloned(),
        }
    }

    // ------------------------------------------------------------------
    // History plumbing
    // ------------------------------------------------------------------

    /// Record the current state under `action`.
    pub fn save_state_for_action(&mut self, action: HistoryAction) -> SaveOutcome {
        let snapshot = self.store.snapshot();
        self.history.save_state(action, &snapshot)
    }

    fn changed(&mut self) {
        self.history.notify_change();
    }

    /// Drive time-based work: fires the idle auto-save when due.
    pub fn tick(&mut self) -> Option<SaveOutcome> {
        let snapshot = self.store.snapshot();
        self.history.poll_auto_save(&snapshot)
    }

    /// Step back one history entry. Clears the selection.
    pub fn undo(&mut self) -> bool {
        let current = self.store.snapshot();
        let Some(previous) = self.history.undo(&current) else {
            tracing::debug!("Nothing to undo");
            return false;
        };
        self.apply_restore(previous);
        true
    }

    /// Step forward one history entry. Clears the selection.
    pub fn redo(&mut self) -> bool {
        let current = self.store.snapshot();
        let Some(next) = self.history.redo(&current) else {
            tracing::debug!("Nothing to redo");
            return false;
        };
        self.apply_restore(next);
        true
    }

    fn apply_restore(&mut self, snapshot: ElementSnapshot) {
        if let Some(session) = self.drag.take() {
            tracing::debug!("Restore interrupted drag on {}", session.target);
        }
        self.history.cancel_drag();
        self.store.restore(snapshot);
        self.selection.clear();
        self.history.cancel_auto_save();
        self.history.finish_restore();
    }

    // ------------------------------------------------------------------
    // Text elements
    // ------------------------------------------------------------------

    /// Add a text overlay on top. Returns `None`, recording nothing, when
    /// a text overlay with the same id already exists.
    pub fn add_text(&mut self, element: TextElement) -> Option<ElementId> {
        if self.store.texts.contains(&element.id) {
            tracing::warn!("Ignoring add of duplicate text {}", element.id);
            return None;
        }
        self.save_state_for_action(HistoryAction::AddText);
        let id = self.store.texts.add(element).ok()?;
        tracing::debug!("Added text element {id}");
        self.changed();
        Some(id)
    }

    /// Replace a text overlay's content, keeping its id and position.
    pub fn edit_text(&mut self, id: &ElementId, element: TextElement) -> bool {
        if !self.store.texts.contains(id) {
            tracing::debug!("Ignoring edit of unknown text {id}");
            return false;
        }
        self.save_state_for_action(HistoryAction::EditText);
        let default_position = self.config.elements.default_position;
        let replaced = self.store.texts.replace(id, element, default_position).is_ok();
        self.changed();
        replaced
    }

    /// Apply a partial update to a text overlay without recording history.
    pub fn update_text(&mut self, id: &ElementId, patch: TextPatch) -> bool {
        match self.store.texts.update(id, patch) {
            Ok(()) => {
                self.changed();
                true
            }
            Err(e) => {
                tracing::debug!("Ignoring text update: {e}");
                false
            }
        }
    }

    /// Change a text overlay's style.
    pub fn set_text_style(&mut self, id: &ElementId, style: TextStyle) -> bool {
        if !self.store.texts.contains(id) {
            return false;
        }
        self.save_state_for_action(HistoryAction::StyleText);
        self.update_text(
            id,
            TextPatch {
                style: Some(style),
                ..TextPatch::default()
            },
        )
    }

    /// Delete the selected text overlay.
    pub fn delete_selected_text(&mut self) -> bool {
        let Some(id) = self.selection.selected_text_id().cloned() else {
            tracing::debug!("No text selected to delete");
            return false;
        };
        self.save_state_for_action(HistoryAction::DeleteText);
        self.store.texts.remove(&id);
        self.selection.select_text(None);
        self.changed();
        true
    }

    /// Duplicate the selected text overlay and select the copy.
    pub fn duplicate_selected_text(&mut self) -> Option<ElementId> {
        let id = self.selection.selected_text_id().cloned()?;
        if !self.store.texts.contains(&id) {
            return None;
        }
        self.save_state_for_action(HistoryAction::DuplicateText);
        let elements = &self.config.elements;
        let copy = self
            .store
            .texts
            .duplicate(&id, elements.duplicate_offset, elements.default_position)?;
        tracing::debug!("Duplicated text {id} as {copy}");
        self.selection.select_text(Some(copy.clone()));
        self.changed();
        Some(copy)
    }

    // ------------------------------------------------------------------
    // Image elements
    // ------------------------------------------------------------------

    /// Add an image overlay above the existing images. An invalid crop is
    /// replaced by the full image. Returns `None`, recording nothing, when
    /// an image overlay with the same id already exists.
    pub fn add_image(&mut self, element: ImageElement) -> Option<ElementId> {
        if self.store.images.contains(&element.id) {
            tracing::warn!("Ignoring add of duplicate image {}", element.id);
            return None;
        }
        self.save_state_for_action(HistoryAction::AddImage);
        let id = self.store.images.add(element.normalized()).ok()?;
        tracing::debug!("Added image element {id}");
        self.changed();
        Some(id)
    }

    /// Replace an image overlay's content, keeping its id and position. An
    /// invalid crop is replaced by the full image.
    pub fn edit_image(&mut self, id: &ElementId, element: ImageElement) -> bool {
        if !self.store.images.contains(id) {
            tracing::debug!("Ignoring edit of unknown image {id}");
            return false;
        }
        self.save_state_for_action(HistoryAction::EditImage);
        let default_position = self.config.elements.default_position;
        let replaced = self
            .store
            .images
            .replace(id, element.normalized(), default_position)
            .is_ok();
        self.changed();
        replaced
    }

    /// Apply a partial update to an image overlay without recording history.
    pub fn update_image(&mut self, id: &ElementId, patch: ImagePatch) -> bool {
        match self.store.images.update(id, patch) {
            Ok(()) => {
                self.changed();
                true
            }
            Err(e) => {
                tracing::debug!("Ignoring image update: {e}");
                false
            }
        }
    }

    /// Change an image overlay's opacity (clamped to `0..=1`).
    pub fn set_image_opacity(&mut self, id: &ElementId, opacity: f32) -> bool {
        if !self.store.images.contains(id) {
            return false;
        }
        self.save_state_for_action(HistoryAction::OpacityImage);
        self.update_image(
            id,
            ImagePatch {
                opacity: Some(opacity),
                ..ImagePatch::default()
            },
        )
    }

    /// Change an image overlay's crop. Invalid rectangles are ignored.
    pub fn set_image_crop(&mut self, id: &ElementId, crop: CropRect) -> bool {
        if !self.store.images.contains(id) {
            return false;
        }
        if let Err(e) = crop.validate() {
            tracing::debug!("Ignoring crop for {id}: {e}");
            return false;
        }
        self.save_state_for_action(HistoryAction::CropImage);
        self.update_image(
            id,
            ImagePatch {
                crop: Some(crop),
                ..ImagePatch::default()
            },
        )
    }

    /// Drag an image's crop window by a pan over the crop preview.
    pub fn pan_image_crop(
        &mut self,
        id: &ElementId,
        translation_x: f32,
        translation_y: f32,
    ) -> bool {
        let Some(image) = self.store.images.find(id) else {
            return false;
        };
        let preview_size = self.config.elements.crop_preview_size;
        let crop = image.crop.panned(translation_x, translation_y, preview_size);
        self.set_image_crop(id, crop)
    }

    /// Zoom an image's crop window by a pinch over the crop preview.
    pub fn pinch_image_crop(&mut self, id: &ElementId, scale: f32) -> bool {
        let Some(image) = self.store.images.find(id) else {
            return false;
        };
        let crop = image.crop.pinched(scale, self.config.elements.min_crop_size);
        self.set_image_crop(id, crop)
    }

    /// Delete the selected image overlay.
    pub fn delete_selected_image(&mut self) -> bool {
        let Some(id) = self.selection.selected_image_id().cloned() else {
            tracing::debug!("No image selected to delete");
            return false;
        };
        self.save_state_for_action(HistoryAction::DeleteImage);
        self.store.images.remove(&id);
        self.selection.select_image(None);
        self.changed();
        true
    }

    /// Duplicate the selected image overlay and select the copy.
    pub fn duplicate_selected_image(&mut self) -> Option<ElementId> {
        let id = self.selection.selected_image_id().cloned()?;
        if !self.store.images.contains(&id) {
            return None;
        }
        self.save_state_for_action(HistoryAction::DuplicateImage);
        let elements = &self.config.elements;
        let copy = self
            .store
            .images
            .duplicate(&id, elements.duplicate_offset, elements.default_position)?;
        tracing::debug!("Duplicated image {id} as {copy}");
        self.selection.select_image(Some(copy.clone()));
        self.changed();
        Some(copy)
    }

    /// Delete whichever element is selected.
    pub fn delete_selected(&mut self) -> bool {
        match self.selection.current() {
            Some(ElementRef::Text(_)) => self.delete_selected_text(),
            Some(ElementRef::Image(_)) => self.delete_selected_image(),
            None => false,
        }
    }

    /// Duplicate whichever element is selected.
    pub fn duplicate_selected(&mut self) -> Option<ElementId> {
        match self.selection.current() {
            Some(ElementRef::Text(_)) => self.duplicate_selected_text(),
            Some(ElementRef::Image(_)) => self.duplicate_selected_image(),
            None => None,
        }
    }

    // ------------------------------------------------------------------
    // Selection
    // ------------------------------------------------------------------

    /// Select a text overlay, or clear the text selection.
    pub fn select_text(&mut self, id: Option<ElementId>) {
        self.selection.select_text(id);
    }

    /// Select an image overlay, or clear the image selection.
    pub fn select_image(&mut self, id: Option<ElementId>) {
        self.selection.select_image(id);
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // ------------------------------------------------------------------
    // Element gestures
    // ------------------------------------------------------------------

    /// Drag an element around the canvas.
    ///
    /// `Began` selects the element and opens a drag bracket; `Active` moves
    /// it to its start position plus the translation; `End`/`Cancelled`
    /// closes the bracket.
    pub fn on_element_pan(&mut self, target: &ElementRef, event: &PanEvent) {
        match event.state {
            GestureState::Began => {
                let default_position = self.config.elements.default_position;
                let Some(origin) = self.store.position_of(target, default_position) else {
                    tracing::debug!("Ignoring drag of unknown element {target}");
                    return;
                };
                self.selection.select(target.clone());
                self.begin_drag(DragSession {
                    target: target.clone(),
                    kind: DragKind::Move { origin },
                });
            }
            GestureState::Active => {
                let Some(DragSession {
                    target: dragged,
                    kind: DragKind::Move { origin },
                }) = &self.drag
                else {
                    return;
                };
                if dragged != target {
                    return;
                }
                let (x, y) = (origin.0 + event.translation_x, origin.1 + event.translation_y);
                let dragged = dragged.clone();
                if self.store.set_position(&dragged, x, y) {
                    self.changed();
                }
            }
            GestureState::End | GestureState::Cancelled => self.end_drag(),
        }
    }

    /// Resize an image overlay with one of its corner handles.
    pub fn on_resize_handle(&mut self, id: &ElementId, handle: ResizeHandle, event: &PanEvent) {
        match event.state {
            GestureState::Began => {
                let Some(start) = self.store.images.find(id).cloned() else {
                    tracing::debug!("Ignoring resize of unknown image {id}");
                    return;
                };
                self.begin_drag(DragSession {
                    target: ElementRef::Image(id.clone()),
                    kind: DragKind::Resize { handle, start },
                });
            }
            GestureState::Active => {
                let Some(DragSession {
                    kind: DragKind::Resize { handle, start },
                    ..
                }) = &self.drag
                else {
                    return;
                };
                if start.id != *id {
                    return;
                }
                let resized = start.resized(
                    *handle,
                    event.translation_x,
                    event.translation_y,
                    &self.config.elements,
                );
                if let Some(image) = self.store.images.find_mut(id) {
                    *image = resized;
                    self.changed();
                }
            }
            GestureState::End | GestureState::Cancelled => self.end_drag(),
        }
    }

    fn begin_drag(&mut self, session: DragSession) {
        let snapshot = self.store.snapshot();
        self.history.drag_start(&snapshot);
        tracing::debug!("Drag began on {}", session.target);
        self.drag = Some(session);
    }

    fn end_drag(&mut self) {
        if self.drag.take().is_none() && !self.history.is_dragging() {
            return;
        }
        let snapshot = self.store.snapshot();
        self.history.drag_end(&snapshot);
    }

    // ------------------------------------------------------------------
    // Canvas gestures
    // ------------------------------------------------------------------

    /// Pan the canvas view.
    pub fn on_canvas_pan(&mut self, event: &PanEvent) {
        self.transform.on_pan(event);
    }

    /// Pinch-zoom the canvas view.
    pub fn on_canvas_pinch(&mut self, event: &PinchEvent) {
        self.transform.on_pinch(event);
    }

    /// Double tap on the canvas view.
    pub fn on_canvas_double_tap(&mut self, event: &TapEvent) {
        let now = self.clock.now_ms();
        self.transform.on_double_tap(event, now);
    }

    /// Zoom-in button.
    pub fn zoom_in(&mut self) {
        let now = self.clock.now_ms();
        self.transform.zoom_in(now);
    }

    /// Zoom-out button.
    pub fn zoom_out(&mut self) {
        let now = self.clock.now_ms();
        self.transform.zoom_out(now);
    }

    /// Reset-zoom button.
    pub fn reset_zoom(&mut self) {
        let now = self.clock.now_ms();
        self.transform.reset(now);
    }

    // ------------------------------------------------------------------
    // Sub-editors
    // ------------------------------------------------------------------

    /// Open the text editor, for the selected text when `edit_selected` is
    /// set and a text is selected, otherwise for a new element.
    pub fn open_text_editor(&mut self, edit_selected: bool) {
        let editing = if edit_selected {
            self.selection.selected_text_id().cloned()
        } else {
            None
        };
        self.selection.clear();
        self.modal = EditorModal::Text { editing };
    }

    /// Open the image editor, for the selected image when `edit_selected`
    /// is set and an image is selected, otherwise for a new element.
    pub fn open_image_editor(&mut self, edit_selected: bool) {
        let editing = if edit_selected {
            self.selection.selected_image_id().cloned()
        } else {
            None
        };
        self.selection.clear();
        self.modal = EditorModal::Image { editing };
    }

    /// Accept the text editor's result: edits the element it was opened for,
    /// or adds a new one. Returns the element's id, or `None` when the text
    /// editor was not open or the new element's id is taken.
    pub fn save_text_editor(&mut self, element: TextElement) -> Option<ElementId> {
        let EditorModal::Text { editing } = std::mem::take(&mut self.modal) else {
            tracing::debug!("Text editor is not open");
            return None;
        };
        match editing {
            Some(id) => {
                self.edit_text(&id, element);
                Some(id)
            }
            None => self.add_text(element),
        }
    }

    /// Accept the image editor's result: edits the element it was opened
    /// for, or adds a new one. Returns the element's id, or `None` when the
    /// image editor was not open or the new element's id is taken.
    pub fn save_image_editor(&mut self, element: ImageElement) -> Option<ElementId> {
        let EditorModal::Image { editing } = std::mem::take(&mut self.modal) else {
            tracing::debug!("Image editor is not open");
            return None;
        };
        match editing {
            Some(id) => {
                self.edit_image(&id, element);
                Some(id)
            }
            None => self.add_image(element),
        }
    }

    /// Close any sub-editor without changes.
    pub fn cancel_editor(&mut self) {
        self.modal = EditorModal::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::element::Dimensions;

    fn editor() -> (MemeEditor, ManualClock) {
        let clock = ManualClock::new(1_000_000);
        let editor = MemeEditor::with_config(EditorConfig::default(), Arc::new(clock.clone()));
        (editor, clock)
    }

    fn pan(state: GestureState, x: f32, y: f32) -> PanEvent {
        PanEvent::new(state, x, y)
    }

    #[test]
    fn test_duplicate_selected_text() {
        let (mut editor, _clock) = editor();
        editor.add_text(TextElement::new("A").with_id("1").with_position(50.0, 50.0));
        editor.select_text(Some("1".into()));

        let copy = editor.duplicate_selected_text().expect("should duplicate");
        assert_ne!(copy.as_str(), "1");
        assert_eq!(editor.text_elements().len(), 2);
        let duplicated = &editor.text_elements()[1];
        assert_eq!((duplicated.x, duplicated.y), (Some(70.0), Some(70.0)));
        assert_eq!(editor.selection().selected_text_id(), Some(&copy));
    }

    #[test]
    fn test_delete_then_undo() {
        let (mut editor, _clock) = editor();
        editor.store.texts.add(TextElement::new("A").with_id("1"));
        let before = editor.snapshot();
        editor.select_text(Some("1".into()));

        assert!(editor.delete_selected_text());
        assert!(editor.text_elements().is_empty());
        assert!(editor.selection().is_empty());

        assert!(editor.undo());
        assert_eq!(editor.snapshot(), before);
        assert!(editor.can_redo());
        assert!(!editor.history().is_restoring());
    }

    #[test]
    fn test_delete_without_selection_is_noop() {
        let (mut editor, _clock) = editor();
        editor.add_text(TextElement::new("A"));
        assert!(!editor.delete_selected());
        assert_eq!(editor.text_elements().len(), 1);
    }

    #[test]
    fn test_undo_clears_selection() {
        let (mut editor, _clock) = editor();
        let id = editor.add_text(TextElement::new("A")).expect("should add");
        editor.select_text(Some(id));
        assert!(editor.undo());
        assert!(editor.selection().is_empty());
        assert!(editor.text_elements().is_empty());
    }

    #[test]
    fn test_element_drag_is_one_history_step() {
        let (mut editor, clock) = editor();
        let id = editor
            .add_text(TextElement::new("A").with_position(10.0, 10.0))
            .expect("should add");
        clock.advance(2000);
        let target = ElementRef::Text(id.clone());

        editor.on_element_pan(&target, &pan(GestureState::Began, 0.0, 0.0));
        assert!(editor.selection().is_selected(&target));
        for step in 1..=10 {
            #[allow(clippy::cast_precision_loss)]
            let d = step as f32;
            editor.on_element_pan(&target, &pan(GestureState::Active, d, d));
        }
        editor.on_element_pan(&target, &pan(GestureState::End, 10.0, 10.0));

        assert_eq!(editor.text_elements()[0].x, Some(20.0));
        let labels: Vec<String> = editor
            .history()
            .undo_entries()
            .map(|e| e.action.to_string())
            .collect();
        assert_eq!(labels, vec!["add_text", "move_start", "move_end"]);

        // move_end is the current state; one more undo returns to the start.
        assert!(editor.undo());
        assert!(editor.undo());
        assert_eq!(editor.text_elements()[0].x, Some(10.0));
    }

    #[test]
    fn test_undo_during_drag_keeps_redo() {
        let (mut editor, clock) = editor();
        let id = editor
            .add_text(TextElement::new("A").with_position(10.0, 10.0))
            .expect("should add");
        clock.advance(2000);
        let target = ElementRef::Text(id);

        editor.on_element_pan(&target, &pan(GestureState::Began, 0.0, 0.0));
        editor.on_element_pan(&target, &pan(GestureState::Active, 10.0, 10.0));
        assert!(editor.undo());
        assert!(!editor.history().is_dragging());

        editor.on_element_pan(&target, &pan(GestureState::Active, 20.0, 20.0));
        editor.on_element_pan(&target, &pan(GestureState::End, 20.0, 20.0));

        assert!(editor.can_redo());
        assert!(!editor.can_undo());
        assert!(editor.text_elements().is_empty());
        assert!(editor.redo());
        assert_eq!(editor.text_elements()[0].x, Some(20.0));
    }

    #[test]
    fn test_drag_unplaced_text_starts_from_default() {
        let (mut editor, _clock) = editor();
        let id = editor.add_text(TextElement::new("A")).expect("should add");
        let target = ElementRef::Text(id);
        editor.on_element_pan(&target, &pan(GestureState::Began, 0.0, 0.0));
        editor.on_element_pan(&target, &pan(GestureState::Active, 5.0, -5.0));
        editor.on_element_pan(&target, &pan(GestureState::Cancelled, 5.0, -5.0));
        let text = &editor.text_elements()[0];
        assert_eq!((text.x, text.y), (Some(55.0), Some(45.0)));
        assert!(!editor.history().is_dragging());
    }

    #[test]
    fn test_resize_handle() {
        let (mut editor, _clock) = editor();
        let id = editor
            .add_image(ImageElement::new("a.png", Dimensions::new(800.0, 800.0), (50.0, 50.0)))
            .expect("should add");
        let handle = ResizeHandle::BottomRight;
        editor.on_resize_handle(&id, handle, &pan(GestureState::Began, 0.0, 0.0));
        editor.on_resize_handle(&id, handle, &pan(GestureState::Active, 10.0, 10.0));
        editor.on_resize_handle(&id, handle, &pan(GestureState::Active, 20.0, 20.0));
        editor.on_resize_handle(&id, handle, &pan(GestureState::End, 20.0, 20.0));

        let image = &editor.image_elements()[0];
        assert_eq!(image.display_size(8.0), (120.0, 120.0));
        assert!(image.crop.is_valid());
    }

    #[test]
    fn test_idle_auto_save_after_changes() {
        let (mut editor, clock) = editor();
        editor.store.texts.add(TextElement::new("A").with_id("1"));
        editor.update_text(
            &"1".into(),
            TextPatch {
                text: Some("B".to_string()),
                ..TextPatch::default()
            },
        );
        clock.advance(4999);
        assert!(editor.tick().is_none());
        clock.advance(1);
        assert_eq!(editor.tick(), Some(SaveOutcome::Saved));
        assert_eq!(editor.history().undo_len(), 1);
    }

    #[test]
    fn test_sub_editor_add_and_edit() {
        let (mut editor, clock) = editor();
        editor.open_text_editor(false);
        let id = editor
            .save_text_editor(TextElement::new("first").with_position(5.0, 6.0))
            .expect("editor was open");
        assert_eq!(editor.modal(), &EditorModal::Closed);

        clock.advance(2000);
        editor.select_text(Some(id.clone()));
        editor.open_text_editor(true);
        assert!(editor.selection().is_empty());
        assert_eq!(editor.modal(), &EditorModal::Text { editing: Some(id.clone()) });
        editor.save_text_editor(TextElement::new("second"));

        let text = &editor.text_elements()[0];
        assert_eq!(text.id, id);
        assert_eq!(text.text, "second");
        assert_eq!((text.x, text.y), (Some(5.0), Some(6.0)));
        assert_eq!(editor.text_elements().len(), 1);
    }

    #[test]
    fn test_save_without_open_editor_is_noop() {
        let (mut editor, _clock) = editor();
        assert!(editor.save_text_editor(TextElement::new("x")).is_none());
        editor.open_image_editor(false);
        editor.cancel_editor();
        assert!(editor
            .save_image_editor(ImageElement::new("a.png", Dimensions::new(1.0, 1.0), (0.0, 0.0)))
            .is_none());
        assert!(editor.store().is_empty());
    }

    #[test]
    fn test_opacity_slider_is_coalesced() {
        let (mut editor, clock) = editor();
        let id = editor
            .add_image(ImageElement::new("a.png", Dimensions::new(10.0, 10.0), (0.0, 0.0)))
            .expect("should add");
        clock.advance(2000);
        for step in 0..10 {
            #[allow(clippy::cast_precision_loss)]
            editor.set_image_opacity(&id, 1.0 - step as f32 * 0.05);
            clock.advance(50);
        }
        let labels: Vec<String> = editor
            .history()
            .undo_entries()
            .map(|e| e.action.to_string())
            .collect();
        assert_eq!(labels, vec!["add_image", "opacity_image"]);
    }

    #[test]
    fn test_invalid_crop_ignored() {
        let (mut editor, _clock) = editor();
        let id = editor
            .add_image(ImageElement::new("a.png", Dimensions::new(10.0, 10.0), (0.0, 0.0)))
            .expect("should add");
        let bad = CropRect {
            x: 0.8,
            y: 0.0,
            width: 0.5,
            height: 0.5,
        };
        assert!(!editor.set_image_crop(&id, bad));
        assert_eq!(editor.image_elements()[0].crop, CropRect::full());
    }

    #[test]
    fn test_image_editor_resets_invalid_crop() {
        let (mut editor, clock) = editor();
        let bad = CropRect {
            x: 0.8,
            y: 0.0,
            width: 0.5,
            height: 1.0,
        };
        editor.open_image_editor(false);
        let id = editor
            .save_image_editor(
                ImageElement::new("a.png", Dimensions::new(10.0, 10.0), (0.0, 0.0)).with_crop(bad),
            )
            .expect("editor was open");
        assert_eq!(editor.image_elements()[0].crop, CropRect::full());

        clock.advance(2000);
        let half = CropRect {
            x: 0.0,
            y: 0.0,
            width: 0.5,
            height: 0.5,
        };
        let replacement = ImageElement::new("b.png", Dimensions::new(10.0, 10.0), (0.0, 0.0));
        assert!(editor.edit_image(&id, replacement.clone().with_crop(half)));
        assert_eq!(editor.image_elements()[0].crop, half);

        clock.advance(2000);
        assert!(editor.edit_image(&id, replacement.with_crop(bad)));
        let image = &editor.image_elements()[0];
        assert_eq!(image.crop, CropRect::full());
        assert!(image.crop.is_valid());
    }

    #[test]
    fn test_add_with_taken_id_is_ignored() {
        let (mut editor, clock) = editor();
        editor
            .add_text(TextElement::new("first").with_id("1"))
            .expect("should add");
        clock.advance(2000);

        assert!(editor.add_text(TextElement::new("second").with_id("1")).is_none());
        assert_eq!(editor.text_elements().len(), 1);
        assert_eq!(editor.text_elements()[0].text, "first");
        assert_eq!(editor.history().undo_len(), 1);

        // Ids are per layer.
        assert!(editor
            .add_image(
                ImageElement::new("a.png", Dimensions::new(1.0, 1.0), (0.0, 0.0)).with_id("1")
            )
            .is_some());
    }

    #[test]
    fn test_crop_gestures() {
        let (mut editor, _clock) = editor();
        let id = editor
            .add_image(ImageElement::new("a.png", Dimensions::new(10.0, 10.0), (0.0, 0.0)))
            .expect("should add");
        assert!(editor.pinch_image_crop(&id, 2.0));
        assert_eq!(
            editor.image_elements()[0].crop,
            CropRect {
                x: 0.25,
                y: 0.25,
                width: 0.5,
                height: 0.5,
            }
        );
        // Dragging the preview right by 30 points shows more of the left edge.
        assert!(editor.pan_image_crop(&id, 30.0, 0.0));
        let crop = editor.image_elements()[0].crop;
        assert!((crop.x - 0.15).abs() < 1e-6);
        assert!(!editor.pinch_image_crop(&"missing".into(), 2.0));
    }

    #[test]
    fn test_frame_reflects_state() {
        let (mut editor, _clock) = editor();
        let id = editor.add_text(TextElement::new("A")).expect("should add");
        editor.select_text(Some(id.clone()));
        editor.zoom_in();
        let frame = editor.frame();
        assert_eq!(frame.selected, Some(ElementRef::Text(id)));
        assert_eq!(frame.elements.text_elements.len(), 1);
        // Animation has just started, so the displayed scale is still 1.
        assert!((frame.transform.scale - 1.0).abs() < 1e-6);
    }
}
