//! Selection tracking.
//!
//! At most one element is selected at a time, across both layers. The
//! exclusivity is structural: the selection is a single optional
//! [`ElementRef`], so selecting a text clears any image selection and the
//! other way round.

use serde::{Deserialize, Serialize};

use crate::element::ElementId;
use crate::store::ElementRef;

/// The currently selected element, if any.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    current: Option<ElementRef>,
}

impl Selection {
    /// Create an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a text element, or clear the text selection with `None`.
    ///
    /// Selecting a text always clears the image selection.
    pub fn select_text(&mut self, id: Option<ElementId>) {
        match id {
            Some(id) => self.current = Some(ElementRef::Text(id)),
            None => {
                if matches!(self.current, Some(ElementRef::Text(_))) {
                    self.current = None;
                }
            }
        }
    }

    /// Select an image element, or clear the image selection with `None`.
    ///
    /// Selecting an image always clears the text selection.
    pub fn select_image(&mut self, id: Option<ElementId>) {
        match id {
            Some(id) => self.current = Some(ElementRef::Image(id)),
            None => {
                if matches!(self.current, Some(ElementRef::Image(_))) {
                    self.current = None;
                }
            }
        }
    }

    /// Select the referenced element.
    pub fn select(&mut self, target: ElementRef) {
        self.current = Some(target);
    }

    /// Clear both selection channels.
    pub fn clear(&mut self) {
        self.current = None;
    }

    /// Replace the whole selection state, e.g. after an export.
    pub fn restore(&mut self, previous: Option<ElementRef>) {
        self.current = previous;
    }

    /// The selected element, if any.
    #[must_use]
    pub fn current(&self) -> Option<&ElementRef> {
        self.current.as_ref()
    }

    /// The selected text element, if a text is selected.
    #[must_use]
    pub fn selected_text_id(&self) -> Option<&ElementId> {
        match &self.current {
            Some(ElementRef::Text(id)) => Some(id),
            _ => None,
        }
    }

    /// The selected image element, if an image is selected.
    #[must_use]
    pub fn selected_image_id(&self) -> Option<&ElementId> {
        match &self.current {
            Some(ElementRef::Image(id)) => Some(id),
            _ => None,
        }
    }

    /// Whether the referenced element is the selected one.
    #[must_use]
    pub fn is_selected(&self, target: &ElementRef) -> bool {
        self.current.as_ref() == Some(target)
    }

    /// Whether nothing is selected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
