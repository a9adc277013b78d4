//! Element storage.
//!
//! The [`ElementStore`] owns every overlay on the canvas. Layers keep their
//! elements in z-order: the array order is the drawing order, and images are
//! drawn below text.

use serde::{Deserialize, Serialize};

use crate::element::{ElementId, ImageElement, Overlay, TextElement};
use crate::{MemeError, MemeResult};

/// Reference to an element in one of the two layers.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "layer", content = "id", rename_all = "lowercase")]
pub enum ElementRef {
    /// A text overlay.
    Text(ElementId),
    /// An image overlay.
    Image(ElementId),
}

impl ElementRef {
    /// The referenced identifier.
    #[must_use]
    pub fn id(&self) -> &ElementId {
        match self {
            Self::Text(id) | Self::Image(id) => id,
        }
    }
}

impl std::fmt::Display for ElementRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Text(id) => write!(f, "text:{id}"),
            Self::Image(id) => write!(f, "image:{id}"),
        }
    }
}

/// An ordered collection of one kind of overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Layer<T> {
    elements: Vec<T>,
}

impl<T> Default for Layer<T> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
        }
    }
}

impl<T: Overlay> Layer<T> {
    /// Create an empty layer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an element on top of the layer.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::DuplicateElement`] if an element with the same
    /// ID is already in the layer.
    pub fn add(&mut self, element: T) -> MemeResult<ElementId> {
        let id = element.id().clone();
        if self.contains(&id) {
            return Err(MemeError::DuplicateElement(id.to_string()));
        }
        self.elements.push(element);
        Ok(id)
    }

    /// Apply a partial update to an element.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::ElementNotFound`] if no element has this ID.
    pub fn update(&mut self, id: &ElementId, patch: T::Patch) -> MemeResult<()> {
        let element = self
            .find_mut(id)
            .ok_or_else(|| MemeError::ElementNotFound(id.to_string()))?;
        element.apply(patch);
        Ok(())
    }

    /// Replace an element's content, keeping its identifier and position.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::ElementNotFound`] if no element has this ID.
    pub fn replace(
        &mut self,
        id: &ElementId,
        mut content: T,
        default_position: f32,
    ) -> MemeResult<()> {
        let element = self
            .find_mut(id)
            .ok_or_else(|| MemeError::ElementNotFound(id.to_string()))?;
        let (x, y) = element.position_or(default_position);
        content.set_id(id.clone());
        content.set_position(x, y);
        *element = content;
        Ok(())
    }

    /// Remove an element. Unknown IDs are ignored.
    pub fn remove(&mut self, id: &ElementId) -> Option<T> {
        let index = self.elements.iter().position(|e| e.id() == id)?;
        Some(self.elements.remove(index))
    }

    /// Copy an element under a fresh identifier, offset by `offset` on both
    /// axes, and append it on top.
    pub fn duplicate(
        &mut self,
        id: &ElementId,
        offset: f32,
        default_position: f32,
    ) -> Option<ElementId> {
        let mut copy = self.find(id)?.clone();
        let (x, y) = copy.position_or(default_position);
        copy.set_id(ElementId::new());
        copy.set_position(x + offset, y + offset);
        self.add(copy).ok()
    }

    /// Move an element. Returns `false` for unknown IDs.
    pub fn set_position(&mut self, id: &ElementId, x: f32, y: f32) -> bool {
        match self.find_mut(id) {
            Some(element) => {
                element.set_position(x, y);
                true
            }
            None => false,
        }
    }

    /// Get an element by ID.
    #[must_use]
    pub fn find(&self, id: &ElementId) -> Option<&T> {
        self.elements.iter().find(|e| e.id() == id)
    }

    /// Get a mutable reference to an element by ID.
    pub fn find_mut(&mut self, id: &ElementId) -> Option<&mut T> {
        self.elements.iter_mut().find(|e| e.id() == id)
    }

    /// Whether an element with this ID exists.
    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.find(id).is_some()
    }

    /// Elements in drawing order.
    #[must_use]
    pub fn as_slice(&self) -> &[T] {
        &self.elements
    }

    /// Iterate in drawing order.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.elements.iter()
    }

    /// Number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Check if the layer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Replace the whole layer.
    pub fn set_all(&mut self, elements: Vec<T>) {
        self.elements = elements;
    }
}

impl<T> From<Vec<T>> for Layer<T> {
    fn from(elements: Vec<T>) -> Self {
        Self { elements }
    }
}

/// Deep copy of both layers at one point in time.
///
/// Equality is structural and order-sensitive, since order is z-order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementSnapshot {
    /// Text overlays in drawing order.
    pub text_elements: Vec<TextElement>,
    /// Image overlays in drawing order.
    pub image_elements: Vec<ImageElement>,
}

impl ElementSnapshot {
    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.text_elements.len() + self.image_elements.len()
    }

    /// Check if the snapshot has no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text_elements.is_empty() && self.image_elements.is_empty()
    }
}

/// Every overlay on the canvas.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ElementStore {
    /// Image overlays, drawn first.
    pub images: Layer<ImageElement>,
    /// Text overlays, drawn on top.
    pub texts: Layer<TextElement>,
}

impl ElementStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from existing elements.
    #[must_use]
    pub fn from_elements(texts: Vec<TextElement>, images: Vec<ImageElement>) -> Self {
        Self {
            images: images.into(),
            texts: texts.into(),
        }
    }

    /// Whether the referenced element exists.
    #[must_use]
    pub fn contains(&self, target: &ElementRef) -> bool {
        match target {
            ElementRef::Text(id) => self.texts.contains(id),
            ElementRef::Image(id) => self.images.contains(id),
        }
    }

    /// Position of the referenced element.
    #[must_use]
    pub fn position_of(&self, target: &ElementRef, default_position: f32) -> Option<(f32, f32)> {
        match target {
            ElementRef::Text(id) => self.texts.find(id).map(|e| e.position_or(default_position)),
            ElementRef::Image(id) => self.images.find(id).map(|e| e.position_or(default_position)),
        }
    }

    /// Move the referenced element. Returns `false` for unknown elements.
    pub fn set_position(&mut self, target: &ElementRef, x: f32, y: f32) -> bool {
        match target {
            ElementRef::Text(id) => self.texts.set_position(id, x, y),
            ElementRef::Image(id) => self.images.set_position(id, x, y),
        }
    }

    /// Remove the referenced element. Unknown elements are ignored.
    pub fn remove(&mut self, target: &ElementRef) -> bool {
        match target {
            ElementRef::Text(id) => self.texts.remove(id).is_some(),
            ElementRef::Image(id) => self.images.remove(id).is_some(),
        }
    }

    /// Deep copy of both layers.
    #[must_use]
    pub fn snapshot(&self) -> ElementSnapshot {
        ElementSnapshot {
            text_elements: self.texts.as_slice().to_vec(),
            image_elements: self.images.as_slice().to_vec(),
        }
    }

    /// Replace both layers with a snapshot's contents.
    pub fn restore(&mut self, snapshot: ElementSnapshot) {
        self.texts.set_all(snapshot.text_elements);
        self.images.set_all(snapshot.image_elements);
    }

    /// Total number of elements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.texts.len() + self.images.len()
    }

    /// Check if the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.texts.is_empty() && self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::{Dimensions, TextPatch};

    fn text(id: &str) -> TextElement {
        TextElement::new(id).with_id(id)
    }

    #[test]
    fn test_layer_add_remove() {
        let mut layer = Layer::new();
        assert!(layer.is_empty());

        let id = layer.add(text("1")).expect("should add");
        layer.add(text("2")).expect("should add");
        assert_eq!(layer.len(), 2);
        assert!(layer.find(&id).is_some());

        assert!(layer.remove(&id).is_some());
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.as_slice()[0].id.as_str(), "2");
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let mut layer = Layer::new();
        layer.add(text("1")).expect("should add");
        let result = layer.add(TextElement::new("other").with_id("1"));
        assert!(matches!(result, Err(MemeError::DuplicateElement(_))));
        assert_eq!(layer.len(), 1);
        assert_eq!(layer.as_slice()[0].text, "1");
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut layer = Layer::new();
        layer.add(text("1")).expect("should add");
        assert!(layer.remove(&ElementId::from("nope")).is_none());
        assert_eq!(layer.len(), 1);
    }

    #[test]
    fn test_update_unknown_is_error() {
        let mut layer: Layer<TextElement> = Layer::new();
        let result = layer.update(&ElementId::from("x"), TextPatch::default());
        assert!(matches!(result, Err(MemeError::ElementNotFound(_))));
    }

    #[test]
    fn test_duplicate_offsets_and_appends() {
        let mut layer = Layer::new();
        layer.add(text("1").with_position(50.0, 50.0)).expect("should add");
        layer.add(text("2")).expect("should add");

        let copy = layer.duplicate(&ElementId::from("1"), 20.0, 50.0).expect("should duplicate");
        assert_ne!(copy.as_str(), "1");
        assert_eq!(layer.len(), 3);

        let last = &layer.as_slice()[2];
        assert_eq!(last.id, copy);
        assert_eq!(last.x, Some(70.0));
        assert_eq!(last.y, Some(70.0));
        assert_eq!(last.text, "1");
    }

    #[test]
    fn test_duplicate_unplaced_uses_default_position() {
        let mut layer = Layer::new();
        layer.add(text("1")).expect("should add");
        let copy = layer.duplicate(&ElementId::from("1"), 20.0, 50.0).expect("should duplicate");
        assert_eq!(layer.find(&copy).and_then(|e| e.x), Some(70.0));
    }

    #[test]
    fn test_replace_keeps_id_and_position() {
        let mut layer = Layer::new();
        layer.add(text("1").with_position(10.0, 20.0)).expect("should add");

        let edited = TextElement::new("edited").with_position(99.0, 99.0);
        layer
            .replace(&ElementId::from("1"), edited, 50.0)
            .expect("should replace");

        let element = layer.find(&ElementId::from("1")).expect("should exist");
        assert_eq!(element.text, "edited");
        assert_eq!((element.x, element.y), (Some(10.0), Some(20.0)));
    }

    #[test]
    fn test_snapshot_is_a_deep_copy() {
        let mut store = ElementStore::new();
        store.texts.add(text("1").with_position(0.0, 0.0)).expect("should add");
        let snapshot = store.snapshot();

        store.set_position(&ElementRef::Text("1".into()), 5.0, 5.0);
        assert_eq!(snapshot.text_elements[0].x, Some(0.0));
        assert_ne!(snapshot, store.snapshot());

        store.restore(snapshot.clone());
        assert_eq!(snapshot, store.snapshot());
    }

    #[test]
    fn test_snapshot_equality_is_order_sensitive() {
        let a = ElementStore::from_elements(vec![text("1"), text("2")], vec![]);
        let b = ElementStore::from_elements(vec![text("2"), text("1")], vec![]);
        assert_ne!(a.snapshot(), b.snapshot());
    }

    #[test]
    fn test_store_refs() {
        let mut store = ElementStore::new();
        store
            .images
            .add(ImageElement::new("a.png", Dimensions::new(10.0, 10.0), (1.0, 2.0)).with_id("img"))
            .expect("should add");
        let target = ElementRef::Image("img".into());
        assert!(store.contains(&target));
        assert_eq!(store.position_of(&target, 50.0), Some((1.0, 2.0)));
        assert!(store.remove(&target));
        assert!(!store.remove(&target));
        assert!(store.is_empty());
    }
}
