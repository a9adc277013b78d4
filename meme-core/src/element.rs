//! Overlay elements - the text and image layers placed on the canvas.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::ElementConfig;
use crate::{MemeError, MemeResult};

/// Unique identifier for an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    /// Create a new unique element ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Borrow the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ElementId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ElementId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ElementId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for ElementId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Horizontal text alignment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    /// Flush left.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Flush right.
    Right,
}

/// Font weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    /// Regular weight.
    Normal,
    /// Bold weight.
    #[default]
    Bold,
}

/// Text decoration line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextDecoration {
    /// No decoration.
    #[default]
    None,
    /// Underlined.
    Underline,
}

/// Case transform applied when the text is displayed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextTransform {
    /// Display as typed.
    None,
    /// Display in upper case.
    #[default]
    Uppercase,
    /// Display in lower case.
    Lowercase,
}

/// Visual style of a text overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextStyle {
    /// Font size in canvas units.
    pub font_size: f32,
    /// Font family name; `None` means the platform system font.
    pub font_family: Option<String>,
    /// Text color (hex or `transparent`).
    pub color: String,
    /// Box background color (hex or `transparent`).
    pub background_color: String,
    /// Alignment.
    pub text_align: TextAlign,
    /// Weight.
    pub font_weight: FontWeight,
    /// Decoration.
    pub text_decoration: TextDecoration,
    /// Case transform.
    pub text_transform: TextTransform,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 24.0,
            font_family: None,
            color: "#FFFFFF".to_string(),
            background_color: "transparent".to_string(),
            text_align: TextAlign::default(),
            font_weight: FontWeight::default(),
            text_decoration: TextDecoration::default(),
            text_transform: TextTransform::default(),
        }
    }
}

/// A text overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextElement {
    /// Unique identifier.
    pub id: ElementId,
    /// Text content as typed.
    pub text: String,
    /// X position; unset until first placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f32>,
    /// Y position; unset until first placed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f32>,
    /// Opacity in `0..=1`; unset means fully opaque.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f32>,
    /// Visual style.
    #[serde(default)]
    pub style: TextStyle,
}

impl TextElement {
    /// Create an unplaced text element with the default style.
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: ElementId::new(),
            text: text.into(),
            x: None,
            y: None,
            opacity: None,
            style: TextStyle::default(),
        }
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the position.
    #[must_use]
    pub fn with_position(mut self, x: f32, y: f32) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    /// Set the style.
    #[must_use]
    pub fn with_style(mut self, style: TextStyle) -> Self {
        self.style = style;
        self
    }

    /// The text as it should be drawn, after the case transform.
    #[must_use]
    pub fn display_text(&self) -> String {
        match self.style.text_transform {
            TextTransform::None => self.text.clone(),
            TextTransform::Uppercase => self.text.to_uppercase(),
            TextTransform::Lowercase => self.text.to_lowercase(),
        }
    }
}

/// Width/height pair in image pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: f32,
    /// Height in pixels.
    pub height: f32,
}

impl Dimensions {
    /// Create a dimensions pair.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Normalized crop rectangle over the source image.
///
/// All fields are fractions of the source image: `0 <= x`, `0 <= y`,
/// `x + width <= 1` and `y + height <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl Default for CropRect {
    fn default() -> Self {
        Self::full()
    }
}

impl CropRect {
    /// The whole image.
    #[must_use]
    pub const fn full() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            width: 1.0,
            height: 1.0,
        }
    }

    /// Check the rectangle lies inside the unit square and is non-empty.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::InvalidCrop`] describing the violated bound.
    pub fn validate(&self) -> MemeResult<()> {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(MemeError::InvalidCrop("non-finite value".to_string()));
        }
        if self.x < 0.0 || self.y < 0.0 {
            return Err(MemeError::InvalidCrop(format!(
                "origin ({}, {}) is negative",
                self.x, self.y
            )));
        }
        if self.width <= 0.0 || self.height <= 0.0 {
            return Err(MemeError::InvalidCrop(format!(
                "size {}x{} is empty",
                self.width, self.height
            )));
        }
        // Small tolerance for accumulated float error from repeated pans.
        if self.x + self.width > 1.0 + 1e-5 || self.y + self.height > 1.0 + 1e-5 {
            return Err(MemeError::InvalidCrop(format!(
                "({}, {}) + {}x{} exceeds the image",
                self.x, self.y, self.width, self.height
            )));
        }
        Ok(())
    }

    /// Whether [`Self::validate`] passes.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Move the crop window by a drag of `(translation_x, translation_y)`
    /// preview pixels over a square preview of side `preview_size`.
    ///
    /// Dragging the image right reveals more of its left side, so the window
    /// moves the opposite way. The result is kept inside the image.
    #[must_use]
    pub fn panned(&self, translation_x: f32, translation_y: f32, preview_size: f32) -> Self {
        if preview_size <= 0.0 {
            return *self;
        }
        let dx = translation_x / preview_size;
        let dy = translation_y / preview_size;
        Self {
            x: clamp_origin(self.x - dx, self.width),
            y: clamp_origin(self.y - dy, self.height),
            ..*self
        }
    }

    /// Zoom the crop window by a pinch of `scale`, keeping its centre.
    ///
    /// The result is square, with a side of `width / scale` bounded to
    /// `[min_size, 1]`.
    #[must_use]
    pub fn pinched(&self, scale: f32, min_size: f32) -> Self {
        if !scale.is_finite() || scale <= 0.0 {
            return *self;
        }
        let size = (self.width / scale).clamp(min_size.min(1.0), 1.0);
        let center_x = self.x + self.width / 2.0;
        let center_y = self.y + self.height / 2.0;
        Self {
            x: clamp_origin(center_x - size / 2.0, size),
            y: clamp_origin(center_y - size / 2.0, size),
            width: size,
            height: size,
        }
    }
}

fn clamp_origin(origin: f32, extent: f32) -> f32 {
    origin.min(1.0 - extent).max(0.0)
}

/// Corner handle used to resize an image overlay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResizeHandle {
    /// Top-left corner.
    TopLeft,
    /// Top-right corner.
    TopRight,
    /// Bottom-left corner.
    BottomLeft,
    /// Bottom-right corner.
    BottomRight,
}

/// An image overlay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageElement {
    /// Unique identifier.
    pub id: ElementId,
    /// Source image URI.
    pub uri: String,
    /// Width in image pixels.
    pub width: f32,
    /// Height in image pixels.
    pub height: f32,
    /// X position on the canvas.
    pub x: f32,
    /// Y position on the canvas.
    pub y: f32,
    /// Opacity in `0..=1`.
    pub opacity: f32,
    /// Visible part of the source image.
    pub crop: CropRect,
    /// Size of the source image when it was picked.
    pub original_dimensions: Dimensions,
}

impl ImageElement {
    /// Create an image overlay showing the whole source at `position`.
    #[must_use]
    pub fn new(uri: impl Into<String>, dimensions: Dimensions, position: (f32, f32)) -> Self {
        Self {
            id: ElementId::new(),
            uri: uri.into(),
            width: dimensions.width,
            height: dimensions.height,
            x: position.0,
            y: position.1,
            opacity: 1.0,
            crop: CropRect::full(),
            original_dimensions: dimensions,
        }
    }

    /// Set the identifier.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<ElementId>) -> Self {
        self.id = id.into();
        self
    }

    /// Set the crop rectangle.
    #[must_use]
    pub fn with_crop(mut self, crop: CropRect) -> Self {
        self.crop = crop;
        self
    }

    /// The element with an invalid crop replaced by the full image and the
    /// opacity clamped to `0..=1`.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        if let Err(e) = self.crop.validate() {
            tracing::debug!("Resetting crop for {}: {e}", self.id);
            self.crop = CropRect::full();
        }
        self.opacity = self.opacity.clamp(0.0, 1.0);
        self
    }

    /// Size of the overlay on the canvas: the cropped part of the image
    /// scaled down by `divisor`.
    #[must_use]
    pub fn display_size(&self, divisor: f32) -> (f32, f32) {
        (
            self.width * self.crop.width / divisor,
            self.height * self.crop.height / divisor,
        )
    }

    /// The element after dragging `handle` by `(translation_x, translation_y)`
    /// from this geometry.
    ///
    /// `self` is the geometry captured when the gesture began; each event of
    /// the gesture recomputes from it rather than compounding.
    #[must_use]
    pub fn resized(
        &self,
        handle: ResizeHandle,
        translation_x: f32,
        translation_y: f32,
        config: &ElementConfig,
    ) -> Self {
        let (width, height) = self.display_size(config.display_divisor);
        let (dw, dh, move_x, move_y) = match handle {
            ResizeHandle::BottomRight => (translation_x, translation_y, false, false),
            ResizeHandle::TopLeft => (-translation_x, -translation_y, true, true),
            ResizeHandle::TopRight => (translation_x, -translation_y, false, true),
            ResizeHandle::BottomLeft => (-translation_x, translation_y, true, false),
        };
        let new_width = (width + dw).max(config.min_display_size);
        let new_height = (height + dh).max(config.min_display_size);

        let mut resized = self.clone();
        if move_x {
            resized.x = self.x + translation_x;
        }
        if move_y {
            resized.y = self.y + translation_y;
        }
        resized.width = new_width * config.display_divisor / self.crop.width.max(f32::EPSILON);
        resized.height = new_height * config.display_divisor / self.crop.height.max(f32::EPSILON);
        resized
    }
}

/// Common behaviour of text and image overlays.
pub trait Overlay: Clone + PartialEq {
    /// Partial update accepted by [`Overlay::apply`].
    type Patch;

    /// Element identifier.
    fn id(&self) -> &ElementId;

    /// Replace the identifier.
    fn set_id(&mut self, id: ElementId);

    /// Current position, falling back to `default` for unplaced elements.
    fn position_or(&self, default: f32) -> (f32, f32);

    /// Move the element.
    fn set_position(&mut self, x: f32, y: f32);

    /// Apply a partial update.
    fn apply(&mut self, patch: Self::Patch);
}

/// Partial update for a [`TextElement`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct TextPatch {
    /// New text.
    pub text: Option<String>,
    /// New X position.
    pub x: Option<f32>,
    /// New Y position.
    pub y: Option<f32>,
    /// New opacity.
    pub opacity: Option<f32>,
    /// New style.
    pub style: Option<TextStyle>,
}

impl Overlay for TextElement {
    type Patch = TextPatch;

    fn id(&self) -> &ElementId {
        &self.id
    }

    fn set_id(&mut self, id: ElementId) {
        self.id = id;
    }

    fn position_or(&self, default: f32) -> (f32, f32) {
        (self.x.unwrap_or(default), self.y.unwrap_or(default))
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.x = Some(x);
        self.y = Some(y);
    }

    fn apply(&mut self, patch: TextPatch) {
        if let Some(text) = patch.text {
            self.text = text;
        }
        if patch.x.is_some() {
            self.x = patch.x;
        }
        if patch.y.is_some() {
            self.y = patch.y;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = Some(opacity.clamp(0.0, 1.0));
        }
        if let Some(style) = patch.style {
            self.style = style;
        }
    }
}

/// Partial update for an [`ImageElement`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ImagePatch {
    /// New X position.
    pub x: Option<f32>,
    /// New Y position.
    pub y: Option<f32>,
    /// New width.
    pub width: Option<f32>,
    /// New height.
    pub height: Option<f32>,
    /// New opacity.
    pub opacity: Option<f32>,
    /// New crop; ignored unless it passes [`CropRect::validate`].
    pub crop: Option<CropRect>,
}

impl Overlay for ImageElement {
    type Patch = ImagePatch;

    fn id(&self) -> &ElementId {
        &self.id
    }

    fn set_id(&mut self, id: ElementId) {
        self.id = id;
    }

    fn position_or(&self, _default: f32) -> (f32, f32) {
        (self.x, self.y)
    }

    fn set_position(&mut self, x: f32, y: f32) {
        self.x = x;
        self.y = y;
    }

    fn apply(&mut self, patch: ImagePatch) {
        if let Some(x) = patch.x {
            self.x = x;
        }
        if let Some(y) = patch.y {
            self.y = y;
        }
        if let Some(width) = patch.width {
            self.width = width;
        }
        if let Some(height) = patch.height {
            self.height = height;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = opacity.clamp(0.0, 1.0);
        }
        if let Some(crop) = patch.crop {
            match crop.validate() {
                Ok(()) => self.crop = crop,
                Err(e) => tracing::debug!("Ignoring crop for {}: {e}", self.id),
            }
        }
    }
}
