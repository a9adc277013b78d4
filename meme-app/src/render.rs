//! Canvas rasterization.
//!
//! Draws a [`CanvasFrame`] as flat boxes: images as gray rectangles, text as
//! its background colour (or a translucent wash of its text colour when the
//! background is transparent). Good enough to check layout and layering of
//! an exported meme without a font or image pipeline.

use std::io::Cursor;

use async_trait::async_trait;
use image::{ImageFormat, Rgba, RgbaImage};
use meme_core::{
    CanvasCapture, CanvasFrame, CanvasTransform, CapturedImage, ElementConfig, MemeError,
    MemeResult,
};

/// Fill used for image overlays.
const IMAGE_FILL: [u8; 4] = [128, 128, 128, 255];
/// Approximate advance of one glyph relative to the font size.
const GLYPH_WIDTH: f32 = 0.6;
/// Line height relative to the font size.
const LINE_HEIGHT: f32 = 1.2;

/// Errors from colour parsing.
#[derive(Debug, thiserror::Error)]
#[error("Unsupported colour: {0}")]
pub struct ColorError(String);

/// Parse `#RGB`, `#RRGGBB`, `#RRGGBBAA`, `transparent`, `white` or `black`.
///
/// # Errors
///
/// Returns [`ColorError`] for any other input.
pub fn parse_color(value: &str) -> Result<[u8; 4], ColorError> {
    let err = || ColorError(value.to_string());
    match value.trim().to_ascii_lowercase().as_str() {
        "transparent" => return Ok([0, 0, 0, 0]),
        "white" => return Ok([255, 255, 255, 255]),
        "black" => return Ok([0, 0, 0, 255]),
        _ => {}
    }
    let hex = value.trim().strip_prefix('#').ok_or_else(err)?;
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2).unwrap_or(""), 16);
    match hex.len() {
        3 => {
            let mut out = [255u8; 4];
            for (slot, c) in out.iter_mut().zip(hex.chars()) {
                let v = c.to_digit(16).ok_or_else(err)?;
                #[allow(clippy::cast_possible_truncation)]
                let v = v as u8;
                *slot = v * 17;
            }
            Ok(out)
        }
        6 | 8 => {
            let mut out = [255u8; 4];
            for (n, slot) in out.iter_mut().take(hex.len() / 2).enumerate() {
                *slot = channel(n * 2).map_err(|_| err())?;
            }
            Ok(out)
        }
        _ => Err(err()),
    }
}

/// Rendering surface producing PNG rasters.
#[derive(Debug, Clone)]
pub struct RasterCapture {
    width: u32,
    height: u32,
    background: [u8; 4],
    elements: ElementConfig,
}

impl RasterCapture {
    /// Create a capture for a `width` x `height` canvas.
    ///
    /// # Errors
    ///
    /// Returns [`ColorError`] if `background` is not a supported colour.
    pub fn new(width: u32, height: u32, background: &str) -> Result<Self, ColorError> {
        Ok(Self {
            width,
            height,
            background: parse_color(background)?,
            elements: ElementConfig::default(),
        })
    }

    /// Use the editor's element geometry settings.
    #[must_use]
    pub fn with_elements(mut self, elements: ElementConfig) -> Self {
        self.elements = elements;
        self
    }

    /// Draw `frame` into an RGBA buffer.
    #[must_use]
    pub fn rasterize(&self, frame: &CanvasFrame) -> RgbaImage {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, Rgba(self.background));
        let view = View::new(frame.transform, self.width, self.height);

        for image in &frame.elements.image_elements {
            let (w, h) = image.display_size(self.elements.display_divisor);
            fill_rect(&mut canvas, view.rect(image.x, image.y, w, h), IMAGE_FILL, image.opacity);
        }

        for text in &frame.elements.text_elements {
            let default_position = self.elements.default_position;
            let (x, y) = (
                text.x.unwrap_or(default_position),
                text.y.unwrap_or(default_position),
            );
            let style = &text.style;
            #[allow(clippy::cast_precision_loss)]
            let glyphs = text.display_text().chars().count().max(1) as f32;
            let w = glyphs * style.font_size * GLYPH_WIDTH;
            let h = style.font_size * LINE_HEIGHT;
            let background = parse_color(&style.background_color).unwrap_or([0, 0, 0, 0]);
            let fill = if background[3] == 0 {
                let mut wash = parse_color(&style.color).unwrap_or([255, 255, 255, 255]);
                wash[3] /= 2;
                wash
            } else {
                background
            };
            fill_rect(&mut canvas, view.rect(x, y, w, h), fill, text.opacity.unwrap_or(1.0));
        }

        canvas
    }
}

#[async_trait]
impl CanvasCapture for RasterCapture {
    async fn capture(&self, frame: &CanvasFrame) -> MemeResult<CapturedImage> {
        if self.width == 0 || self.height == 0 {
            return Err(MemeError::CaptureFailed("canvas has no area".to_string()));
        }
        let raster = self.rasterize(frame);
        let mut buf = Cursor::new(Vec::new());
        raster
            .write_to(&mut buf, ImageFormat::Png)
            .map_err(|e| MemeError::CaptureFailed(format!("PNG encoding failed: {e}")))?;
        Ok(CapturedImage {
            width: self.width,
            height: self.height,
            data: buf.into_inner(),
        })
    }
}

/// Maps canvas coordinates to pixels: scale about the canvas centre, then
/// translate.
struct View {
    transform: CanvasTransform,
    center_x: f32,
    center_y: f32,
}

impl View {
    #[allow(clippy::cast_precision_loss)]
    fn new(transform: CanvasTransform, width: u32, height: u32) -> Self {
        Self {
            transform,
            center_x: width as f32 / 2.0,
            center_y: height as f32 / 2.0,
        }
    }

    fn point(&self, x: f32, y: f32) -> (f32, f32) {
        let t = &self.transform;
        (
            (x - self.center_x).mul_add(t.scale, self.center_x) + t.translate_x,
            (y - self.center_y).mul_add(t.scale, self.center_y) + t.translate_y,
        )
    }

    fn rect(&self, x: f32, y: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
        let (x0, y0) = self.point(x, y);
        let (x1, y1) = self.point(x + w, y + h);
        (x0, y0, x1, y1)
    }
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn fill_rect(canvas: &mut RgbaImage, rect: (f32, f32, f32, f32), color: [u8; 4], opacity: f32) {
    let (x0, y0, x1, y1) = rect;
    let clip = |v: f32, max: u32| v.round().clamp(0.0, max as f32) as u32;
    let (x0, x1) = (clip(x0, canvas.width()), clip(x1, canvas.width()));
    let (y0, y1) = (clip(y0, canvas.height()), clip(y1, canvas.height()));
    let alpha = f32::from(color[3]) / 255.0 * opacity.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }

    for y in y0..y1 {
        for x in x0..x1 {
            let Rgba(dst) = canvas.get_pixel_mut(x, y);
            for (d, s) in dst.iter_mut().zip(color).take(3) {
                let blended = f32::from(s).mul_add(alpha, f32::from(*d) * (1.0 - alpha));
                *d = blended.round() as u8;
            }
            let out_alpha = alpha.mul_add(255.0, f32::from(dst[3]) * (1.0 - alpha));
            dst[3] = out_alpha.round() as u8;
        }
    }
}
