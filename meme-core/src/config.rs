//! Editor configuration.
//!
//! Every field defaults to the behaviour of the shipping mobile editor, so an
//! empty JSON object (`{}`) is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::{MemeError, MemeResult};

/// Undo/redo history tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum entries kept on each of the undo and redo stacks.
    pub max_entries: usize,
    /// Idle time before an automatic snapshot, and the minimum spacing
    /// between two automatic snapshots.
    pub auto_save_delay_ms: u64,
    /// Window in which a repeat of the same explicit action is coalesced.
    pub same_action_window_ms: u64,
    /// How far the `move_start` entry is backdated relative to the drag end.
    pub move_start_backdate_ms: u64,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_entries: 15,
            auto_save_delay_ms: 5000,
            same_action_window_ms: 1000,
            move_start_backdate_ms: 1000,
        }
    }
}

/// Canvas pan/zoom tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    /// Smallest allowed canvas scale.
    pub min_scale: f32,
    /// Largest allowed canvas scale.
    pub max_scale: f32,
    /// Factor applied by the zoom-in / zoom-out buttons.
    pub zoom_step: f32,
    /// Above this scale a double tap zooms back out.
    pub double_tap_threshold: f32,
    /// Scale a double tap zooms in to.
    pub double_tap_zoom: f32,
    /// Double-tap animation length.
    pub double_tap_duration_ms: u64,
    /// Reset animation length.
    pub reset_duration_ms: u64,
    /// Zoom button animation length.
    pub zoom_button_duration_ms: u64,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            min_scale: 0.5,
            max_scale: 4.0,
            zoom_step: 1.5,
            double_tap_threshold: 1.2,
            double_tap_zoom: 2.0,
            double_tap_duration_ms: 300,
            reset_duration_ms: 400,
            zoom_button_duration_ms: 200,
        }
    }
}

impl TransformConfig {
    /// Clamp a scale into `[min_scale, max_scale]`.
    ///
    /// Never panics: with inverted bounds the result is `min_scale`, and a
    /// NaN scale clamps to `min_scale`.
    #[must_use]
    pub fn clamp_scale(&self, scale: f32) -> f32 {
        scale.min(self.max_scale).max(self.min_scale)
    }

    /// Check that the scale bounds and zoom factors are usable.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::InvalidConfig`] if a bound or factor is not a
    /// positive finite number, or if `min_scale > max_scale`.
    pub fn validate(&self) -> MemeResult<()> {
        let factors = [
            ("min_scale", self.min_scale),
            ("max_scale", self.max_scale),
            ("zoom_step", self.zoom_step),
            ("double_tap_threshold", self.double_tap_threshold),
            ("double_tap_zoom", self.double_tap_zoom),
        ];
        for (name, value) in factors {
            if !value.is_finite() || value <= 0.0 {
                return Err(MemeError::InvalidConfig(format!(
                    "transform.{name} must be a positive number, got {value}"
                )));
            }
        }
        if self.min_scale > self.max_scale {
            return Err(MemeError::InvalidConfig(format!(
                "transform.min_scale ({}) exceeds transform.max_scale ({})",
                self.min_scale, self.max_scale
            )));
        }
        Ok(())
    }
}

/// Element placement and geometry tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ElementConfig {
    /// Position used for elements that were never placed.
    pub default_position: f32,
    /// Offset applied on both axes to a duplicated element.
    pub duplicate_offset: f32,
    /// Image pixels per canvas unit when drawing an image overlay.
    pub display_divisor: f32,
    /// Smallest on-canvas edge length a resize handle can produce.
    pub min_display_size: f32,
    /// Smallest normalized crop side a pinch can produce.
    pub min_crop_size: f32,
    /// Side of the square crop preview, in points.
    pub crop_preview_size: f32,
}

impl Default for ElementConfig {
    fn default() -> Self {
        Self {
            default_position: 50.0,
            duplicate_offset: 20.0,
            display_divisor: 8.0,
            min_display_size: 20.0,
            min_crop_size: 0.1,
            crop_preview_size: 300.0,
        }
    }
}

/// Export flow tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Reset pan/zoom to identity before capturing.
    pub reset_transform: bool,
    /// Time given to the view to redraw without selection borders.
    pub settle_delay_ms: u64,
    /// Album the exported image is filed under, if any.
    pub album: Option<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            reset_transform: true,
            settle_delay_ms: 100,
            album: Some("MemeGene".to_string()),
        }
    }
}

/// Complete editor configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// History settings.
    pub history: HistoryConfig,
    /// Canvas transform settings.
    pub transform: TransformConfig,
    /// Element geometry settings.
    pub elements: ElementConfig,
    /// Export settings.
    pub export: ExportConfig,
}

impl EditorConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or the values fail
    /// [`EditorConfig::validate`].
    pub fn from_json(json: &str) -> MemeResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check the settings that would otherwise break the editor at runtime.
    ///
    /// # Errors
    ///
    /// Returns [`MemeError::InvalidConfig`] naming the offending field.
    pub fn validate(&self) -> MemeResult<()> {
        self.transform.validate()?;
        if self.history.max_entries == 0 {
            return Err(MemeError::InvalidConfig(
                "history.max_entries must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Serialize the configuration to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> MemeResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
