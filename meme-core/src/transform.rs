//! Canvas pan/zoom.
//!
//! The [`TransformController`] keeps two copies of the view transform:
//!
//! ```text
//! committed  value after the last finished gesture
//! live       committed + the delta of the gesture in progress
//! ```
//!
//! Discrete actions (double tap, zoom buttons, reset) commit immediately and
//! start an animation from the value on screen to the new committed value.
//! [`TransformController::displayed`] is what the rendering surface draws.

use serde::{Deserialize, Serialize};

use crate::config::TransformConfig;
use crate::event::{GestureState, PanEvent, PinchEvent, TapEvent};

/// View transform applied to the whole canvas.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanvasTransform {
    /// Zoom factor (1.0 = 100%).
    pub scale: f32,
    /// Horizontal pan offset.
    pub translate_x: f32,
    /// Vertical pan offset.
    pub translate_y: f32,
}

impl Default for CanvasTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl CanvasTransform {
    /// No zoom, no pan.
    pub const IDENTITY: Self = Self {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Linear blend between two transforms.
    #[must_use]
    pub fn lerp(&self, to: &Self, t: f32) -> Self {
        Self {
            scale: self.scale + (to.scale - self.scale) * t,
            translate_x: self.translate_x + (to.translate_x - self.translate_x) * t,
            translate_y: self.translate_y + (to.translate_y - self.translate_y) * t,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Animation {
    from: CanvasTransform,
    to: CanvasTransform,
    started_ms: u64,
    duration_ms: u64,
}

impl Animation {
    #[allow(clippy::cast_precision_loss)]
    fn value_at(&self, now_ms: u64) -> Option<CanvasTransform> {
        let elapsed = now_ms.saturating_sub(self.started_ms);
        if self.duration_ms == 0 || elapsed >= self.duration_ms {
            return None;
        }
        let t = elapsed as f32 / self.duration_ms as f32;
        Some(self.from.lerp(&self.to, ease_in_out(t)))
    }
}

fn ease_in_out(t: f32) -> f32 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Pan/zoom state machine for the canvas view.
#[derive(Debug, Clone)]
pub struct TransformController {
    config: TransformConfig,
    committed: CanvasTransform,
    live: CanvasTransform,
    animation: Option<Animation>,
}

impl Default for TransformController {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformController {
    /// Create a controller with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(TransformConfig::default())
    }

    /// Create with custom configuration.
    #[must_use]
    pub fn with_config(config: TransformConfig) -> Self {
        Self {
            config,
            committed: CanvasTransform::IDENTITY,
            live: CanvasTransform::IDENTITY,
            animation: None,
        }
    }

    /// Get the current configuration.
    #[must_use]
    pub const fn config(&self) -> &TransformConfig {
        &self.config
    }

    /// Value after the last finished gesture or discrete action.
    #[must_use]
    pub const fn committed(&self) -> CanvasTransform {
        self.committed
    }

    /// Value including the gesture in progress, ignoring animations.
    #[must_use]
    pub const fn live(&self) -> CanvasTransform {
        self.live
    }

    /// Value to draw at `now_ms`, following any running animation.
    #[must_use]
    pub fn displayed(&self, now_ms: u64) -> CanvasTransform {
        self.animation
            .and_then(|a| a.value_at(now_ms))
            .unwrap_or(self.live)
    }

    /// Whether an animation is still running at `now_ms`.
    #[must_use]
    pub fn is_animating(&self, now_ms: u64) -> bool {
        self.animation.is_some_and(|a| a.value_at(now_ms).is_some())
    }

    /// Handle a canvas pan update.
    pub fn on_pan(&mut self, event: &PanEvent) {
        self.animation = None;
        if event.state.is_finished() {
            self.committed.translate_x += event.translation_x;
            self.committed.translate_y += event.translation_y;
            self.live.translate_x = self.committed.translate_x;
            self.live.translate_y = self.committed.translate_y;
            tracing::debug!(
                "Pan committed at ({}, {})",
                self.committed.translate_x,
                self.committed.translate_y
            );
        } else {
            self.live.translate_x = self.committed.translate_x + event.translation_x;
            self.live.translate_y = self.committed.translate_y + event.translation_y;
        }
    }

    /// Handle a canvas pinch update.
    pub fn on_pinch(&mut self, event: &PinchEvent) {
        self.animation = None;
        if event.state.is_finished() {
            self.committed.scale = self.live.scale;
            tracing::debug!("Pinch committed at scale {}", self.committed.scale);
        } else if event.scale.is_finite() {
            self.live.scale = self.config.clamp_scale(self.committed.scale * event.scale);
        }
    }

    /// Handle a double tap: zoom out to identity when zoomed in past the
    /// threshold, otherwise zoom in keeping the pan offset.
    pub fn on_double_tap(&mut self, event: &TapEvent, now_ms: u64) {
        if event.state != GestureState::Active {
            return;
        }
        let target = if self.live.scale > self.config.double_tap_threshold {
            CanvasTransform::IDENTITY
        } else {
            CanvasTransform {
                scale: self.config.clamp_scale(self.config.double_tap_zoom),
                ..self.live
            }
        };
        self.animate_to(target, self.config.double_tap_duration_ms, now_ms);
    }

    /// Zoom in by one step.
    pub fn zoom_in(&mut self, now_ms: u64) {
        let scale = self.config.clamp_scale(self.committed.scale * self.config.zoom_step);
        self.animate_to(
            CanvasTransform {
                scale,
                ..self.committed
            },
            self.config.zoom_button_duration_ms,
            now_ms,
        );
    }

    /// Zoom out by one step.
    pub fn zoom_out(&mut self, now_ms: u64) {
        let scale = self.config.clamp_scale(self.committed.scale / self.config.zoom_step);
        self.animate_to(
            CanvasTransform {
                scale,
                ..self.committed
            },
            self.config.zoom_button_duration_ms,
            now_ms,
        );
    }

    /// Animate back to identity, clearing committed and live state.
    pub fn reset(&mut self, now_ms: u64) {
        self.animate_to(CanvasTransform::IDENTITY, self.config.reset_duration_ms, now_ms);
    }

    /// Jump to a transform without animating.
    pub fn set_immediate(&mut self, transform: CanvasTransform) {
        let transform = CanvasTransform {
            scale: self.config.clamp_scale(transform.scale),
            ..transform
        };
        self.committed = transform;
        self.live = transform;
        self.animation = None;
    }

    fn animate_to(&mut self, target: CanvasTransform, duration_ms: u64, now_ms: u64) {
        let from = self.displayed(now_ms);
        self.committed = target;
        self.live = target;
        self.animation = Some(Animation {
            from,
            to: target,
            started_ms: now_ms,
            duration_ms,
        });
        tracing::debug!(
            "Animating canvas to scale {} over {duration_ms}ms",
            target.scale
        );
    }
}
