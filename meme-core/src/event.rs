//! Normalized gesture events delivered by the host's gesture recognizers.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a recognized gesture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureState {
    /// Recognizer started tracking (finger down).
    Began,
    /// Gesture is in progress and reporting values.
    Active,
    /// Gesture finished normally.
    End,
    /// Gesture was interrupted (e.g. palm rejection, incoming call).
    Cancelled,
}

impl GestureState {
    /// Whether the gesture is over, normally or not.
    #[must_use]
    pub const fn is_finished(self) -> bool {
        matches!(self, Self::End | Self::Cancelled)
    }
}

/// A pan (drag) gesture update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PanEvent {
    /// Gesture state.
    pub state: GestureState,
    /// Horizontal translation since the gesture began.
    pub translation_x: f32,
    /// Vertical translation since the gesture began.
    pub translation_y: f32,
}

impl PanEvent {
    /// Create a pan event.
    #[must_use]
    pub const fn new(state: GestureState, translation_x: f32, translation_y: f32) -> Self {
        Self {
            state,
            translation_x,
            translation_y,
        }
    }
}

/// A pinch gesture update.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PinchEvent {
    /// Gesture state.
    pub state: GestureState,
    /// Scale ratio since the gesture began (1.0 = no change).
    pub scale: f32,
}

impl PinchEvent {
    /// Create a pinch event.
    #[must_use]
    pub const fn new(state: GestureState, scale: f32) -> Self {
        Self { state, scale }
    }
}

/// A tap gesture update (used for double taps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TapEvent {
    /// Gesture state; a tap fires when it becomes active.
    pub state: GestureState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finished_states() {
        assert!(GestureState::End.is_finished());
        assert!(GestureState::Cancelled.is_finished());
        assert!(!GestureState::Began.is_finished());
        assert!(!GestureState::Active.is_finished());
    }

    #[test]
    fn test_state_json() {
        let event = PanEvent::new(GestureState::Cancelled, 1.0, 2.0);
        let json = serde_json::to_string(&event).expect("should serialize");
        assert!(json.contains("\"cancelled\""));
    }
}
