//! Gesture tracking
//!
//! Turns per-frame landmark detections into the values sent over OSC:
//! a smoothed cursor, the combined pinch + open-mouth condition, and a
//! one-frame trigger on its rising edge.

pub mod features;
pub mod signal;

pub use features::FrameFeatures;
pub use signal::{CursorSmoother, GestureState};

use crate::config::GestureConfig;
use crate::landmarks::Detections;

/// Result of processing one frame
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameOutput {
    /// Smoothed cursor x in [0, 1]
    pub x: f32,
    /// Smoothed cursor y in [0, 1]
    pub y: f32,
    /// Pinch and open mouth in this frame
    pub gesture_active: bool,
    /// First frame of an active gesture
    pub trigger: bool,
}

/// State carried across frames
pub struct GestureTracker {
    config: GestureConfig,
    cursor: CursorSmoother,
    state: GestureState,
}

impl GestureTracker {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            cursor: CursorSmoother::new(config.alpha),
            state: GestureState::Idle,
        }
    }

    /// Advance by one frame
    pub fn update(&mut self, detections: &Detections) -> FrameOutput {
        let features = features::extract(detections, &self.config);

        // Without a hand the target is the current position, so the cursor freezes.
        let (x, y) = match features.cursor {
            Some(raw) => self.cursor.update(raw),
            None => self.cursor.hold(),
        };

        let gesture_active = features.pinching && features.mouth_open;
        let trigger = self.state.update(gesture_active);

        FrameOutput {
            x,
            y,
            gesture_active,
            trigger,
        }
    }

    pub fn cursor(&self) -> (f32, f32) {
        self.cursor.position()
    }

    pub fn state(&self) -> GestureState {
        self.state
    }
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new(GestureConfig::default())
    }
}
