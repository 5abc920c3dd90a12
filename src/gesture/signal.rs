//! Temporal signal processing: exponential smoothing and edge detection

/// Exponential moving average over a 2D point
///
/// `value = value * (1 - alpha) + raw * alpha`, per axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorSmoother {
    alpha: f32,
    x: f32,
    y: f32,
}

impl CursorSmoother {
    /// Cursor starts at the frame center
    pub const CENTER: (f32, f32) = (0.5, 0.5);

    pub fn new(alpha: f32) -> Self {
        Self::with_position(alpha, Self::CENTER)
    }

    pub fn with_position(alpha: f32, (x, y): (f32, f32)) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            x,
            y,
        }
    }

    /// Blend one raw sample into the smoothed position
    pub fn update(&mut self, raw: (f32, f32)) -> (f32, f32) {
        self.x = self.x * (1.0 - self.alpha) + raw.0 * self.alpha;
        self.y = self.y * (1.0 - self.alpha) + raw.1 * self.alpha;
        self.position()
    }

    /// Advance one frame with no new target. The raw sample equals the
    /// current position, a fixed point of the blend, so the stored value is
    /// returned as-is rather than recomputed in f32.
    pub fn hold(&mut self) -> (f32, f32) {
        self.position()
    }

    pub fn position(&self) -> (f32, f32) {
        (self.x, self.y)
    }
}

/// Two-state gesture machine
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GestureState {
    #[default]
    Idle,
    Active,
}

impl GestureState {
    /// Feed this frame's gesture condition. Returns `true` (the trigger) only
    /// on the Idle → Active transition.
    pub fn update(&mut self, active: bool) -> bool {
        let trigger = active && *self == GestureState::Idle;
        *self = if active {
            GestureState::Active
        } else {
            GestureState::Idle
        };
        trigger
    }

    pub fn is_active(&self) -> bool {
        *self == GestureState::Active
    }
}
