//! Detect-then-track state for one landmark stage
//!
//! The box detector runs only while nothing is tracked. Once landmarks are
//! found, the region derived from them is reused on the next frame for as
//! long as the landmark presence stays at or above the tracking threshold.

use super::roi::Roi;

/// Confidence gates of one stage
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StageThresholds {
    /// Box detector score needed to start tracking
    pub min_detection_confidence: f32,
    /// Landmark presence needed to report and keep tracking
    pub min_tracking_confidence: f32,
}

/// Gates plus the region carried between frames
#[derive(Clone, Debug)]
pub struct RoiTracker {
    thresholds: StageThresholds,
    tracked: Option<Roi>,
}

impl RoiTracker {
    pub fn new(thresholds: StageThresholds) -> Self {
        Self {
            thresholds,
            tracked: None,
        }
    }

    /// Region carried over from the previous frame, if any
    pub fn tracked(&self) -> Option<Roi> {
        self.tracked
    }

    /// Whether a detector box is strong enough to run landmarks on
    pub fn accept_detection(&self, score: f32) -> bool {
        score >= self.thresholds.min_detection_confidence
    }

    /// Record this frame's landmark presence. Keeps `next` for the following
    /// frame and returns `true` when the landmarks should be reported;
    /// otherwise drops tracking so the detector runs again.
    pub fn accept_landmarks(&mut self, presence: f32, next: Option<Roi>) -> bool {
        if presence >= self.thresholds.min_tracking_confidence {
            self.tracked = next;
            true
        } else {
            self.tracked = None;
            false
        }
    }

    pub fn reset(&mut self) {
        self.tracked = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const HAND: StageThresholds = StageThresholds {
        min_detection_confidence: 0.7,
        min_tracking_confidence: 0.7,
    };
    const FACE: StageThresholds = StageThresholds {
        min_detection_confidence: 0.5,
        min_tracking_confidence: 0.5,
    };

    fn roi(cx: f32) -> Roi {
        Roi {
            cx,
            cy: 10.0,
            side: 20.0,
            rotation: 0.0,
        }
    }

    #[test]
    fn test_face_at_point_six_is_kept() {
        let mut tracker = RoiTracker::new(FACE);
        assert!(tracker.accept_detection(0.6));
        assert!(tracker.accept_landmarks(0.6, Some(roi(1.0))));
        assert_eq!(tracker.tracked(), Some(roi(1.0)));
    }

    #[test]
    fn test_hand_at_point_six_is_dropped() {
        let mut tracker = RoiTracker::new(HAND);
        assert!(!tracker.accept_detection(0.6));
        assert!(!tracker.accept_landmarks(0.6, Some(roi(1.0))));
        assert_eq!(tracker.tracked(), None);
    }

    #[test]
    fn test_tracking_follows_landmarks() {
        let mut tracker = RoiTracker::new(HAND);
        assert!(tracker.accept_landmarks(0.9, Some(roi(1.0))));
        assert!(tracker.accept_landmarks(0.7, Some(roi(2.0))));
        assert_eq!(tracker.tracked(), Some(roi(2.0)));
    }

    #[test]
    fn test_low_presence_restarts_detection() {
        let mut tracker = RoiTracker::new(HAND);
        tracker.accept_landmarks(0.9, Some(roi(1.0)));
        assert!(!tracker.accept_landmarks(0.69, Some(roi(2.0))));
        assert_eq!(tracker.tracked(), None);
    }

    #[test]
    fn test_reset() {
        let mut tracker = RoiTracker::new(FACE);
        tracker.accept_landmarks(1.0, Some(roi(1.0)));
        tracker.reset();
        assert!(tracker.tracked().is_none());
    }
}
