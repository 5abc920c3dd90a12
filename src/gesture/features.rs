//! Geometric features extracted from one frame of landmarks

use crate::config::GestureConfig;
use crate::landmarks::{face, Detections, FaceLandmarks, HandLandmarks, Landmark};

/// Per-frame features fed to the signal processor
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameFeatures {
    /// Clamped index fingertip position, `None` when no hand was detected
    pub cursor: Option<(f32, f32)>,
    /// Thumb and index fingertips are touching
    pub pinching: bool,
    /// Inner lips are apart
    pub mouth_open: bool,
}

/// Distance between two landmarks in normalized image coordinates
pub fn pinch_distance(index_tip: &Landmark, thumb_tip: &Landmark) -> f32 {
    index_tip.distance_2d(thumb_tip)
}

pub fn is_pinching(hand: &HandLandmarks, threshold: f32) -> bool {
    pinch_distance(hand.index_tip(), hand.thumb_tip()) < threshold
}

/// Index fingertip position clamped to [0, 1]
pub fn cursor_target(hand: &HandLandmarks) -> (f32, f32) {
    let tip = hand.index_tip();
    (tip.x.clamp(0.0, 1.0), tip.y.clamp(0.0, 1.0))
}

/// Vertical gap between the inner lips, `None` if the mesh is too short
pub fn mouth_gap(mesh: &FaceLandmarks) -> Option<f32> {
    let upper = mesh.get(face::UPPER_INNER_LIP)?;
    let lower = mesh.get(face::LOWER_INNER_LIP)?;
    Some((upper.y - lower.y).abs())
}

pub fn is_mouth_open(mesh: &FaceLandmarks, threshold: f32) -> bool {
    mouth_gap(mesh).map(|gap| gap > threshold).unwrap_or(false)
}

/// Extract all features for a frame. Missing detections yield "no signal".
pub fn extract(detections: &Detections, config: &GestureConfig) -> FrameFeatures {
    let (cursor, pinching) = match &detections.hand {
        Some(hand) => (
            Some(cursor_target(hand)),
            is_pinching(hand, config.pinch_threshold),
        ),
        None => (None, false),
    };

    let mouth_open = detections
        .face
        .as_ref()
        .map(|mesh| is_mouth_open(mesh, config.mouth_open_threshold))
        .unwrap_or(false);

    FrameFeatures {
        cursor,
        pinching,
        mouth_open,
    }
}
