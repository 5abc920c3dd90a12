//! Landmark types produced by the detectors
//!
//! Coordinates are normalized to the frame: x and y in [0, 1] with the
//! origin at the top-left corner. z is relative depth and may be zero.

/// Number of landmarks in a hand
pub const HAND_LANDMARK_COUNT: usize = 21;

/// Number of landmarks in a face mesh (without iris refinement)
pub const FACE_LANDMARK_COUNT: usize = 468;

/// Hand landmark indices
pub mod hand {
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_TIP: usize = 8;
}

/// Face mesh landmark indices
pub mod face {
    /// Upper inner lip
    pub const UPPER_INNER_LIP: usize = 13;
    /// Lower inner lip
    pub const LOWER_INNER_LIP: usize = 14;
}

/// Normalized landmark point
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }

    /// Euclidean distance in the image plane (z is ignored)
    pub fn distance_2d(&self, other: &Landmark) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Landmarks of the most confident detected hand
#[derive(Clone, Debug, PartialEq)]
pub struct HandLandmarks {
    pub points: [Landmark; HAND_LANDMARK_COUNT],
    /// Presence score from the detector
    pub confidence: f32,
}

impl HandLandmarks {
    pub fn new(points: [Landmark; HAND_LANDMARK_COUNT]) -> Self {
        Self {
            points,
            confidence: 1.0,
        }
    }

    pub fn index_tip(&self) -> &Landmark {
        &self.points[hand::INDEX_TIP]
    }

    pub fn thumb_tip(&self) -> &Landmark {
        &self.points[hand::THUMB_TIP]
    }
}

impl Default for HandLandmarks {
    fn default() -> Self {
        Self::new([Landmark::default(); HAND_LANDMARK_COUNT])
    }
}

/// Landmarks of the most confident detected face
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FaceLandmarks {
    pub points: Vec<Landmark>,
    pub confidence: f32,
}

impl FaceLandmarks {
    pub fn new(points: Vec<Landmark>) -> Self {
        Self {
            points,
            confidence: 1.0,
        }
    }

    pub fn get(&self, index: usize) -> Option<&Landmark> {
        self.points.get(index)
    }
}

/// Detector output for a single frame
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Detections {
    pub hand: Option<HandLandmarks>,
    pub face: Option<FaceLandmarks>,
    /// Frame number this result corresponds to
    pub frame_number: u64,
}

impl Detections {
    /// Nothing detected
    pub fn none(frame_number: u64) -> Self {
        Self {
            hand: None,
            face: None,
            frame_number,
        }
    }
}
