//! Single-shot box detectors (palm and face)
//!
//! Both MediaPipe detectors share one anchor scheme: a fixed-size anchor
//! grid per stride, two anchors per layer at every cell. Each anchor
//! regresses a box plus a handful of keypoints relative to its center.

/// Anchor layout and output shape of a box detector
#[derive(Clone, Copy, Debug)]
pub struct SsdModel {
    pub file_name: &'static str,
    /// Square input side in pixels
    pub input_size: u32,
    /// Stride of every anchor layer; equal neighbours share a feature map
    pub strides: &'static [u32],
    pub keypoint_count: usize,
}

impl SsdModel {
    /// Values regressed per anchor: box (cx, cy, w, h) then keypoints
    pub fn coords_per_anchor(&self) -> usize {
        4 + 2 * self.keypoint_count
    }
}

pub const PALM_MODEL: SsdModel = SsdModel {
    file_name: "palm_detection.onnx",
    input_size: 192,
    strides: &[8, 16, 16, 16],
    keypoint_count: 7,
};

pub const FACE_DETECTION_MODEL: SsdModel = SsdModel {
    file_name: "face_detection.onnx",
    input_size: 128,
    strides: &[8, 16, 16, 16],
    keypoint_count: 6,
};

/// Anchor centers, normalized to the model input
pub fn generate_anchors(model: &SsdModel) -> Vec<(f32, f32)> {
    let mut anchors = Vec::new();
    let mut layer = 0;

    while layer < model.strides.len() {
        let stride = model.strides[layer];
        let mut same = 0;
        while layer + same < model.strides.len() && model.strides[layer + same] == stride {
            same += 1;
        }
        let per_cell = 2 * same;

        let feature_size = (model.input_size as f32 / stride as f32).ceil() as usize;
        for y in 0..feature_size {
            for x in 0..feature_size {
                let cx = (x as f32 + 0.5) / feature_size as f32;
                let cy = (y as f32 + 0.5) / feature_size as f32;
                anchors.extend(std::iter::repeat((cx, cy)).take(per_cell));
            }
        }
        layer += same;
    }
    anchors
}

/// A decoded box, normalized to the model input
#[derive(Clone, Debug, PartialEq)]
pub struct BoxDetection {
    pub score: f32,
    pub cx: f32,
    pub cy: f32,
    pub width: f32,
    pub height: f32,
    pub keypoints: Vec<(f32, f32)>,
}

fn sigmoid(raw: f32) -> f32 {
    1.0 / (1.0 + (-raw.clamp(-100.0, 100.0)).exp())
}

/// Highest-scoring box at or above `min_score`
///
/// `regressors` holds `coords_per_anchor` values per anchor and `scores` one
/// logit per anchor. Returns `None` when nothing passes or the buffers are short.
pub fn decode_best(
    model: &SsdModel,
    anchors: &[(f32, f32)],
    regressors: &[f32],
    scores: &[f32],
    min_score: f32,
) -> Option<BoxDetection> {
    let coords = model.coords_per_anchor();
    if scores.len() < anchors.len() || regressors.len() < anchors.len() * coords {
        return None;
    }

    let (best, score) = scores[..anchors.len()]
        .iter()
        .map(|&raw| sigmoid(raw))
        .enumerate()
        .filter(|&(_, score)| score >= min_score)
        .max_by(|a, b| a.1.total_cmp(&b.1))?;

    let size = model.input_size as f32;
    let (ax, ay) = anchors[best];
    let raw = &regressors[best * coords..(best + 1) * coords];
    let keypoints = raw[4..]
        .chunks_exact(2)
        .map(|k| (k[0] / size + ax, k[1] / size + ay))
        .collect();

    Some(BoxDetection {
        score,
        cx: raw[0] / size + ax,
        cy: raw[1] / size + ay,
        width: raw[2] / size,
        height: raw[3] / size,
        keypoints,
    })
}
