//! ML inference module
//!
//! Provides hand and face landmark detection using ONNX Runtime, with the
//! MediaPipe models as exported by the PINTO Model Zoo. Each of hand and
//! face is a two-model stage: a box detector on the letterboxed frame finds
//! a region, the landmark model runs on that region, and the region derived
//! from the landmarks is reused on the next frame while tracking holds.

pub mod roi;
pub mod ssd;
pub mod tracking;

use std::path::{Path, PathBuf};

use ndarray::Array4;

pub use roi::{preprocess_nhwc, InputRange, Roi, RoiParams};
pub use ssd::{BoxDetection, SsdModel, FACE_DETECTION_MODEL, PALM_MODEL};
pub use tracking::{RoiTracker, StageThresholds};

use crate::camera::CameraFrame;
use crate::config::DetectorConfig;
use crate::error::{GestureError, Result};
use crate::landmarks::{
    Detections, FaceLandmarks, HandLandmarks, Landmark, FACE_LANDMARK_COUNT, HAND_LANDMARK_COUNT,
};

/// Anything that turns a frame into landmark detections
pub trait LandmarkDetector {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Detections>;
}

/// How a model reports its presence score
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScoreActivation {
    /// Already a probability in [0, 1]
    Probability,
    /// Raw logit, needs a sigmoid
    Logit,
}

impl ScoreActivation {
    pub fn apply(self, raw: f32) -> f32 {
        match self {
            ScoreActivation::Probability => raw,
            ScoreActivation::Logit => 1.0 / (1.0 + (-raw).exp()),
        }
    }
}

/// Static description of a landmark model
#[derive(Clone, Copy, Debug)]
pub struct LandmarkModel {
    pub file_name: &'static str,
    /// Square input side in pixels
    pub input_size: u32,
    pub landmark_count: usize,
    pub score: ScoreActivation,
    pub range: InputRange,
}

pub const HAND_MODEL: LandmarkModel = LandmarkModel {
    file_name: "hand_landmark.onnx",
    input_size: 224,
    landmark_count: HAND_LANDMARK_COUNT,
    score: ScoreActivation::Probability,
    range: InputRange::ZeroToOne,
};

pub const FACE_MODEL: LandmarkModel = LandmarkModel {
    file_name: "face_landmark.onnx",
    input_size: 192,
    landmark_count: FACE_LANDMARK_COUNT,
    score: ScoreActivation::Logit,
    range: InputRange::ZeroToOne,
};

/// Detector + landmark model pair and how regions are derived for it
#[derive(Clone, Copy, Debug)]
pub struct StageSpec {
    pub name: &'static str,
    pub detector: SsdModel,
    pub detector_range: InputRange,
    pub landmarks: LandmarkModel,
    /// Region from a detector box
    pub detection_roi: RoiParams,
    /// Region from the previous frame's landmarks
    pub tracking_roi: RoiParams,
}

pub const HAND_STAGE: StageSpec = StageSpec {
    name: "hand",
    detector: PALM_MODEL,
    detector_range: InputRange::ZeroToOne,
    landmarks: HAND_MODEL,
    detection_roi: RoiParams::PALM,
    tracking_roi: RoiParams::HAND,
};

pub const FACE_STAGE: StageSpec = StageSpec {
    name: "face",
    detector: FACE_DETECTION_MODEL,
    detector_range: InputRange::MinusOneToOne,
    landmarks: FACE_MODEL,
    detection_roi: RoiParams::FACE_BOX,
    tracking_roi: RoiParams::FACE,
};

/// Decode raw model outputs into frame-space landmarks and a presence score.
///
/// The landmark tensor is the first output holding at least
/// `landmark_count * 3` values; the score is the first single-value output.
pub fn decode_landmarks(
    outputs: &[Vec<f32>],
    model: &LandmarkModel,
    roi: &Roi,
    width: u32,
    height: u32,
) -> Result<(Vec<Landmark>, f32)> {
    let needed = model.landmark_count * 3;
    let coords = outputs
        .iter()
        .find(|o| o.len() >= needed)
        .ok_or_else(|| GestureError::Inference(format!("{}: no landmark output", model.file_name)))?;
    let score = outputs
        .iter()
        .find(|o| o.len() == 1)
        .map(|o| model.score.apply(o[0]))
        .ok_or_else(|| GestureError::Inference(format!("{}: no score output", model.file_name)))?;

    let landmarks = coords[..needed]
        .chunks_exact(3)
        .map(|p| {
            let (x, y) = roi.to_frame(p[0], p[1], model.input_size, width, height);
            Landmark {
                x,
                y,
                z: p[2] / model.input_size as f32,
            }
        })
        .collect();

    Ok((landmarks, score))
}

/// Pick the box regressors and the score logits out of a detector's outputs
pub fn split_detector_outputs<'a>(
    outputs: &'a [Vec<f32>],
    model: &SsdModel,
    anchor_count: usize,
) -> Result<(&'a [f32], &'a [f32])> {
    let regressors = outputs
        .iter()
        .find(|o| o.len() == anchor_count * model.coords_per_anchor())
        .ok_or_else(|| GestureError::Inference(format!("{}: no box output", model.file_name)))?;
    let scores = outputs
        .iter()
        .find(|o| o.len() == anchor_count)
        .ok_or_else(|| GestureError::Inference(format!("{}: no score output", model.file_name)))?;
    Ok((regressors, scores))
}

/// Landmark region for a detector box found on the letterboxed frame
pub fn detection_roi(det: &BoxDetection, letterbox: &Roi, model: &SsdModel, params: &RoiParams) -> Option<Roi> {
    let size = model.input_size;
    let to_px = |(x, y): (f32, f32)| letterbox.to_frame_px(x * size as f32, y * size as f32, size);

    let (cx, cy) = to_px((det.cx, det.cy));
    let from = to_px(*det.keypoints.get(params.rotation_from)?);
    let to = to_px(*det.keypoints.get(params.rotation_to)?);
    let rotation = roi::rotation_between(from, to, params.target_angle);

    Some(roi::roi_from_box(
        cx,
        cy,
        det.width * letterbox.side,
        det.height * letterbox.side,
        rotation,
        params,
    ))
}

/// Region for the next frame from normalized landmarks
pub fn tracking_roi(points: &[Landmark], width: u32, height: u32, params: &RoiParams) -> Option<Roi> {
    let pixels: Vec<(f32, f32)> = points
        .iter()
        .map(|p| (p.x * width as f32, p.y * height as f32))
        .collect();
    roi::roi_from_points(&pixels, params)
}

/// Find the models directory
pub fn find_model_dir() -> Result<PathBuf> {
    // Try relative to executable first
    if let Ok(exe_path) = std::env::current_exe() {
        for dir in exe_path.ancestors().skip(1).take(3) {
            let model_dir = dir.join("models");
            if model_dir.exists() {
                return Ok(model_dir);
            }
        }
    }

    let model_dir = std::env::current_dir()?.join("models");
    if model_dir.exists() {
        return Ok(model_dir);
    }

    Err(GestureError::Model(
        "Models directory not found. Create a 'models' directory with palm_detection.onnx, \
         hand_landmark.onnx, face_detection.onnx and face_landmark.onnx."
            .to_string(),
    ))
}

fn load_session(model_dir: &Path, file_name: &str, threads: usize) -> Result<ort::session::Session> {
    let path = model_dir.join(file_name);
    if !path.exists() {
        return Err(GestureError::Model(format!("Model not found: {:?}", path)));
    }

    let session = ort::session::Session::builder()
        .map_err(|e| GestureError::Model(format!("Failed to create session builder: {}", e)))?
        .with_intra_threads(threads)
        .map_err(|e| GestureError::Model(format!("Failed to set threads: {}", e)))?
        .commit_from_file(&path)
        .map_err(|e| GestureError::Model(format!("Failed to load {:?}: {}", path, e)))?;

    log::info!("Loaded {} from {:?}", file_name, path);
    Ok(session)
}

/// Run one model on an NHWC input and return every output flattened to f32
fn run_model(session: &mut ort::session::Session, input: Vec<f32>, size: u32) -> Result<Vec<Vec<f32>>> {
    let input_array = Array4::from_shape_vec((1, size as usize, size as usize, 3), input)
        .map_err(|e| GestureError::Inference(format!("Failed to create input array: {}", e)))?;

    let input_tensor = ort::value::Tensor::from_array(input_array)
        .map_err(|e| GestureError::Inference(format!("Failed to create tensor: {}", e)))?;

    let outputs = session
        .run(ort::inputs![input_tensor])
        .map_err(|e| GestureError::Inference(format!("Inference failed: {}", e)))?;

    let mut flattened = Vec::new();
    for (_name, value) in outputs.iter() {
        // Non-f32 outputs are skipped
        if let Ok((_shape, data)) = value.try_extract_tensor::<f32>() {
            flattened.push(data.to_vec());
        }
    }
    Ok(flattened)
}

/// One detect-then-track landmark stage
struct LandmarkStage {
    spec: StageSpec,
    detector: ort::session::Session,
    landmarks: ort::session::Session,
    anchors: Vec<(f32, f32)>,
    tracker: RoiTracker,
}

impl LandmarkStage {
    fn load(model_dir: &Path, spec: StageSpec, thresholds: StageThresholds, threads: usize) -> Result<Self> {
        let detector = load_session(model_dir, spec.detector.file_name, threads)?;
        let landmarks = load_session(model_dir, spec.landmarks.file_name, threads)?;
        log::info!(
            "{} stage: detection >= {:.2}, tracking >= {:.2}",
            spec.name,
            thresholds.min_detection_confidence,
            thresholds.min_tracking_confidence
        );
        Ok(Self {
            spec,
            detector,
            landmarks,
            anchors: ssd::generate_anchors(&spec.detector),
            tracker: RoiTracker::new(thresholds),
        })
    }

    /// Run the box detector on the letterboxed frame
    fn detect_roi(&mut self, frame: &CameraFrame) -> Result<Option<Roi>> {
        let model = self.spec.detector;
        let letterbox = Roi::letterbox(frame.width, frame.height);
        let input = preprocess_nhwc(frame, &letterbox, model.input_size, self.spec.detector_range);
        let outputs = run_model(&mut self.detector, input, model.input_size)?;
        let (regressors, scores) = split_detector_outputs(&outputs, &model, self.anchors.len())?;

        let Some(det) = ssd::decode_best(&model, &self.anchors, regressors, scores, 0.0) else {
            return Ok(None);
        };
        if !self.tracker.accept_detection(det.score) {
            return Ok(None);
        }
        log::debug!("{} detected (score {:.2})", self.spec.name, det.score);
        Ok(detection_roi(&det, &letterbox, &model, &self.spec.detection_roi))
    }

    fn run(&mut self, frame: &CameraFrame) -> Result<Option<(Vec<Landmark>, f32)>> {
        let roi = match self.tracker.tracked() {
            Some(roi) => roi,
            None => match self.detect_roi(frame)? {
                Some(roi) => roi,
                None => return Ok(None),
            },
        };

        let model = self.spec.landmarks;
        let input = preprocess_nhwc(frame, &roi, model.input_size, model.range);
        let outputs = run_model(&mut self.landmarks, input, model.input_size)?;
        let (points, presence) = decode_landmarks(&outputs, &model, &roi, frame.width, frame.height)?;

        let next = tracking_roi(&points, frame.width, frame.height, &self.spec.tracking_roi);
        let was_tracking = self.tracker.tracked().is_some();
        if self.tracker.accept_landmarks(presence, next) {
            Ok(Some((points, presence)))
        } else {
            if was_tracking {
                log::debug!("{} lost (presence {:.2})", self.spec.name, presence);
            }
            Ok(None)
        }
    }

    /// Like `run`, but a failed frame also drops tracking
    fn process(&mut self, frame: &CameraFrame) -> Result<Option<(Vec<Landmark>, f32)>> {
        let result = self.run(frame);
        if result.is_err() {
            self.tracker.reset();
        }
        result
    }
}

/// Hand and face landmark detection backed by ONNX Runtime
pub struct OnnxLandmarkDetector {
    hand: LandmarkStage,
    face: LandmarkStage,
}

impl OnnxLandmarkDetector {
    /// Load all four models into ONNX Runtime sessions
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        let model_dir = match &config.model_dir {
            Some(dir) => dir.clone(),
            None => find_model_dir()?,
        };
        log::info!("Model directory: {:?}", model_dir);

        let hand = LandmarkStage::load(
            &model_dir,
            HAND_STAGE,
            StageThresholds {
                min_detection_confidence: config.hand_min_detection_confidence,
                min_tracking_confidence: config.hand_min_tracking_confidence,
            },
            config.threads,
        )?;
        let face = LandmarkStage::load(
            &model_dir,
            FACE_STAGE,
            StageThresholds {
                min_detection_confidence: config.face_min_detection_confidence,
                min_tracking_confidence: config.face_min_tracking_confidence,
            },
            config.threads,
        )?;

        Ok(Self { hand, face })
    }
}

impl LandmarkDetector for OnnxLandmarkDetector {
    fn detect(&mut self, frame: &CameraFrame) -> Result<Detections> {
        let mut detections = Detections::none(frame.frame_number);

        if let Some((points, score)) = self.hand.process(frame)? {
            let points: [Landmark; HAND_LANDMARK_COUNT] = points
                .try_into()
                .map_err(|_| GestureError::Inference("hand landmark count mismatch".to_string()))?;
            detections.hand = Some(HandLandmarks {
                points,
                confidence: score,
            });
        }

        if let Some((points, score)) = self.face.process(frame)? {
            detections.face = Some(FaceLandmarks {
                points,
                confidence: score,
            });
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letterboxed_landmarks_cover_full_width() {
        // Landmarks at the model's left and right edges reach the frame edges
        let mut coords = vec![0.0f32; HAND_LANDMARK_COUNT * 3];
        coords[0] = 0.0;
        coords[1] = 112.0;
        coords[3] = 224.0;
        coords[4] = 112.0;
        let outputs = vec![coords, vec![0.9]];

        let roi = Roi::letterbox(1280, 720);
        let (points, _) = decode_landmarks(&outputs, &HAND_MODEL, &roi, 1280, 720).unwrap();
        assert!(points[0].x.abs() < 1e-5);
        assert!((points[1].x - 1.0).abs() < 1e-5);
        assert!((points[0].y - 0.5).abs() < 1e-5);
    }

    #[test]
    fn test_decode_landmarks_picks_outputs() {
        let mut coords = vec![0.0f32; HAND_LANDMARK_COUNT * 3];
        // Landmark 8 at the center of the model input
        coords[8 * 3] = 112.0;
        coords[8 * 3 + 1] = 112.0;
        let outputs = vec![coords, vec![0.9], vec![0.4, 0.6]];

        let roi = Roi::letterbox(100, 100);
        let (points, score) = decode_landmarks(&outputs, &HAND_MODEL, &roi, 100, 100).unwrap();
        assert_eq!(points.len(), HAND_LANDMARK_COUNT);
        assert!((points[8].x - 0.5).abs() < 1e-6);
        assert!((points[8].y - 0.5).abs() < 1e-6);
        assert!((score - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_decode_face_applies_sigmoid() {
        let outputs = vec![vec![0.0f32; FACE_LANDMARK_COUNT * 3], vec![0.0]];
        let roi = Roi::letterbox(192, 192);
        let (points, score) = decode_landmarks(&outputs, &FACE_MODEL, &roi, 192, 192).unwrap();
        assert_eq!(points.len(), FACE_LANDMARK_COUNT);
        assert!((score - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_decode_missing_outputs() {
        let roi = Roi::letterbox(10, 10);
        let err = decode_landmarks(&[vec![0.5]], &HAND_MODEL, &roi, 10, 10).unwrap_err();
        assert!(matches!(err, GestureError::Inference(_)));
    }

    #[test]
    fn test_landmarks_inside_rotated_roi() {
        let roi = Roi {
            cx: 50.0,
            cy: 50.0,
            side: 20.0,
            rotation: std::f32::consts::PI,
        };
        let mut coords = vec![0.0f32; HAND_LANDMARK_COUNT * 3];
        coords[0] = 0.0;
        coords[1] = 0.0;
        let (points, _) = decode_landmarks(&[coords, vec![1.0]], &HAND_MODEL, &roi, 100, 100).unwrap();
        // Upside-down region: model top-left is frame bottom-right
        assert!((points[0].x - 0.6).abs() < 1e-5);
        assert!((points[0].y - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_split_detector_outputs() {
        let anchors = ssd::generate_anchors(&FACE_DETECTION_MODEL);
        let outputs = vec![
            vec![0.0; anchors.len()],
            vec![1.0; anchors.len() * FACE_DETECTION_MODEL.coords_per_anchor()],
        ];
        let (regressors, scores) = split_detector_outputs(&outputs, &FACE_DETECTION_MODEL, anchors.len()).unwrap();
        assert_eq!(regressors.len(), 896 * 16);
        assert_eq!(scores.len(), 896);

        let err = split_detector_outputs(&outputs[..1], &FACE_DETECTION_MODEL, anchors.len()).unwrap_err();
        assert!(matches!(err, GestureError::Inference(_)));
    }

    #[test]
    fn test_palm_box_to_hand_roi() {
        let letterbox = Roi::letterbox(1280, 720);
        let mut keypoints = vec![(0.5, 0.5); 7];
        keypoints[0] = (0.5, 0.6);
        keypoints[2] = (0.5, 0.4);
        let det = BoxDetection {
            score: 0.9,
            cx: 0.5,
            cy: 0.5,
            width: 0.1,
            height: 0.1,
            keypoints,
        };
        let roi = detection_roi(&det, &letterbox, &PALM_MODEL, &RoiParams::PALM).unwrap();
        assert!(roi.rotation.abs() < 1e-5);
        assert!((roi.cx - 640.0).abs() < 1e-3);
        // Shifted half a box toward the fingers
        assert!((roi.cy - (360.0 - 64.0)).abs() < 1e-3);
        assert!((roi.side - 128.0 * 2.6).abs() < 1e-3);
    }

    #[test]
    fn test_face_box_needs_eye_keypoints() {
        let det = BoxDetection {
            score: 0.9,
            cx: 0.5,
            cy: 0.5,
            width: 0.2,
            height: 0.2,
            keypoints: vec![(0.4, 0.4)],
        };
        let letterbox = Roi::letterbox(640, 480);
        assert!(detection_roi(&det, &letterbox, &FACE_DETECTION_MODEL, &RoiParams::FACE_BOX).is_none());
    }

    #[test]
    fn test_tracking_roi_follows_hand() {
        let mut points = vec![Landmark::new(0.5, 0.5); HAND_LANDMARK_COUNT];
        points[0] = Landmark::new(0.5, 0.6);
        points[9] = Landmark::new(0.5, 0.4);
        let roi = tracking_roi(&points, 100, 100, &RoiParams::HAND).unwrap();
        assert!(roi.rotation.abs() < 1e-5);
        assert!((roi.cx - 50.0).abs() < 1e-3);
        assert!((roi.side - 40.0).abs() < 1e-3);
    }

    #[test]
    fn test_stage_thresholds_follow_config() {
        let config = DetectorConfig::default();
        let mut face = RoiTracker::new(StageThresholds {
            min_detection_confidence: config.face_min_detection_confidence,
            min_tracking_confidence: config.face_min_tracking_confidence,
        });
        let mut hand = RoiTracker::new(StageThresholds {
            min_detection_confidence: config.hand_min_detection_confidence,
            min_tracking_confidence: config.hand_min_tracking_confidence,
        });
        // A face at 0.6 counts; a hand at 0.6 does not
        assert!(face.accept_detection(0.6) && face.accept_landmarks(0.6, None));
        assert!(!hand.accept_detection(0.6) && !hand.accept_landmarks(0.6, None));
    }
}
