//! Configuration for the gesture tracker
//!
//! Every field has a default, so a missing config file (or a partial one)
//! reproduces the stock behaviour: OSC to 127.0.0.1:7000, camera 0 at
//! 1280x720, α = 0.2, pinch < 0.05, mouth gap > 0.02.

use std::fs;
use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{GestureError, Result};

/// OSC output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OscConfig {
    /// Destination host, an IP literal or a resolvable name such as `localhost`
    pub host: String,
    /// Destination UDP port
    pub port: u16,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7000,
        }
    }
}

impl OscConfig {
    /// Resolve host/port into a socket address, taking the first result
    pub fn target(&self) -> Result<SocketAddr> {
        let host = self.host.trim();
        if host.is_empty() {
            return Err(GestureError::Config("OSC host is empty".to_string()));
        }
        let mut addrs = (host, self.port).to_socket_addrs().map_err(|e| {
            GestureError::Config(format!("bad OSC target {}:{}: {}", self.host, self.port, e))
        })?;
        addrs.next().ok_or_else(|| {
            GestureError::Config(format!("OSC target {}:{} resolved to nothing", self.host, self.port))
        })
    }
}

/// Camera settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device index (0 for default)
    pub index: u32,
    /// Requested frame width (best effort)
    pub width: u32,
    /// Requested frame height (best effort)
    pub height: u32,
    /// Requested frame rate (best effort)
    pub fps: u32,
    /// Flip frames horizontally before inference
    pub mirror: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: 1280,
            height: 720,
            fps: 30,
            mirror: true,
        }
    }
}

/// Landmark detector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Directory holding the ONNX models. Searched for when unset.
    pub model_dir: Option<PathBuf>,
    /// Palm detector score needed to start tracking a hand
    pub hand_min_detection_confidence: f32,
    /// Hand landmark presence needed to report the hand and keep its region
    pub hand_min_tracking_confidence: f32,
    /// Face detector score needed to start tracking a face
    pub face_min_detection_confidence: f32,
    /// Face mesh presence needed to report the face and keep its region
    pub face_min_tracking_confidence: f32,
    /// Intra-op threads per ONNX session
    pub threads: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model_dir: None,
            hand_min_detection_confidence: 0.7,
            hand_min_tracking_confidence: 0.7,
            face_min_detection_confidence: 0.5,
            face_min_tracking_confidence: 0.5,
            threads: 2,
        }
    }
}

/// Gesture thresholds and smoothing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// Smoothing factor α in [0, 1]; weight of the new sample
    pub alpha: f32,
    /// Pinch when fingertip distance is strictly below this
    pub pinch_threshold: f32,
    /// Mouth open when the lip gap is strictly above this
    pub mouth_open_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            pinch_threshold: 0.05,
            mouth_open_threshold: 0.02,
        }
    }
}

/// Top-level application config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub osc: OscConfig,
    pub camera: CameraConfig,
    pub detector: DetectorConfig,
    pub gesture: GestureConfig,
}

impl AppConfig {
    /// Load a config from a JSON file and validate it
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config = Self::from_json(&contents)?;
        log::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Parse a config from a JSON string and validate it
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: AppConfig = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        let g = &self.gesture;
        if !(0.0..=1.0).contains(&g.alpha) {
            return Err(GestureError::Config(format!("alpha must be in [0, 1], got {}", g.alpha)));
        }
        if !(g.pinch_threshold > 0.0) {
            return Err(GestureError::Config(format!(
                "pinch_threshold must be positive, got {}",
                g.pinch_threshold
            )));
        }
        if !(g.mouth_open_threshold >= 0.0) {
            return Err(GestureError::Config(format!(
                "mouth_open_threshold must be non-negative, got {}",
                g.mouth_open_threshold
            )));
        }
        let d = &self.detector;
        for (name, value) in [
            ("hand_min_detection_confidence", d.hand_min_detection_confidence),
            ("hand_min_tracking_confidence", d.hand_min_tracking_confidence),
            ("face_min_detection_confidence", d.face_min_detection_confidence),
            ("face_min_tracking_confidence", d.face_min_tracking_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GestureError::Config(format!("{} must be in [0, 1], got {}", name, value)));
            }
        }
        if self.camera.width == 0 || self.camera.height == 0 {
            return Err(GestureError::Config("camera resolution must be non-zero".to_string()));
        }
        self.osc.target()?;
        Ok(())
    }
}
