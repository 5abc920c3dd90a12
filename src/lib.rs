//! Gesture OSC - webcam hand/face gestures as OSC control parameters
//!
//! Captures camera frames, runs hand and face landmark models, derives a
//! smoothed cursor and a pinch + open-mouth gesture with a rising-edge
//! trigger, and sends the result as OSC messages over UDP every frame.

pub mod camera;
pub mod config;
pub mod error;
pub mod gesture;
pub mod landmarks;
pub mod ml;
pub mod osc;
pub mod pipeline;
pub mod telemetry;

pub use config::AppConfig;
pub use error::{GestureError, Result};
pub use gesture::{FrameOutput, GestureTracker};
pub use pipeline::{Pipeline, StopReason};
