//! Error types shared across the crate

use thiserror::Error;

/// Errors produced by the gesture tracker
#[derive(Debug, Error)]
pub enum GestureError {
    #[error("camera error: {0}")]
    Camera(String),
    #[error("model error: {0}")]
    Model(String),
    #[error("inference error: {0}")]
    Inference(String),
    #[error("osc encode error: {0}")]
    OscEncode(String),
    #[error("invalid config: {0}")]
    Config(String),
    #[error("config parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),
    #[error("signal handler error: {0}")]
    Signal(#[from] ctrlc::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience result type used throughout this crate.
pub type Result<T> = std::result::Result<T, GestureError>;
