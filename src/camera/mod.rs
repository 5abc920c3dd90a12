//! Camera capture module
//!
//! Provides cross-platform camera capture using the nokhwa crate.
//! Frames are read synchronously: `next_frame` blocks until the device
//! delivers one.

use std::time::Instant;

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use crate::config::CameraConfig;
use crate::error::{GestureError, Result};

/// Camera frame data
#[derive(Clone)]
pub struct CameraFrame {
    /// RGB pixel data, row-major
    pub data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Frame number
    pub frame_number: u64,
    /// When the frame was read from the device
    pub timestamp: Instant,
}

impl CameraFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, frame_number: u64) -> Self {
        Self {
            data,
            width,
            height,
            frame_number,
            timestamp: Instant::now(),
        }
    }

    /// Solid black frame, mostly useful for tests
    pub fn blank(width: u32, height: u32, frame_number: u64) -> Self {
        Self::new(vec![0u8; (width * height * 3) as usize], width, height, frame_number)
    }

    /// Flip the frame horizontally in place
    pub fn mirror(&mut self) -> Result<()> {
        let data = std::mem::take(&mut self.data);
        let mut image = RgbImage::from_raw(self.width, self.height, data).ok_or_else(|| {
            GestureError::Camera(format!(
                "frame buffer does not match {}x{} RGB",
                self.width, self.height
            ))
        })?;
        image::imageops::flip_horizontal_in_place(&mut image);
        self.data = image.into_raw();
        Ok(())
    }

    /// RGB value at a pixel, `None` outside the frame
    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = ((y * self.width + x) * 3) as usize;
        self.data
            .get(idx..idx + 3)
            .map(|p| [p[0], p[1], p[2]])
    }
}

/// Anything that yields successive frames
pub trait FrameSource {
    /// Block until the next frame is available. An error ends the capture loop.
    fn next_frame(&mut self) -> Result<CameraFrame>;
}

/// Information about an available camera
#[derive(Clone, Debug)]
pub struct CameraInfo {
    /// Camera index
    pub index: u32,
    /// Camera name
    pub name: String,
}

/// List available cameras
pub fn list_cameras() -> Vec<CameraInfo> {
    let mut cameras = Vec::new();

    match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
        Ok(camera_list) => {
            for (idx, info) in camera_list.iter().enumerate() {
                cameras.push(CameraInfo {
                    index: idx as u32,
                    name: info.human_name().to_string(),
                });
            }
        }
        Err(e) => {
            log::warn!("Failed to enumerate cameras: {:?}", e);
        }
    }

    cameras
}

/// Camera capture backed by nokhwa
pub struct CameraCapture {
    camera: Camera,
    mirror: bool,
    frame_count: u64,
}

impl CameraCapture {
    /// Open the configured camera and start streaming
    pub fn open(config: &CameraConfig) -> Result<Self> {
        let mut camera = Self::open_camera(config)?;

        camera
            .open_stream()
            .map_err(|e| GestureError::Camera(format!("Failed to open camera stream: {:?}", e)))?;

        log::info!(
            "Camera opened: {} ({}x{})",
            camera.info().human_name(),
            camera.resolution().width(),
            camera.resolution().height()
        );

        Ok(Self {
            camera,
            mirror: config.mirror,
            frame_count: 0,
        })
    }

    /// Try the requested format first, then progressively looser ones
    fn open_camera(config: &CameraConfig) -> Result<Camera> {
        let index = CameraIndex::Index(config.index);

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(CameraFormat::new(
            Resolution::new(config.width, config.height),
            FrameFormat::MJPEG,
            config.fps,
        )));

        let e = match Camera::new(index.clone(), requested) {
            Ok(c) => return Ok(c),
            Err(e) => e,
        };
        log::warn!(
            "Failed to open camera {} at {}x{}: {:?}",
            config.index,
            config.width,
            config.height,
            e
        );

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let e = match Camera::new(index.clone(), requested) {
            Ok(c) => return Ok(c),
            Err(e) => e,
        };
        log::warn!("Failed with AbsoluteHighestResolution: {:?}", e);

        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::None);
        Camera::new(index, requested).map_err(|e| {
            GestureError::Camera(format!(
                "Failed to open camera {} with all format attempts: {:?}",
                config.index, e
            ))
        })
    }
}

impl FrameSource for CameraCapture {
    fn next_frame(&mut self) -> Result<CameraFrame> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| GestureError::Camera(format!("Failed to capture frame: {:?}", e)))?;

        let image = buffer
            .decode_image::<RgbFormat>()
            .map_err(|e| GestureError::Camera(format!("Failed to decode frame: {:?}", e)))?;

        let mut frame = CameraFrame::new(
            image.into_raw(),
            buffer.resolution().width(),
            buffer.resolution().height(),
            self.frame_count,
        );
        self.frame_count += 1;

        if self.mirror {
            frame.mirror()?;
        }

        Ok(frame)
    }
}

impl Drop for CameraCapture {
    fn drop(&mut self) {
        if let Err(e) = self.camera.stop_stream() {
            log::warn!("Failed to stop camera stream: {:?}", e);
        }
        log::info!("Camera released after {} frames", self.frame_count);
    }
}
