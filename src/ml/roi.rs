//! Regions of interest fed to the models
//!
//! A region is a square in frame pixels, possibly rotated and possibly
//! reaching past the frame edges. Sampling outside the frame yields zero
//! (black padding), so a region larger than the frame letterboxes it.

use std::f32::consts::PI;

use crate::camera::CameraFrame;

/// Pixel value range a model expects
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputRange {
    /// `p / 255`
    ZeroToOne,
    /// `p / 127.5 - 1`
    MinusOneToOne,
}

impl InputRange {
    pub fn normalize(self, p: u8) -> f32 {
        match self {
            InputRange::ZeroToOne => p as f32 / 255.0,
            InputRange::MinusOneToOne => p as f32 / 127.5 - 1.0,
        }
    }

    /// Value written for pixels that fall outside the frame
    pub fn padding(self) -> f32 {
        self.normalize(0)
    }
}

/// Square sampling region in frame pixel coordinates
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Roi {
    pub cx: f32,
    pub cy: f32,
    pub side: f32,
    /// Radians, clockwise on screen (y points down)
    pub rotation: f32,
}

impl Roi {
    /// Whole frame, padded top/bottom or left/right to a square
    pub fn letterbox(width: u32, height: u32) -> Self {
        Self {
            cx: width as f32 / 2.0,
            cy: height as f32 / 2.0,
            side: width.max(height) as f32,
            rotation: 0.0,
        }
    }

    /// Map a model-space pixel to frame pixels
    pub fn to_frame_px(&self, px: f32, py: f32, input_size: u32) -> (f32, f32) {
        let u = (px / input_size as f32 - 0.5) * self.side;
        let v = (py / input_size as f32 - 0.5) * self.side;
        let (sin, cos) = self.rotation.sin_cos();
        (self.cx + u * cos - v * sin, self.cy + u * sin + v * cos)
    }

    /// Map a model-space pixel to normalized frame coordinates
    pub fn to_frame(&self, px: f32, py: f32, input_size: u32, width: u32, height: u32) -> (f32, f32) {
        let (x, y) = self.to_frame_px(px, py, input_size);
        (x / width as f32, y / height as f32)
    }
}

/// Sample the region into a `size`x`size` NHWC f32 buffer
///
/// Nearest-neighbour sampling; pixels outside the frame are padding.
pub fn preprocess_nhwc(frame: &CameraFrame, roi: &Roi, size: u32, range: InputRange) -> Vec<f32> {
    let mut output = vec![range.padding(); (size * size * 3) as usize];

    for y in 0..size {
        for x in 0..size {
            let (fx, fy) = roi.to_frame_px(x as f32 + 0.5, y as f32 + 0.5, size);
            if fx < 0.0 || fy < 0.0 {
                continue;
            }
            if let Some(rgb) = frame.pixel(fx as u32, fy as u32) {
                // HWC format: [y][x][channel]
                let out_idx = ((y * size + x) * 3) as usize;
                for (c, &p) in rgb.iter().enumerate() {
                    output[out_idx + c] = range.normalize(p);
                }
            }
        }
    }

    output
}

/// How a detection or a landmark set is turned into the next region
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RoiParams {
    /// Points whose direction sets the rotation
    pub rotation_from: usize,
    pub rotation_to: usize,
    /// Angle that direction should have once the region is upright
    pub target_angle: f32,
    /// Side multiplier applied to the longer box edge
    pub scale: f32,
    /// Center shift along the region's vertical axis, in box heights
    pub shift_y: f32,
}

impl RoiParams {
    /// Palm box: wrist to middle finger base points up
    pub const PALM: RoiParams = RoiParams {
        rotation_from: 0,
        rotation_to: 2,
        target_angle: PI / 2.0,
        scale: 2.6,
        shift_y: -0.5,
    };

    /// Tracked hand: wrist (0) to middle finger MCP (9) points up
    pub const HAND: RoiParams = RoiParams {
        rotation_from: 0,
        rotation_to: 9,
        target_angle: PI / 2.0,
        scale: 2.0,
        shift_y: -0.1,
    };

    /// Face box: right eye to left eye is horizontal
    pub const FACE_BOX: RoiParams = RoiParams {
        rotation_from: 0,
        rotation_to: 1,
        target_angle: 0.0,
        scale: 1.5,
        shift_y: 0.0,
    };

    /// Tracked face: outer eye corners 33 and 263 are horizontal
    pub const FACE: RoiParams = RoiParams {
        rotation_from: 33,
        rotation_to: 263,
        target_angle: 0.0,
        scale: 1.5,
        shift_y: 0.0,
    };
}

/// Wrap an angle into [-π, π)
pub fn normalize_radians(angle: f32) -> f32 {
    angle - 2.0 * PI * ((angle + PI) / (2.0 * PI)).floor()
}

/// Rotation that brings `from -> to` onto the target angle
pub fn rotation_between(from: (f32, f32), to: (f32, f32), target_angle: f32) -> f32 {
    // y is flipped so angles read counter-clockwise as usual
    normalize_radians(target_angle - (-(to.1 - from.1)).atan2(to.0 - from.0))
}

/// Square region around a box of `width`x`height` pixels centered at `(cx, cy)`
pub fn roi_from_box(cx: f32, cy: f32, width: f32, height: f32, rotation: f32, params: &RoiParams) -> Roi {
    let (sin, cos) = rotation.sin_cos();
    let shift = height * params.shift_y;
    Roi {
        cx: cx - shift * sin,
        cy: cy + shift * cos,
        side: width.max(height) * params.scale,
        rotation,
    }
}

/// Region enclosing a set of frame-pixel points, aligned to their rotation
///
/// Returns `None` when the rotation points are missing.
pub fn roi_from_points(points: &[(f32, f32)], params: &RoiParams) -> Option<Roi> {
    let from = *points.get(params.rotation_from)?;
    let to = *points.get(params.rotation_to)?;
    let rotation = rotation_between(from, to, params.target_angle);
    let (sin, cos) = rotation.sin_cos();

    // Bounding box in the region's own axes, relative to the first point
    let (ox, oy) = points[0];
    let (mut min_u, mut max_u) = (f32::MAX, f32::MIN);
    let (mut min_v, mut max_v) = (f32::MAX, f32::MIN);
    for &(x, y) in points {
        let (dx, dy) = (x - ox, y - oy);
        let u = dx * cos + dy * sin;
        let v = -dx * sin + dy * cos;
        min_u = min_u.min(u);
        max_u = max_u.max(u);
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }

    let (cu, cv) = ((min_u + max_u) / 2.0, (min_v + max_v) / 2.0);
    let cx = ox + cu * cos - cv * sin;
    let cy = oy + cu * sin + cv * cos;
    Some(roi_from_box(cx, cy, max_u - min_u, max_v - min_v, rotation, params))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-3
    }

    #[test]
    fn test_letterbox_reaches_frame_edges() {
        let roi = Roi::letterbox(1280, 720);
        let (x0, y0) = roi.to_frame(0.0, 0.0, 224, 1280, 720);
        let (x1, y1) = roi.to_frame(224.0, 224.0, 224, 1280, 720);
        assert!(close(x0, 0.0));
        assert!(close(x1, 1.0));
        // Padding rows sit above and below the frame
        assert!(y0 < 0.0);
        assert!(y1 > 1.0);
        let (_, mid) = roi.to_frame(112.0, 112.0, 224, 1280, 720);
        assert!(close(mid, 0.5));
    }

    #[test]
    fn test_letterbox_portrait() {
        let roi = Roi::letterbox(480, 640);
        let (x0, y0) = roi.to_frame(0.0, 0.0, 192, 480, 640);
        let (x1, y1) = roi.to_frame(192.0, 192.0, 192, 480, 640);
        assert!(close(y0, 0.0));
        assert!(close(y1, 1.0));
        assert!(x0 < 0.0 && x1 > 1.0);
    }

    #[test]
    fn test_preprocess_pads_outside_frame() {
        let mut frame = CameraFrame::blank(4, 2, 0);
        for px in frame.data.chunks_exact_mut(3) {
            px.copy_from_slice(&[255, 0, 51]);
        }
        // 4x4 square around a 4x2 frame: first and last rows are padding
        let input = preprocess_nhwc(&frame, &Roi::letterbox(4, 2), 4, InputRange::ZeroToOne);
        assert_eq!(input.len(), 4 * 4 * 3);
        assert!(input[..12].iter().all(|&v| v == 0.0));
        let row1 = &input[12..15];
        assert!(close(row1[0], 1.0) && close(row1[1], 0.0) && close(row1[2], 0.2));
        assert!(input[36..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_minus_one_range_padding() {
        let frame = CameraFrame::blank(2, 1, 0);
        let input = preprocess_nhwc(&frame, &Roi::letterbox(2, 1), 2, InputRange::MinusOneToOne);
        assert!(input.iter().all(|&v| close(v, -1.0)));
        assert!(close(InputRange::MinusOneToOne.normalize(255), 1.0));
    }

    #[test]
    fn test_rotated_roi_maps_up_to_right() {
        let roi = Roi {
            cx: 100.0,
            cy: 100.0,
            side: 50.0,
            rotation: PI / 2.0,
        };
        // Top-center of the model input lands right of the center in the frame
        let (x, y) = roi.to_frame_px(112.0, 0.0, 224);
        assert!(close(x, 125.0));
        assert!(close(y, 100.0));
    }

    #[test]
    fn test_rotation_between() {
        // Upright hand: wrist below the knuckle
        assert!(close(rotation_between((0.0, 10.0), (0.0, 0.0), PI / 2.0), 0.0));
        // Fingers pointing right
        assert!(close(rotation_between((0.0, 0.0), (10.0, 0.0), PI / 2.0), PI / 2.0));
        // Level eyes
        assert!(close(rotation_between((0.0, 0.0), (10.0, 0.0), 0.0), 0.0));
    }

    #[test]
    fn test_normalize_radians() {
        assert!(close(normalize_radians(3.0 * PI / 2.0), -PI / 2.0));
        assert!(close(normalize_radians(-3.0 * PI / 2.0), PI / 2.0));
        assert!(close(normalize_radians(0.25), 0.25));
    }

    #[test]
    fn test_roi_from_box_shifts_up() {
        let roi = roi_from_box(100.0, 100.0, 20.0, 40.0, 0.0, &RoiParams::PALM);
        assert!(close(roi.cx, 100.0));
        assert!(close(roi.cy, 80.0));
        assert!(close(roi.side, 104.0));
    }

    #[test]
    fn test_roi_from_points_upright() {
        let params = RoiParams {
            rotation_from: 0,
            rotation_to: 1,
            target_angle: PI / 2.0,
            scale: 1.0,
            shift_y: 0.0,
        };
        let points = [(50.0, 100.0), (50.0, 60.0), (30.0, 80.0), (70.0, 80.0)];
        let roi = roi_from_points(&points, &params).unwrap();
        assert!(close(roi.rotation, 0.0));
        assert!(close(roi.cx, 50.0));
        assert!(close(roi.cy, 80.0));
        assert!(close(roi.side, 40.0));
    }

    #[test]
    fn test_roi_from_points_missing_index() {
        assert!(roi_from_points(&[(0.0, 0.0)], &RoiParams::HAND).is_none());
    }
}
