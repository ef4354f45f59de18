//! Draws pupil markers and region outlines for display.

use crate::pupil_tracker::{Freshness, Keypoint, PupilReading};
use crate::region::Region;
use crate::utils::safe_cast::{f32_to_i32_clamp, round_to_pixel};
use crate::Result;
use opencv::core::{Mat, Point, Scalar};
use opencv::imgproc::{self, LINE_AA, LINE_8};
use opencv::prelude::*;

/// Marker color for pupils detected in the current frame (BGR red)
pub const FRESH_COLOR: (f64, f64, f64) = (0.0, 0.0, 255.0);

/// Marker color for carried-over pupils (BGR orange)
pub const STALE_COLOR: (f64, f64, f64) = (0.0, 165.0, 255.0);

/// Outline color for face and eye regions (BGR green)
pub const REGION_COLOR: (f64, f64, f64) = (0.0, 255.0, 0.0);

fn scalar((b, g, r): (f64, f64, f64)) -> Scalar {
    Scalar::new(b, g, r, 0.0)
}

/// Draw one circle per keypoint, radius half the keypoint size, plus a
/// center dot.
///
/// # Errors
///
/// Returns an error if drawing fails.
pub fn draw_keypoints(image: &mut Mat, keypoints: &[Keypoint], color: Scalar) -> Result<()> {
    let max_x = (image.cols() - 1).max(0);
    let max_y = (image.rows() - 1).max(0);
    for kp in keypoints {
        let center = Point::new(round_to_pixel(kp.x, 0, max_x), round_to_pixel(kp.y, 0, max_y));
        let radius = f32_to_i32_clamp(kp.size / 2.0, 1, image.cols().max(image.rows()).max(1));
        imgproc::circle(image, center, radius, color, 1, LINE_AA, 0)?;
        imgproc::circle(image, center, 1, color, -1, LINE_8, 0)?;
    }
    Ok(())
}

/// Draw the reading for one eye, colored by freshness.
///
/// # Errors
///
/// Returns an error if drawing fails.
pub fn draw_reading(image: &mut Mat, reading: &PupilReading) -> Result<()> {
    let color = match reading.freshness {
        Freshness::Fresh => scalar(FRESH_COLOR),
        Freshness::Stale => scalar(STALE_COLOR),
    };
    draw_keypoints(image, &[reading.keypoint], color)
}

/// Outline a region.
///
/// # Errors
///
/// Returns an error if drawing fails.
pub fn draw_region(image: &mut Mat, region: Region) -> Result<()> {
    imgproc::rectangle(image, region.to_rect(), scalar(REGION_COLOR), 2, LINE_8, 0)?;
    Ok(())
}
