//! Frame format helpers: grayscale conversion and pixel buffer descriptions.

use crate::{Error, Result};
use opencv::core::{self, Mat, CV_8U};
use opencv::imgproc;
use opencv::prelude::*;

/// Order of the channels inside one pixel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Single intensity channel
    Gray,
    /// Blue, green, red (OpenCV native)
    Bgr,
    /// Blue, green, red, alpha
    Bgra,
}

/// Everything a display sink needs to reinterpret a buffer without copying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    /// Channels per pixel (1, 3 or 4)
    pub channels: i32,
    pub width: i32,
    pub height: i32,
    /// Bytes between the starts of consecutive rows
    pub stride: usize,
    pub order: ChannelOrder,
}

impl PixelLayout {
    /// Bytes occupied by the pixels of one row, excluding padding
    #[must_use]
    #[allow(clippy::cast_sign_loss)]
    pub fn row_bytes(&self) -> usize {
        self.width.max(0) as usize * self.channels.max(0) as usize
    }
}

/// Describe an 8-bit frame's memory layout.
///
/// Sub-region views keep the stride of their parent, so `stride` may be
/// larger than `width * channels`.
///
/// # Errors
///
/// Returns `InvalidInput` for empty frames, non 8-bit depth or unsupported
/// channel counts.
pub fn describe(frame: &Mat) -> Result<PixelLayout> {
    if frame.empty() {
        return Err(Error::InvalidInput("Cannot describe an empty frame".to_string()));
    }
    if frame.depth() != CV_8U {
        return Err(Error::InvalidInput(format!(
            "Expected 8-bit frame, got depth {}",
            frame.depth()
        )));
    }
    let order = match frame.channels() {
        1 => ChannelOrder::Gray,
        3 => ChannelOrder::Bgr,
        4 => ChannelOrder::Bgra,
        n => {
            return Err(Error::InvalidInput(format!("Unsupported channel count: {n}")));
        }
    };
    let stride = frame.step1(0)? * frame.elem_size1()?;

    Ok(PixelLayout {
        channels: frame.channels(),
        width: frame.cols(),
        height: frame.rows(),
        stride,
        order,
    })
}

/// Convert a color frame to single-channel grayscale.
///
/// Already-gray frames are copied unchanged.
///
/// # Errors
///
/// Returns an error for empty frames or unsupported channel counts.
pub fn to_grayscale(frame: &Mat) -> Result<Mat> {
    let layout = describe(frame)?;
    let mut gray = Mat::default();
    match layout.order {
        ChannelOrder::Gray => frame.copy_to(&mut gray)?,
        ChannelOrder::Bgr => imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGR2GRAY, 0)?,
        ChannelOrder::Bgra => imgproc::cvt_color(frame, &mut gray, imgproc::COLOR_BGRA2GRAY, 0)?,
    }
    Ok(gray)
}

/// Mirror a frame horizontally in place.
///
/// # Errors
///
/// Returns an error if the flip fails.
pub fn mirror_horizontal(frame: &mut Mat) -> Result<()> {
    let source = frame.try_clone()?;
    core::flip(&source, frame, 1)?;
    Ok(())
}
