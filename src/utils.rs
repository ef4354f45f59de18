//! Utility functions for numeric conversions and frame formats.

pub mod image_conversion;
pub mod safe_cast;

use crate::region::Region;
use crate::Result;
use opencv::core::Mat;
use opencv::prelude::*;

/// Region covering the whole of a frame
///
/// # Errors
///
/// Returns `InvalidInput` for an empty frame.
pub fn frame_region(frame: &Mat) -> Result<Region> {
    Region::full(frame.cols(), frame.rows())
}

/// Copy a sub-region of a frame into its own continuous buffer.
///
/// # Errors
///
/// Returns an error if the region does not fit inside the frame.
pub fn crop(frame: &Mat, region: Region) -> Result<Mat> {
    if !frame_region(frame)?.contains_region(&region) {
        return Err(crate::Error::InvalidInput(format!(
            "Region {region} exceeds frame {}x{}",
            frame.cols(),
            frame.rows()
        )));
    }
    let view = Mat::roi(frame, region.to_rect())?;
    Ok(view.try_clone()?)
}
