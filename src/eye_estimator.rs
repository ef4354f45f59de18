//! Eye region estimation inside a located face.
//!
//! Each side is searched in a fixed coarse window, the top half of the face
//! split at the vertical midline (see [`Region::coarse_eye_window`] for the
//! exact fractions and the subject's-left/right convention). The eye cascade
//! only runs inside that window, which keeps nostrils and mouth corners out
//! of the candidate set.

use crate::detectors::DetectorRegistry;
use crate::region::{EyeSide, Region};
use crate::{Error, Result};
use log::debug;
use opencv::core::Mat;
use opencv::prelude::*;

/// Refine a coarse window to a detected eye.
///
/// `candidates` are in window coordinates. The largest candidate wins (ties
/// go to the first) and is returned translated into the window's parent
/// coordinates.
#[must_use]
pub fn refine_in_window(window: Region, candidates: &[Region]) -> Option<Region> {
    crate::face_locator::select_primary(candidates).map(|eye| eye.offset(window.x, window.y))
}

/// Find one eye inside a face.
///
/// `face_gray` is the grayscale face sub-view; the returned region is in its
/// coordinates (face-local), or `None` if no eye was detected on that side.
///
/// # Errors
///
/// Returns an error only if the eye detector fails or `face_gray` is empty.
pub fn estimate_eye(registry: &DetectorRegistry, face_gray: &Mat, side: EyeSide) -> Result<Option<Region>> {
    let face = Region::full(face_gray.cols(), face_gray.rows())
        .map_err(|_| Error::InvalidInput("Face view is empty".to_string()))?;
    let window = face.coarse_eye_window(side);
    let window_view = Mat::roi(face_gray, window.to_rect())?;

    let candidates = registry.eye().detect(&window_view)?;
    let eye = refine_in_window(window, &candidates);
    if eye.is_none() {
        debug!("{}: no {} eye in window {}", registry.eye().name(), side, window);
    }
    Ok(eye)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refine_translates_to_face_coordinates() {
        let face = Region::new(0, 0, 200, 200).unwrap();
        let window = face.coarse_eye_window(EyeSide::Left);
        let candidates = [Region::new(10, 20, 40, 30).unwrap()];
        assert_eq!(
            refine_in_window(window, &candidates),
            Some(Region::new(110, 20, 40, 30).unwrap())
        );
    }

    #[test]
    fn test_refine_without_candidates() {
        let window = Region::new(0, 0, 100, 100).unwrap();
        assert_eq!(refine_in_window(window, &[]), None);
    }

    #[test]
    fn test_refined_eye_stays_inside_window() {
        let face = Region::new(0, 0, 120, 90).unwrap();
        let window = face.coarse_eye_window(EyeSide::Right);
        let candidates = [Region::new(5, 5, 30, 20).unwrap(), Region::new(0, 0, 60, 45).unwrap()];
        let eye = refine_in_window(window, &candidates).unwrap();
        assert!(window.contains_region(&eye));
        assert_eq!(eye, Region::new(0, 0, 60, 45).unwrap());
    }
}
