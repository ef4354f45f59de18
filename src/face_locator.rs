//! Locates the single face to track in a frame.

use crate::detectors::DetectorRegistry;
use crate::region::Region;
use crate::Result;
use log::debug;
use opencv::core::Mat;

/// Pick the face to track among detector candidates.
///
/// The largest area wins; among equal areas the candidate reported first by
/// the detector is kept, so the choice is deterministic for a given input.
#[must_use]
pub fn select_primary(candidates: &[Region]) -> Option<Region> {
    candidates
        .iter()
        .copied()
        .fold(None, |best: Option<Region>, candidate| match best {
            Some(current) if current.area() >= candidate.area() => Some(current),
            _ => Some(candidate),
        })
}

/// Find the most prominent face in a grayscale frame.
///
/// Returns the face region in frame coordinates, or `None` when no face is
/// visible. This is a pure function of the current frame.
///
/// # Errors
///
/// Returns an error only if the face detector itself fails.
pub fn locate_face(registry: &DetectorRegistry, frame_gray: &Mat) -> Result<Option<Region>> {
    let candidates = registry.face().detect(frame_gray)?;
    let face = select_primary(&candidates);
    match face {
        Some(region) if candidates.len() > 1 => {
            debug!(
                "{}: {} faces detected, tracking largest at {}",
                registry.face().name(),
                candidates.len(),
                region
            );
        }
        None => debug!("{}: no face in frame", registry.face().name()),
        _ => {}
    }
    Ok(face)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region(x: i32, y: i32, w: i32, h: i32) -> Region {
        Region::new(x, y, w, h).unwrap()
    }

    #[test]
    fn test_select_primary_empty() {
        assert_eq!(select_primary(&[]), None);
    }

    #[test]
    fn test_select_primary_largest_area() {
        let faces = [region(0, 0, 50, 50), region(100, 40, 120, 110), region(300, 10, 80, 90)];
        assert_eq!(select_primary(&faces), Some(faces[1]));
    }

    #[test]
    fn test_select_primary_tie_keeps_first() {
        let faces = [region(0, 0, 60, 40), region(200, 0, 40, 60)];
        assert_eq!(select_primary(&faces), Some(faces[0]));
    }
}
