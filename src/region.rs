//! Axis-aligned regions and the eye-side naming convention.
//!
//! A [`Region`] is always expressed in the coordinate space of its parent
//! image. Regions produced by the detectors are clamped to their parent so
//! that `0 <= x`, `0 <= y`, `x + width <= parent width` and
//! `y + height <= parent height` always hold, with a strictly positive size.

use crate::{Error, Result};
use opencv::core::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which of the subject's eyes a region or reading belongs to.
///
/// Sides are named from the *subject's* point of view. With a front-facing
/// camera the subject's right eye appears on the left half of the image, so
/// [`EyeSide::Right`] maps to the upper-left quadrant of the face and
/// [`EyeSide::Left`] to the upper-right quadrant. Mirroring the frame before
/// processing swaps which eye lands in which quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EyeSide {
    /// Subject's left eye (image right)
    Left,
    /// Subject's right eye (image left)
    Right,
}

impl EyeSide {
    /// Both sides, in processing order
    pub const BOTH: [Self; 2] = [Self::Right, Self::Left];
}

impl fmt::Display for EyeSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Left => write!(f, "left"),
            Self::Right => write!(f, "right"),
        }
    }
}

/// Integer bounding box within a parent image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

impl Region {
    /// Create a region, rejecting negative origins and empty sizes.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the origin is negative or the size is not positive.
    pub fn new(x: i32, y: i32, width: i32, height: i32) -> Result<Self> {
        if x < 0 || y < 0 || width <= 0 || height <= 0 {
            return Err(Error::InvalidInput(format!(
                "Invalid region ({x}, {y}, {width}x{height})"
            )));
        }
        Ok(Self { x, y, width, height })
    }

    /// Region covering a whole image of the given size.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty image.
    pub fn full(width: i32, height: i32) -> Result<Self> {
        Self::new(0, 0, width, height)
    }

    #[must_use]
    pub fn area(&self) -> i64 {
        i64::from(self.width) * i64::from(self.height)
    }

    #[must_use]
    pub fn right(&self) -> i32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> i32 {
        self.y + self.height
    }

    /// Whether the region lies entirely inside a parent of the given size
    #[must_use]
    pub fn fits_within(&self, parent_width: i32, parent_height: i32) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.width > 0
            && self.height > 0
            && self.right() <= parent_width
            && self.bottom() <= parent_height
    }

    /// Whether `other` lies entirely inside this region (same coordinate space)
    #[must_use]
    pub fn contains_region(&self, other: &Self) -> bool {
        other.x >= self.x && other.y >= self.y && other.right() <= self.right() && other.bottom() <= self.bottom()
    }

    /// Translate the region, e.g. from a child's coordinates into its parent's.
    #[must_use]
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            width: self.width,
            height: self.height,
        }
    }

    /// Intersect with the bounds of a parent image.
    ///
    /// Returns `None` when nothing of the region is left inside the parent.
    #[must_use]
    pub fn clamp_to(&self, parent_width: i32, parent_height: i32) -> Option<Self> {
        let x0 = self.x.max(0);
        let y0 = self.y.max(0);
        let x1 = self.right().min(parent_width);
        let y1 = self.bottom().min(parent_height);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }
        Some(Self {
            x: x0,
            y: y0,
            width: x1 - x0,
            height: y1 - y0,
        })
    }

    /// Coarse eye search window for one side, in this region's parent space.
    ///
    /// The window is the top half of the face split at the vertical midline:
    /// the right eye gets columns `[x, x + w/2)`, the left eye gets
    /// `[x + w/2, x + w)`, and both get rows `[y, y + h/2)` (integer halves,
    /// any odd remainder column goes to the left-eye window).
    #[must_use]
    pub fn coarse_eye_window(&self, side: EyeSide) -> Self {
        let half_width = self.width / 2;
        let half_height = (self.height / 2).max(1);
        match side {
            EyeSide::Right => Self {
                x: self.x,
                y: self.y,
                width: half_width.max(1),
                height: half_height,
            },
            EyeSide::Left => Self {
                x: self.x + half_width,
                y: self.y,
                width: (self.width - half_width).max(1),
                height: half_height,
            },
        }
    }

    /// Drop the top `fraction` of the region's height.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn trim_top(&self, fraction: f32) -> Self {
        let cut = crate::utils::safe_cast::f32_to_i32_clamp(self.height as f32 * fraction, 0, self.height - 1);
        Self {
            x: self.x,
            y: self.y + cut,
            width: self.width,
            height: self.height - cut,
        }
    }

    #[must_use]
    pub fn to_rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }

    #[must_use]
    pub fn from_rect(rect: Rect) -> Self {
        Self {
            x: rect.x,
            y: rect.y,
            width: rect.width,
            height: rect.height,
        }
    }
}

impl From<Region> for Rect {
    fn from(region: Region) -> Self {
        region.to_rect()
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {}x{})", self.x, self.y, self.width, self.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_coarse_windows_for_square_face() {
        let face = Region::new(100, 50, 200, 200).unwrap();
        assert_eq!(face.coarse_eye_window(EyeSide::Right), Region::new(100, 50, 100, 100).unwrap());
        assert_eq!(face.coarse_eye_window(EyeSide::Left), Region::new(200, 50, 100, 100).unwrap());
    }

    #[test]
    fn test_coarse_windows_odd_width() {
        let face = Region::new(0, 0, 101, 51).unwrap();
        let right = face.coarse_eye_window(EyeSide::Right);
        let left = face.coarse_eye_window(EyeSide::Left);
        assert_eq!(right.width + left.width, 101);
        assert_eq!(right.right(), left.x);
        assert_eq!(right.height, 25);
        assert_eq!(left.height, 25);
    }

    #[test]
    fn test_new_rejects_invalid() {
        assert!(Region::new(-1, 0, 10, 10).is_err());
        assert!(Region::new(0, 0, 0, 10).is_err());
        assert!(Region::new(0, 0, 10, -3).is_err());
    }

    #[test]
    fn test_clamp_to_parent() {
        let region = Region { x: -5, y: 10, width: 20, height: 100 };
        let clamped = region.clamp_to(50, 60).unwrap();
        assert_eq!(clamped, Region::new(0, 10, 15, 50).unwrap());

        let outside = Region { x: 70, y: 0, width: 5, height: 5 };
        assert!(outside.clamp_to(50, 60).is_none());
    }

    #[test]
    fn test_trim_top() {
        let eye = Region::new(0, 0, 40, 40).unwrap();
        let trimmed = eye.trim_top(0.25);
        assert_eq!(trimmed, Region::new(0, 10, 40, 30).unwrap());
        assert_eq!(eye.trim_top(0.0), eye);
    }

    #[test]
    fn test_side_names() {
        assert_eq!(EyeSide::Left.to_string(), "left");
        assert_eq!(EyeSide::Right.to_string(), "right");
        assert_eq!(EyeSide::BOTH, [EyeSide::Right, EyeSide::Left]);
    }

    proptest! {
        #[test]
        fn prop_coarse_windows_stay_inside_face(
            x in 0..500i32, y in 0..500i32, w in 2..800i32, h in 2..800i32
        ) {
            let face = Region::new(x, y, w, h).unwrap();
            for side in EyeSide::BOTH {
                let window = face.coarse_eye_window(side);
                prop_assert!(face.contains_region(&window));
                prop_assert!(window.width > 0 && window.height > 0);
                prop_assert_eq!(window, face.coarse_eye_window(side));
            }
        }

        #[test]
        fn prop_clamp_fits_parent(
            x in -100..300i32, y in -100..300i32, w in 1..400i32, h in 1..400i32
        ) {
            let region = Region { x, y, width: w, height: h };
            if let Some(clamped) = region.clamp_to(200, 150) {
                prop_assert!(clamped.fits_within(200, 150));
            }
        }
    }
}
