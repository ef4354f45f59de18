//! Pupil blob tracking with previous-frame fallback.
//!
//! Each eye carries a [`TrackingState`] holding the last successful pupil
//! detection. A frame's eye image is binarized at the caller's threshold,
//! cleaned up morphologically and handed to the blob detector. When a
//! candidate is found it replaces the state; when nothing is found the last
//! known pupil is reported again, marked stale, and the state is returned
//! untouched. A state that never held a detection yields no reading at all.

use crate::config::PupilConfig;
use crate::constants::{BINARY_MAX_VALUE, EPSILON};
use crate::detectors::BlobDetector;
use crate::region::Region;
use crate::utils::safe_cast::i32_to_u8_clamp;
use crate::{Error, Result};
use log::debug;
use opencv::core::{self, Mat, Point};
use opencv::imgproc;
use opencv::prelude::*;
use serde::{Deserialize, Serialize};

/// A detected blob in eye-region coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Blob diameter in pixels
    pub size: f32,
}

impl Keypoint {
    #[must_use]
    pub fn new(x: f32, y: f32, size: f32) -> Self {
        Self { x, y, size }
    }

    #[must_use]
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            size: self.size,
        }
    }

    fn is_plausible(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.size.is_finite() && self.size > 0.0
    }
}

/// Per-eye memory of the last successful pupil detection.
///
/// Starts empty. Only [`PupilTracker`] produces updated states, and only
/// from a fresh detection, so once a keypoint is stored it is never lost for
/// the rest of the session.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackingState {
    last: Option<Keypoint>,
}

impl TrackingState {
    /// State at session start
    #[must_use]
    pub const fn empty() -> Self {
        Self { last: None }
    }

    /// State after a successful detection of `keypoint`
    #[must_use]
    pub const fn from_detection(keypoint: Keypoint) -> Self {
        Self { last: Some(keypoint) }
    }

    #[must_use]
    pub fn last_keypoint(&self) -> Option<Keypoint> {
        self.last
    }

    /// Size of the last detected pupil, used for continuity between frames
    #[must_use]
    pub fn previous_size(&self) -> Option<f32> {
        self.last.map(|kp| kp.size)
    }

    #[must_use]
    pub fn has_detection(&self) -> bool {
        self.last.is_some()
    }
}

/// Whether a reading comes from this frame or was carried over
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// Detected in the current frame
    Fresh,
    /// Repeated from the last successful frame
    Stale,
}

/// The pupil reported for one eye in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PupilReading {
    pub keypoint: Keypoint,
    pub freshness: Freshness,
}

impl PupilReading {
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.freshness == Freshness::Fresh
    }
}

/// Result of tracking one eye for one frame
#[derive(Debug, Clone, PartialEq)]
pub struct TrackOutcome {
    /// `None` only if no pupil has been detected yet this session
    pub reading: Option<PupilReading>,
    /// State to persist for the next frame
    pub state: TrackingState,
    /// Every blob the detector reported this frame, in eye-region coordinates
    pub candidates: Vec<Keypoint>,
}

/// How a single pupil is chosen among several candidates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectionPolicy {
    /// 1.0 picks purely by closeness to the previous size, 0.0 purely by
    /// detector order
    pub size_continuity_weight: f32,
    /// Maximum relative size change accepted when a previous size exists
    pub max_size_change: Option<f32>,
}

impl From<&PupilConfig> for SelectionPolicy {
    fn from(config: &PupilConfig) -> Self {
        Self {
            size_continuity_weight: config.size_continuity_weight.clamp(0.0, 1.0),
            max_size_change: config.max_size_change,
        }
    }
}

/// Pick the primary pupil among detector candidates.
///
/// Without a previous size the detector's first plausible candidate wins.
/// With one, each candidate is scored by
/// `w * |size - previous| / previous + (1 - w) * index / count` and the lowest
/// score wins, ties going to the earlier candidate.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn select_candidate(
    candidates: &[Keypoint],
    previous_size: Option<f32>,
    policy: &SelectionPolicy,
) -> Option<Keypoint> {
    let plausible: Vec<Keypoint> = candidates.iter().copied().filter(Keypoint::is_plausible).collect();

    // No usable previous size: detector order decides
    let Some(previous) = previous_size.filter(|size| *size > EPSILON) else {
        return plausible.first().copied();
    };

    let relative_change = |kp: &Keypoint| (kp.size - previous).abs() / previous;
    let eligible: Vec<Keypoint> = plausible
        .into_iter()
        .filter(|kp| policy.max_size_change.map_or(true, |max| relative_change(kp) <= max))
        .collect();

    let count = eligible.len() as f32;
    let weight = policy.size_continuity_weight;
    eligible
        .iter()
        .enumerate()
        .map(|(index, kp)| {
            let rank = index as f32 / count;
            (weight * relative_change(kp) + (1.0 - weight) * rank, *kp)
        })
        .min_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, kp)| kp)
}

/// Combine this frame's candidates with the previous state.
#[must_use]
pub fn resolve(state: &TrackingState, candidates: Vec<Keypoint>, policy: &SelectionPolicy) -> TrackOutcome {
    match select_candidate(&candidates, state.previous_size(), policy) {
        Some(keypoint) => TrackOutcome {
            reading: Some(PupilReading {
                keypoint,
                freshness: Freshness::Fresh,
            }),
            state: TrackingState::from_detection(keypoint),
            candidates,
        },
        // Miss: report the last detection and keep the state as is
        None => {
            if let Some(previous) = state.last_keypoint() {
                debug!("No pupil candidate, reusing ({:.1}, {:.1})", previous.x, previous.y);
            }
            TrackOutcome {
                reading: state.last_keypoint().map(|keypoint| PupilReading {
                    keypoint,
                    freshness: Freshness::Stale,
                }),
                state: *state,
                candidates,
            }
        }
    }
}

/// Thresholds eye images and tracks the pupil blob across frames.
#[derive(Debug, Clone)]
pub struct PupilTracker {
    config: PupilConfig,
    policy: SelectionPolicy,
}

impl PupilTracker {
    #[must_use]
    pub fn new(config: PupilConfig) -> Self {
        let policy = SelectionPolicy::from(&config);
        Self { config, policy }
    }

    /// Binarize a grayscale eye image for blob search.
    ///
    /// Pixels at or below `threshold` become 0 (pupil candidates), brighter
    /// pixels become 255. The result is then eroded, dilated and median
    /// blurred to break up lashes and glints.
    ///
    /// # Errors
    ///
    /// Returns an error for non single-channel input or OpenCV failures.
    pub fn binarize(&self, eye_gray: &Mat, threshold: i32) -> Result<Mat> {
        if eye_gray.empty() || eye_gray.channels() != 1 {
            return Err(Error::InvalidInput(format!(
                "Expected non-empty single-channel eye image, got {} channels",
                eye_gray.channels()
            )));
        }

        let mut binary = Mat::default();
        imgproc::threshold(
            eye_gray,
            &mut binary,
            f64::from(i32_to_u8_clamp(threshold)),
            BINARY_MAX_VALUE,
            imgproc::THRESH_BINARY,
        )?;

        // Open up the pupil blob and drop thin lashes
        let anchor = Point::new(-1, -1);
        let border_value = imgproc::morphology_default_border_value()?;
        if self.config.erode_iterations > 0 {
            let source = binary.try_clone()?;
            imgproc::erode(
                &source,
                &mut binary,
                &Mat::default(),
                anchor,
                self.config.erode_iterations,
                core::BORDER_CONSTANT,
                border_value,
            )?;
        }
        if self.config.dilate_iterations > 0 {
            let source = binary.try_clone()?;
            imgproc::dilate(
                &source,
                &mut binary,
                &Mat::default(),
                anchor,
                self.config.dilate_iterations,
                core::BORDER_CONSTANT,
                border_value,
            )?;
        }

        // Smooth the blob outline
        let source = binary.try_clone()?;
        imgproc::median_blur(&source, &mut binary, self.config.median_kernel)?;

        Ok(binary)
    }

    /// Track the pupil of one eye for one frame.
    ///
    /// `threshold` is read fresh on every call. `state` is only read; the
    /// state to keep is returned in the outcome.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid input images or detector failures. A
    /// missing pupil is not an error.
    pub fn track(
        &self,
        eye_gray: &Mat,
        threshold: i32,
        state: &TrackingState,
        detector: &dyn BlobDetector,
    ) -> Result<TrackOutcome> {
        // Skip the eyebrow band at the top of the eye
        let eye = Region::full(eye_gray.cols(), eye_gray.rows())?;
        let search = eye.trim_top(self.config.eyebrow_trim);
        let search_view = Mat::roi(eye_gray, search.to_rect())?;

        let binary = self.binarize(&search_view, threshold)?;
        #[allow(clippy::cast_precision_loss)]
        let offset_y = search.y as f32;
        // Back into full eye-region coordinates
        let candidates: Vec<Keypoint> = detector
            .detect(&binary)?
            .into_iter()
            .map(|kp| kp.translated(0.0, offset_y))
            .collect();

        Ok(resolve(state, candidates, &self.policy))
    }
}

impl Default for PupilTracker {
    fn default() -> Self {
        Self::new(PupilConfig::default())
    }
}
