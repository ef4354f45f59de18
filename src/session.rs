//! Per-frame orchestration: face, then eyes, then pupils.
//!
//! A [`GazeSession`] owns the two per-eye [`TrackingState`]s and runs one
//! frame at a time. Misses at any stage are reported as values and leave
//! the states of the affected eyes exactly as they were.

use crate::config::{DisplayConfig, TrackingConfig};
use crate::detectors::DetectorRegistry;
use crate::eye_estimator::estimate_eye;
use crate::face_locator::locate_face;
use crate::overlay;
use crate::pupil_tracker::{Keypoint, PupilReading, PupilTracker, TrackingState};
use crate::region::{EyeSide, Region};
use crate::utils::{crop, image_conversion::to_grayscale};
use crate::Result;
use log::debug;
use opencv::core::Mat;

/// Externally supplied parameters for one eye
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EyeParams {
    /// Binarization cutoff (0-255)
    pub threshold: i32,
    /// Whether to process this eye at all
    pub enabled: bool,
}

/// Externally supplied parameters for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameParams {
    pub left: EyeParams,
    pub right: EyeParams,
}

impl FrameParams {
    #[must_use]
    pub fn eye(&self, side: EyeSide) -> EyeParams {
        match side {
            EyeSide::Left => self.left,
            EyeSide::Right => self.right,
        }
    }

    #[must_use]
    pub fn with_eye(mut self, side: EyeSide, params: EyeParams) -> Self {
        match side {
            EyeSide::Left => self.left = params,
            EyeSide::Right => self.right = params,
        }
        self
    }
}

impl From<&TrackingConfig> for FrameParams {
    fn from(config: &TrackingConfig) -> Self {
        Self {
            left: EyeParams {
                threshold: config.left_threshold,
                enabled: config.left_enabled,
            },
            right: EyeParams {
                threshold: config.right_threshold,
                enabled: config.right_enabled,
            },
        }
    }
}

/// What happened to one eye in one frame
#[derive(Debug, Clone, PartialEq)]
pub enum EyeReport {
    /// Disabled by its enable flag; nothing was run
    Disabled,
    /// No face in the frame
    NoFace,
    /// Face found but no eye detected on this side
    NoEye,
    /// Eye found and its pupil tracker ran
    Tracked {
        /// Eye region in frame coordinates
        region: Region,
        /// Current or carried-over pupil, in eye-region coordinates
        reading: Option<PupilReading>,
        /// All blobs reported this frame, in eye-region coordinates
        candidates: Vec<Keypoint>,
    },
}

impl EyeReport {
    #[must_use]
    pub fn region(&self) -> Option<Region> {
        match self {
            Self::Tracked { region, .. } => Some(*region),
            _ => None,
        }
    }

    #[must_use]
    pub fn reading(&self) -> Option<PupilReading> {
        match self {
            Self::Tracked { reading, .. } => *reading,
            _ => None,
        }
    }
}

/// Results of one processed frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    /// Face region in frame coordinates
    pub face: Option<Region>,
    pub left: EyeReport,
    pub right: EyeReport,
}

impl FrameReport {
    #[must_use]
    pub fn eye(&self, side: EyeSide) -> &EyeReport {
        match side {
            EyeSide::Left => &self.left,
            EyeSide::Right => &self.right,
        }
    }

    /// Pupil position of an eye in frame coordinates
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn pupil_in_frame(&self, side: EyeSide) -> Option<Keypoint> {
        let eye = self.eye(side);
        let region = eye.region()?;
        let reading = eye.reading()?;
        Some(reading.keypoint.translated(region.x as f32, region.y as f32))
    }
}

/// Drawing choices for [`render_report`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    pub draw_face_box: bool,
    /// Draw pupil markers into the frame itself rather than only the eye crops
    pub draw_pupils_on_main: bool,
}

impl From<&DisplayConfig> for RenderOptions {
    fn from(config: &DisplayConfig) -> Self {
        Self {
            draw_face_box: config.draw_face_box,
            draw_pupils_on_main: config.draw_pupils_on_main,
        }
    }
}

/// Eye close-ups produced by rendering
#[derive(Debug, Default)]
pub struct EyeViews {
    pub left: Option<Mat>,
    pub right: Option<Mat>,
}

/// Tracking session for a single face.
pub struct GazeSession {
    tracker: PupilTracker,
    left: TrackingState,
    right: TrackingState,
    frames: u64,
}

impl GazeSession {
    #[must_use]
    pub fn new(tracker: PupilTracker) -> Self {
        Self {
            tracker,
            left: TrackingState::empty(),
            right: TrackingState::empty(),
            frames: 0,
        }
    }

    #[must_use]
    pub fn state(&self, side: EyeSide) -> &TrackingState {
        match side {
            EyeSide::Left => &self.left,
            EyeSide::Right => &self.right,
        }
    }

    /// Frames processed so far
    #[must_use]
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Run the detection pipeline on one color frame.
    ///
    /// The frame is not modified; see [`render_report`] for drawing.
    ///
    /// # Errors
    ///
    /// Returns an error for invalid frames or detector backend failures, in
    /// which case neither eye's state is changed. Missing faces, eyes or
    /// pupils are reported in the [`FrameReport`].
    pub fn process_frame(&mut self, registry: &DetectorRegistry, frame: &Mat, params: &FrameParams) -> Result<FrameReport> {
        self.frames += 1;
        let gray = to_grayscale(frame)?;

        let Some(face) = locate_face(registry, &gray)? else {
            let miss = |side: EyeSide| {
                if params.eye(side).enabled {
                    EyeReport::NoFace
                } else {
                    EyeReport::Disabled
                }
            };
            return Ok(FrameReport {
                face: None,
                left: miss(EyeSide::Left),
                right: miss(EyeSide::Right),
            });
        };

        let face_gray = Mat::roi(&gray, face.to_rect())?;
        let mut report = FrameReport {
            face: Some(face),
            left: EyeReport::Disabled,
            right: EyeReport::Disabled,
        };
        // New states are held back until both eyes succeed
        let mut updates = Vec::with_capacity(2);

        for side in EyeSide::BOTH {
            let eye_params = params.eye(side);
            if !eye_params.enabled {
                continue;
            }

            let eye_report = match estimate_eye(registry, &face_gray, side)? {
                None => EyeReport::NoEye,
                Some(local) => {
                    // Face-local to frame coordinates
                    let region = local.offset(face.x, face.y);
                    let eye_gray = Mat::roi(&gray, region.to_rect())?;
                    let outcome = self.tracker.track(&eye_gray, eye_params.threshold, self.state(side), registry.blob())?;
                    updates.push((side, outcome.state));
                    EyeReport::Tracked {
                        region,
                        reading: outcome.reading,
                        candidates: outcome.candidates,
                    }
                }
            };

            match side {
                EyeSide::Left => report.left = eye_report,
                EyeSide::Right => report.right = eye_report,
            }
        }

        for (side, state) in updates {
            self.store(side, state);
        }

        debug!(
            "Frame {}: face {}, right pupil {:?}, left pupil {:?}",
            self.frames,
            face,
            report.right.reading().map(|r| r.keypoint),
            report.left.reading().map(|r| r.keypoint)
        );
        Ok(report)
    }

    fn store(&mut self, side: EyeSide, state: TrackingState) {
        match side {
            EyeSide::Left => self.left = state,
            EyeSide::Right => self.right = state,
        }
    }
}

/// Draw a frame report and cut out the eye close-ups.
///
/// Eyes that were disabled or not found get no close-up and no markers.
///
/// # Errors
///
/// Returns an error if a reported region does not fit the frame or drawing fails.
pub fn render_report(frame: &mut Mat, report: &FrameReport, options: RenderOptions) -> Result<EyeViews> {
    let mut views = EyeViews::default();

    for side in EyeSide::BOTH {
        let eye = report.eye(side);
        let Some(region) = eye.region() else {
            continue;
        };

        let view = if options.draw_pupils_on_main {
            // The eye view aliases the frame, so markers land on both
            if let Some(reading) = eye.reading() {
                let mut eye_view = Mat::roi_mut(frame, region.to_rect())?;
                overlay::draw_reading(&mut eye_view, &reading)?;
            }
            crop(frame, region)?
        } else {
            let mut close_up = crop(frame, region)?;
            if let Some(reading) = eye.reading() {
                overlay::draw_reading(&mut close_up, &reading)?;
            }
            close_up
        };

        match side {
            EyeSide::Left => views.left = Some(view),
            EyeSide::Right => views.right = Some(view),
        }
    }

    // Face box last, after the close-ups were cut
    if options.draw_face_box {
        if let Some(face) = report.face {
            overlay::draw_region(frame, face)?;
        }
    }

    Ok(views)
}
