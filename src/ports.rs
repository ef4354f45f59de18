//! Interfaces to the collaborators around the pipeline and the loop that
//! drives them.
//!
//! The core never talks to a camera, window or slider directly. Frames,
//! per-frame parameters and presentation go through [`FrameSource`],
//! [`ParameterSource`] and [`DisplaySink`], so the loop can be driven by
//! OpenCV backends in the application and by scripted fakes in tests.

use crate::detectors::DetectorRegistry;
use crate::session::{render_report, FrameParams, FrameReport, GazeSession, RenderOptions};
use crate::{Error, Result};
use log::{info, warn};
use opencv::core::Mat;
use opencv::prelude::*;
use std::time::Instant;

/// Outcome of asking a source for a frame
#[derive(Debug)]
pub enum Acquired {
    /// A color frame
    Frame(Mat),
    /// No frame right now; try again
    Unavailable,
    /// The source has ended
    Exhausted,
}

/// Supplies color frames on demand
pub trait FrameSource {
    /// # Errors
    ///
    /// Returns an error if the underlying device fails irrecoverably.
    fn next_frame(&mut self) -> Result<Acquired>;
}

/// Supplies thresholds and enable flags, re-read every frame
pub trait ParameterSource {
    /// # Errors
    ///
    /// Returns an error if the parameters cannot be read.
    fn frame_params(&mut self) -> Result<FrameParams>;
}

/// Views a display sink can present
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Main,
    LeftEye,
    RightEye,
}

/// Presents rendered frames
pub trait DisplaySink {
    /// Present one view. The buffer can be described with
    /// [`crate::utils::image_conversion::describe`].
    ///
    /// # Errors
    ///
    /// Returns an error if presentation fails.
    fn show(&mut self, view: View, frame: &Mat) -> Result<()>;

    /// Receive the numeric results of a frame
    ///
    /// # Errors
    ///
    /// Returns an error if the sink fails to record the report.
    fn report(&mut self, _report: &FrameReport) -> Result<()> {
        Ok(())
    }

    /// Polled after every frame; `true` ends the loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink's event handling fails.
    fn should_stop(&mut self) -> Result<bool> {
        Ok(false)
    }
}

/// Parameters that never change
#[derive(Debug, Clone, Copy)]
pub struct FixedParameters(pub FrameParams);

impl ParameterSource for FixedParameters {
    fn frame_params(&mut self) -> Result<FrameParams> {
        Ok(self.0)
    }
}

/// Sink that presents nothing and logs each report
#[derive(Debug, Default)]
pub struct LogSink;

impl DisplaySink for LogSink {
    fn show(&mut self, _view: View, _frame: &Mat) -> Result<()> {
        Ok(())
    }

    fn report(&mut self, report: &FrameReport) -> Result<()> {
        if let Some(face) = report.face {
            info!(
                "face {} right {:?} left {:?}",
                face,
                report.pupil_in_frame(crate::region::EyeSide::Right),
                report.pupil_in_frame(crate::region::EyeSide::Left)
            );
        }
        Ok(())
    }
}

/// Loop behaviour
#[derive(Debug, Clone, Copy)]
pub struct LoopOptions {
    pub render: RenderOptions,
    /// Consecutive unavailable frames tolerated before giving up
    pub max_unavailable: u32,
    /// Consecutive frames failing in the pipeline tolerated before giving up
    pub max_failed: u32,
    /// Stop after this many processed frames
    pub max_frames: Option<u64>,
}

impl Default for LoopOptions {
    fn default() -> Self {
        Self {
            render: RenderOptions {
                draw_face_box: true,
                draw_pupils_on_main: true,
            },
            max_unavailable: 100,
            max_failed: 100,
            max_frames: None,
        }
    }
}

/// Counters collected by [`run_loop`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LoopStats {
    pub frames: u64,
    pub frames_with_face: u64,
    pub unavailable: u64,
    /// Frames dropped because the pipeline failed on them
    pub failed: u64,
    pub fps: f64,
}

/// Process frames until the source ends, the sink asks to stop or
/// `max_frames` is reached.
///
/// Each frame is fully processed and presented before the next one is
/// requested.
///
/// A frame the pipeline fails on is logged and skipped; tracking states are
/// left as they were before it.
///
/// # Errors
///
/// Returns `CameraError` after too many consecutive unavailable frames, the
/// last pipeline error after too many consecutive failed frames, and
/// propagates parameter and sink errors.
#[allow(clippy::cast_precision_loss)]
pub fn run_loop(
    session: &mut GazeSession,
    registry: &DetectorRegistry,
    source: &mut dyn FrameSource,
    parameters: &mut dyn ParameterSource,
    sink: &mut dyn DisplaySink,
    options: &LoopOptions,
) -> Result<LoopStats> {
    let mut stats = LoopStats::default();
    let mut consecutive_unavailable = 0u32;
    let mut consecutive_failed = 0u32;
    let start = Instant::now();

    loop {
        if options.max_frames.is_some_and(|max| stats.frames >= max) {
            break;
        }

        let mut frame = match source.next_frame()? {
            Acquired::Frame(frame) if !frame.empty() => frame,
            Acquired::Frame(_) | Acquired::Unavailable => {
                stats.unavailable += 1;
                consecutive_unavailable += 1;
                if consecutive_unavailable > options.max_unavailable {
                    return Err(Error::CameraError(format!(
                        "No frame after {consecutive_unavailable} attempts"
                    )));
                }
                warn!("Failed to read frame, retrying...");
                continue;
            }
            Acquired::Exhausted => {
                info!("Frame source exhausted");
                break;
            }
        };
        consecutive_unavailable = 0;

        let params = parameters.frame_params()?;
        let report = match session.process_frame(registry, &frame, &params) {
            Ok(report) => report,
            Err(e) => {
                stats.failed += 1;
                consecutive_failed += 1;
                if consecutive_failed > options.max_failed {
                    return Err(e);
                }
                warn!("Skipping frame: {}", e);
                continue;
            }
        };
        consecutive_failed = 0;
        stats.frames += 1;
        if report.face.is_some() {
            stats.frames_with_face += 1;
        }

        let eyes = render_report(&mut frame, &report, options.render)?;
        if let Some(right) = &eyes.right {
            sink.show(View::RightEye, right)?;
        }
        if let Some(left) = &eyes.left {
            sink.show(View::LeftEye, left)?;
        }
        sink.show(View::Main, &frame)?;
        sink.report(&report)?;

        if sink.should_stop()? {
            info!("Stop requested by display");
            break;
        }
    }

    let elapsed = start.elapsed().as_secs_f64();
    if elapsed > 0.0 {
        stats.fps = stats.frames as f64 / elapsed;
    }
    Ok(stats)
}
