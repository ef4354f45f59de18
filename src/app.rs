//! Main application module: camera, windows and trackbars around the
//! tracking loop.

use crate::{
    config::Config,
    constants::{
        ENABLED_TRACKBAR, LEFT_EYE_WINDOW, MAIN_WINDOW, RIGHT_EYE_WINDOW, THRESHOLD_MAX, THRESHOLD_TRACKBAR,
    },
    detectors::DetectorRegistry,
    error::{Error, Result},
    ports::{run_loop, Acquired, DisplaySink, FixedParameters, FrameSource, LogSink, LoopOptions, LoopStats, ParameterSource, View},
    pupil_tracker::PupilTracker,
    region::EyeSide,
    session::{EyeParams, FrameParams, GazeSession, RenderOptions},
    utils::image_conversion::mirror_horizontal,
};
use log::{info, warn};
use opencv::{
    core::Mat,
    highgui::{self, WINDOW_NORMAL},
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE},
};
use std::time::Instant;

/// Video source type
#[derive(Debug, Clone)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(String),
}

/// GUI display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuiMode {
    /// Main view, eye close-ups and trackbars
    All,
    /// Main view only
    Main,
    /// No windows; readings are logged
    None,
}

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Camera index or video file path
    pub video_source: VideoSource,
    /// GUI display mode
    pub gui_mode: GuiMode,
    /// Stop after this many frames
    pub max_frames: Option<u64>,
    /// Library configuration
    pub config: Config,
}

/// Frames from a webcam or video file
pub struct CaptureSource {
    capture: VideoCapture,
    is_file: bool,
    mirror: bool,
}

impl CaptureSource {
    /// Open a camera, preferring the platform's native backend and falling
    /// back to automatic backend selection.
    ///
    /// # Errors
    ///
    /// Returns `CameraError` if the camera cannot be opened.
    pub fn open_camera(index: i32, mirror: bool) -> Result<Self> {
        info!("Opening camera {}", index);
        let preferred = if cfg!(target_os = "windows") {
            videoio::CAP_DSHOW
        } else {
            videoio::CAP_ANY
        };

        let mut capture = VideoCapture::new(index, preferred)?;
        if !capture.is_opened()? && preferred != videoio::CAP_ANY {
            warn!("Preferred camera backend failed, falling back to automatic selection");
            capture = VideoCapture::new(index, videoio::CAP_ANY)?;
        }
        if !capture.is_opened()? {
            return Err(Error::CameraError(format!("Can't open camera {index}")));
        }

        // Always process the newest frame
        capture.set(CAP_PROP_BUFFERSIZE, 1.0)?;
        info!("Camera buffer size set to 1 for low latency");

        Ok(Self {
            capture,
            is_file: false,
            mirror,
        })
    }

    /// Open a video file
    ///
    /// # Errors
    ///
    /// Returns `CameraError` if the file cannot be opened.
    pub fn open_file(path: &str, mirror: bool) -> Result<Self> {
        info!("Opening video file: {}", path);
        let capture = VideoCapture::from_file(path, videoio::CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(Error::CameraError(format!("Can't open video file {path}")));
        }
        Ok(Self {
            capture,
            is_file: true,
            mirror,
        })
    }

    /// Open whichever source the configuration names
    ///
    /// # Errors
    ///
    /// Returns `CameraError` if the source cannot be opened.
    pub fn open(source: &VideoSource, mirror: bool) -> Result<Self> {
        match source {
            VideoSource::Camera(index) => Self::open_camera(*index, mirror),
            VideoSource::File(path) => Self::open_file(path, mirror),
        }
    }
}

impl FrameSource for CaptureSource {
    fn next_frame(&mut self) -> Result<Acquired> {
        let mut frame = Mat::default();
        if !self.capture.read(&mut frame)? || frame.empty() {
            if self.is_file {
                return Ok(Acquired::Exhausted);
            }
            return Ok(Acquired::Unavailable);
        }
        if self.mirror {
            mirror_horizontal(&mut frame)?;
        }
        Ok(Acquired::Frame(frame))
    }
}

/// HighGUI windows for the main view and eye close-ups
pub struct HighguiDisplay {
    show_eye_windows: bool,
    frame_interval_ms: i32,
    last_frame: Instant,
}

impl HighguiDisplay {
    /// Create the windows
    ///
    /// # Errors
    ///
    /// Returns an error if a window cannot be created.
    pub fn new(show_eye_windows: bool, target_fps: u32) -> Result<Self> {
        highgui::named_window(MAIN_WINDOW, WINDOW_NORMAL)?;
        if show_eye_windows {
            highgui::named_window(RIGHT_EYE_WINDOW, WINDOW_NORMAL)?;
            highgui::named_window(LEFT_EYE_WINDOW, WINDOW_NORMAL)?;
        }
        let frame_interval_ms = i32::try_from(1000 / target_fps.max(1)).unwrap_or(1).max(1);
        Ok(Self {
            show_eye_windows,
            frame_interval_ms,
            last_frame: Instant::now(),
        })
    }
}

impl DisplaySink for HighguiDisplay {
    fn show(&mut self, view: View, frame: &Mat) -> Result<()> {
        let window = match view {
            View::Main => MAIN_WINDOW,
            View::RightEye if self.show_eye_windows => RIGHT_EYE_WINDOW,
            View::LeftEye if self.show_eye_windows => LEFT_EYE_WINDOW,
            View::RightEye | View::LeftEye => return Ok(()),
        };
        highgui::imshow(window, frame).map_err(|e| Error::DisplayError(format!("{window}: {e}")))
    }

    fn should_stop(&mut self) -> Result<bool> {
        // Wait out whatever is left of the frame interval
        let spent = i32::try_from(self.last_frame.elapsed().as_millis()).unwrap_or(i32::MAX);
        let delay = (self.frame_interval_ms - spent).max(1);
        let key = highgui::wait_key(delay)?;
        self.last_frame = Instant::now();
        // Esc or q
        Ok(key == 27 || key == i32::from(b'q'))
    }
}

/// Threshold and enable trackbars on the main window, read every frame
pub struct TrackbarParameters;

impl TrackbarParameters {
    fn trackbar_name(side: EyeSide, control: &str) -> String {
        format!("{side} {control}")
    }

    /// Create the trackbars initialised from `initial`
    ///
    /// # Errors
    ///
    /// Returns an error if a trackbar cannot be created.
    pub fn new(initial: FrameParams) -> Result<Self> {
        for side in EyeSide::BOTH {
            let eye = initial.eye(side);
            let threshold = Self::trackbar_name(side, THRESHOLD_TRACKBAR);
            let enabled = Self::trackbar_name(side, ENABLED_TRACKBAR);
            highgui::create_trackbar(&threshold, MAIN_WINDOW, None, THRESHOLD_MAX, None)?;
            highgui::set_trackbar_pos(&threshold, MAIN_WINDOW, eye.threshold)?;
            highgui::create_trackbar(&enabled, MAIN_WINDOW, None, 1, None)?;
            highgui::set_trackbar_pos(&enabled, MAIN_WINDOW, i32::from(eye.enabled))?;
        }
        Ok(Self)
    }
}

impl ParameterSource for TrackbarParameters {
    fn frame_params(&mut self) -> Result<FrameParams> {
        let read = |side: EyeSide| -> Result<EyeParams> {
            Ok(EyeParams {
                threshold: highgui::get_trackbar_pos(&Self::trackbar_name(side, THRESHOLD_TRACKBAR), MAIN_WINDOW)?,
                enabled: highgui::get_trackbar_pos(&Self::trackbar_name(side, ENABLED_TRACKBAR), MAIN_WINDOW)? != 0,
            })
        };
        Ok(FrameParams {
            left: read(EyeSide::Left)?,
            right: read(EyeSide::Right)?,
        })
    }
}

/// Main application struct
pub struct GazeApp {
    config: AppConfig,
    registry: DetectorRegistry,
    session: GazeSession,
    source: CaptureSource,
}

impl GazeApp {
    /// Validate configuration, load detectors and open the video source.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid, a detector model is
    /// missing or corrupt, or the video source cannot be opened.
    pub fn new(config: AppConfig) -> Result<Self> {
        info!("Initializing Gaze Tracking application");
        config.config.validate()?;

        let registry = DetectorRegistry::load(&config.config)?;
        let session = GazeSession::new(PupilTracker::new(config.config.pupil.clone()));
        let source = CaptureSource::open(&config.video_source, config.config.display.mirror)?;

        Ok(Self {
            config,
            registry,
            session,
            source,
        })
    }

    /// Run the main application loop
    ///
    /// # Errors
    ///
    /// Returns an error if the camera stops delivering frames or a window
    /// operation fails.
    pub fn run(&mut self) -> Result<LoopStats> {
        info!("Starting main application loop");
        let display_config = &self.config.config.display;
        let initial = FrameParams::from(&self.config.config.tracking);
        let options = LoopOptions {
            render: RenderOptions::from(display_config),
            max_frames: self.config.max_frames,
            ..LoopOptions::default()
        };

        let stats = match self.config.gui_mode {
            GuiMode::None => {
                let mut parameters = FixedParameters(initial);
                let mut sink = LogSink;
                run_loop(&mut self.session, &self.registry, &mut self.source, &mut parameters, &mut sink, &options)?
            }
            mode => {
                // Trackbars live on the main window, so it must exist first
                let mut sink = HighguiDisplay::new(
                    mode == GuiMode::All && display_config.show_eye_windows,
                    display_config.target_fps,
                )?;
                let mut parameters = TrackbarParameters::new(initial)?;
                let stats = run_loop(&mut self.session, &self.registry, &mut self.source, &mut parameters, &mut sink, &options)?;
                highgui::destroy_all_windows()?;
                stats
            }
        };

        info!(
            "Application shutting down after {} frames ({} with a face, {:.1} fps)",
            stats.frames, stats.frames_with_face, stats.fps
        );
        Ok(stats)
    }
}
