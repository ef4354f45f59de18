//! Real-time gaze tracking: face, eye and pupil detection from a camera feed.
//!
//! Every frame goes through a chain of narrowing searches:
//! 1. Face localization on the grayscale frame (Haar cascade, largest face wins)
//! 2. Eye localization inside fixed coarse windows of the face
//! 3. Pupil blob detection inside each eye, with the previous frame's pupil
//!    reused whenever the current frame yields none
//!
//! A stage that finds nothing simply ends the chain for that frame. Only a
//! missing or corrupt detector model is fatal, and only at startup.
//!
//! # Examples
//!
//! ## Tracking frames from a camera
//!
//! ```no_run
//! use gaze_tracking::{
//!     config::Config,
//!     detectors::DetectorRegistry,
//!     pupil_tracker::PupilTracker,
//!     region::EyeSide,
//!     session::{FrameParams, GazeSession},
//! };
//! use opencv::{core::Mat, prelude::*, videoio};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::default();
//! let registry = DetectorRegistry::load(&config)?;
//! let mut session = GazeSession::new(PupilTracker::new(config.pupil.clone()));
//! let params = FrameParams::from(&config.tracking);
//!
//! let mut cap = videoio::VideoCapture::new(0, videoio::CAP_ANY)?;
//! let mut frame = Mat::default();
//! while cap.read(&mut frame)? {
//!     let report = session.process_frame(&registry, &frame, &params)?;
//!     if let Some(pupil) = report.pupil_in_frame(EyeSide::Right) {
//!         println!("Right pupil at ({:.1}, {:.1})", pupil.x, pupil.y);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Tracking a single eye image
//!
//! ```no_run
//! use gaze_tracking::{
//!     config::BlobConfig,
//!     detectors::SimpleBlobPupilDetector,
//!     pupil_tracker::{PupilTracker, TrackingState},
//! };
//! use opencv::{imgcodecs, prelude::*};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let detector = SimpleBlobPupilDetector::new(&BlobConfig::default())?;
//! let tracker = PupilTracker::default();
//! let eye = imgcodecs::imread("eye.png", imgcodecs::IMREAD_GRAYSCALE)?;
//!
//! let outcome = tracker.track(&eye, 40, &TrackingState::empty(), &detector)?;
//! match outcome.reading {
//!     Some(reading) => println!("Pupil {:?} ({:?})", reading.keypoint, reading.freshness),
//!     None => println!("No pupil detected yet"),
//! }
//! # Ok(())
//! # }
//! ```

/// Regions and the eye-side convention
pub mod region;

/// Face, eye and blob detectors shared across frames
pub mod detectors;

/// Face localization
pub mod face_locator;

/// Eye region estimation inside a face
pub mod eye_estimator;

/// Pupil blob tracking with previous-frame fallback
pub mod pupil_tracker;

/// Marker drawing for display
pub mod overlay;

/// Per-frame pipeline and tracking session
pub mod session;

/// Frame source, parameter source and display sink interfaces
pub mod ports;

/// Utility functions for numeric conversions and frame formats
pub mod utils;

/// Error types and result handling
pub mod error;

/// Main application module
pub mod app;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, Result};
