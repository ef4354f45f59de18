//! Error types for the gaze tracking library.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Detector model data missing or corrupt
    #[error("Model error: {0}")]
    ModelError(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Camera or video source could not be opened
    #[error("Camera error: {0}")]
    CameraError(String),

    /// Display sink failed to present a frame
    #[error("Display error: {0}")]
    DisplayError(String),
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Whether this error prevents the tracker from starting at all.
    #[must_use]
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(self, Self::ModelError(_) | Self::ConfigError(_) | Self::CameraError(_))
    }
}
