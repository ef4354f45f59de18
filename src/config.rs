//! Configuration management for the gaze tracking application

use crate::constants::{
    DEFAULT_BLOB_MAX_AREA, DEFAULT_BLOB_MIN_AREA, DEFAULT_DILATE_ITERATIONS, DEFAULT_ERODE_ITERATIONS,
    DEFAULT_EYEBROW_TRIM, DEFAULT_EYE_MIN_NEIGHBORS, DEFAULT_EYE_MIN_SIZE, DEFAULT_EYE_SCALE_FACTOR,
    DEFAULT_FACE_MIN_NEIGHBORS, DEFAULT_FACE_MIN_SIZE, DEFAULT_FACE_SCALE_FACTOR, DEFAULT_MEDIAN_KERNEL,
    DEFAULT_SIZE_CONTINUITY_WEIGHT, DEFAULT_TARGET_FPS, DEFAULT_THRESHOLD, EYE_CASCADE_FILE, FACE_CASCADE_FILE,
    THRESHOLD_MAX, THRESHOLD_MIN,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Detector model files
    pub models: ModelConfig,

    /// Face cascade parameters
    pub face_detection: FaceDetectionConfig,

    /// Eye cascade parameters
    pub eye_detection: EyeDetectionConfig,

    /// Pupil blob detector parameters
    pub blob: BlobConfig,

    /// Pupil preprocessing and candidate selection
    pub pupil: PupilConfig,

    /// Initial per-eye parameters
    pub tracking: TrackingConfig,

    /// Display configuration
    pub display: DisplayConfig,
}

/// Model file paths configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Path to the frontal face Haar cascade
    pub face_cascade: PathBuf,

    /// Path to the eye Haar cascade
    pub eye_cascade: PathBuf,

    /// Fall back to the system OpenCV data directories when a path is missing
    pub search_system_paths: bool,
}

/// Face cascade configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FaceDetectionConfig {
    /// Image pyramid scale step (> 1.0)
    pub scale_factor: f64,

    /// Neighbouring detections required to keep a candidate
    pub min_neighbors: i32,

    /// Smallest accepted face side in pixels
    pub min_size: i32,
}

/// Eye cascade configuration, applied inside each coarse eye window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EyeDetectionConfig {
    /// Image pyramid scale step (> 1.0)
    pub scale_factor: f64,

    /// Neighbouring detections required to keep a candidate
    pub min_neighbors: i32,

    /// Smallest accepted eye side in pixels
    pub min_size: i32,
}

/// Multi-scale detection parameters handed to a cascade detector
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CascadeParams {
    pub scale_factor: f64,
    pub min_neighbors: i32,
    pub min_size: i32,
}

/// Blob detector parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlobConfig {
    pub filter_by_area: bool,
    pub min_area: f32,
    pub max_area: f32,
    pub filter_by_circularity: bool,
    pub min_circularity: f32,
    pub filter_by_convexity: bool,
    pub min_convexity: f32,
    pub filter_by_inertia: bool,
    pub min_inertia_ratio: f32,
}

/// Pupil preprocessing and candidate selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PupilConfig {
    /// Erosion passes after thresholding
    pub erode_iterations: i32,

    /// Dilation passes after erosion
    pub dilate_iterations: i32,

    /// Median blur kernel (odd, >= 3)
    pub median_kernel: i32,

    /// Fraction of the eye height removed from the top before blob search
    pub eyebrow_trim: f32,

    /// How strongly size closeness to the previous pupil decides between candidates (0.0-1.0)
    pub size_continuity_weight: f32,

    /// Reject candidates whose relative size change exceeds this, when a previous size exists
    pub max_size_change: Option<f32>,
}

/// Initial per-eye parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackingConfig {
    pub left_threshold: i32,
    pub right_threshold: i32,
    pub left_enabled: bool,
    pub right_enabled: bool,
}

/// Display configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Target framerate
    pub target_fps: u32,

    /// Flip image horizontally before processing
    pub mirror: bool,

    /// Show the left/right eye close-up windows
    pub show_eye_windows: bool,

    /// Outline the located face on the main view
    pub draw_face_box: bool,

    /// Let pupil markers appear on the main view as well as the eye views
    pub draw_pupils_on_main: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            models: ModelConfig::default(),
            face_detection: FaceDetectionConfig::default(),
            eye_detection: EyeDetectionConfig::default(),
            blob: BlobConfig::default(),
            pupil: PupilConfig::default(),
            tracking: TrackingConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            face_cascade: PathBuf::from("assets/haarcascades").join(FACE_CASCADE_FILE),
            eye_cascade: PathBuf::from("assets/haarcascades").join(EYE_CASCADE_FILE),
            search_system_paths: true,
        }
    }
}

impl Default for FaceDetectionConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_FACE_SCALE_FACTOR,
            min_neighbors: DEFAULT_FACE_MIN_NEIGHBORS,
            min_size: DEFAULT_FACE_MIN_SIZE,
        }
    }
}

impl Default for EyeDetectionConfig {
    fn default() -> Self {
        Self {
            scale_factor: DEFAULT_EYE_SCALE_FACTOR,
            min_neighbors: DEFAULT_EYE_MIN_NEIGHBORS,
            min_size: DEFAULT_EYE_MIN_SIZE,
        }
    }
}

impl From<&FaceDetectionConfig> for CascadeParams {
    fn from(config: &FaceDetectionConfig) -> Self {
        Self {
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
            min_size: config.min_size,
        }
    }
}

impl From<&EyeDetectionConfig> for CascadeParams {
    fn from(config: &EyeDetectionConfig) -> Self {
        Self {
            scale_factor: config.scale_factor,
            min_neighbors: config.min_neighbors,
            min_size: config.min_size,
        }
    }
}

impl CascadeParams {
    fn validate(&self, name: &str) -> Result<()> {
        if self.scale_factor <= 1.0 {
            return Err(Error::ConfigError(format!("{name} scale factor must be greater than 1.0")));
        }
        if self.min_neighbors < 0 {
            return Err(Error::ConfigError(format!("{name} min neighbors must not be negative")));
        }
        if self.min_size < 0 {
            return Err(Error::ConfigError(format!("{name} min size must not be negative")));
        }
        Ok(())
    }
}

impl Default for BlobConfig {
    fn default() -> Self {
        Self {
            filter_by_area: true,
            min_area: DEFAULT_BLOB_MIN_AREA,
            max_area: DEFAULT_BLOB_MAX_AREA,
            filter_by_circularity: false,
            min_circularity: 0.1,
            filter_by_convexity: true,
            min_convexity: 0.87,
            filter_by_inertia: true,
            min_inertia_ratio: 0.01,
        }
    }
}

impl Default for PupilConfig {
    fn default() -> Self {
        Self {
            erode_iterations: DEFAULT_ERODE_ITERATIONS,
            dilate_iterations: DEFAULT_DILATE_ITERATIONS,
            median_kernel: DEFAULT_MEDIAN_KERNEL,
            eyebrow_trim: DEFAULT_EYEBROW_TRIM,
            size_continuity_weight: DEFAULT_SIZE_CONTINUITY_WEIGHT,
            max_size_change: None,
        }
    }
}

impl Default for TrackingConfig {
    fn default() -> Self {
        Self {
            left_threshold: DEFAULT_THRESHOLD,
            right_threshold: DEFAULT_THRESHOLD,
            left_enabled: true,
            right_enabled: true,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            target_fps: DEFAULT_TARGET_FPS,
            mirror: false,
            show_eye_windows: true,
            draw_face_box: true,
            draw_pupils_on_main: true,
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the YAML is malformed.
    pub fn from_yaml(content: &str) -> Result<Self> {
        serde_yaml::from_str(content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration values.
    ///
    /// Model paths are not checked here; the detector registry resolves and
    /// loads them.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` describing the first invalid value.
    pub fn validate(&self) -> Result<()> {
        CascadeParams::from(&self.face_detection).validate("Face detection")?;
        CascadeParams::from(&self.eye_detection).validate("Eye detection")?;

        if self.blob.min_area < 0.0 || self.blob.min_area > self.blob.max_area {
            return Err(Error::ConfigError(
                "Blob min area must be non-negative and not exceed max area".to_string(),
            ));
        }

        let pupil = &self.pupil;
        if pupil.erode_iterations < 0 || pupil.dilate_iterations < 0 {
            return Err(Error::ConfigError("Morphology iterations must not be negative".to_string()));
        }
        if pupil.median_kernel < 3 || pupil.median_kernel % 2 == 0 {
            return Err(Error::ConfigError(
                "Median kernel must be odd and at least 3".to_string(),
            ));
        }
        if !(0.0..0.5).contains(&pupil.eyebrow_trim) {
            return Err(Error::ConfigError("Eyebrow trim must be in [0.0, 0.5)".to_string()));
        }
        if !(0.0..=1.0).contains(&pupil.size_continuity_weight) {
            return Err(Error::ConfigError(
                "Size continuity weight must be between 0.0 and 1.0".to_string(),
            ));
        }
        if let Some(change) = pupil.max_size_change {
            if change <= 0.0 {
                return Err(Error::ConfigError("Max size change must be positive".to_string()));
            }
        }

        for (side, threshold) in [
            ("Left", self.tracking.left_threshold),
            ("Right", self.tracking.right_threshold),
        ] {
            if !(THRESHOLD_MIN..=THRESHOLD_MAX).contains(&threshold) {
                return Err(Error::ConfigError(format!(
                    "{side} threshold must be between {THRESHOLD_MIN} and {THRESHOLD_MAX}"
                )));
            }
        }

        if self.display.target_fps == 0 {
            return Err(Error::ConfigError("Target FPS must be greater than 0".to_string()));
        }

        Ok(())
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Gaze Tracking Configuration

# Haar cascade files
models:
  face_cascade: "assets/haarcascades/haarcascade_frontalface_default.xml"
  eye_cascade: "assets/haarcascades/haarcascade_eye.xml"
  search_system_paths: true

# Face cascade
face_detection:
  scale_factor: 1.3
  min_neighbors: 5
  min_size: 30

# Eye cascade (run inside each coarse eye window)
eye_detection:
  scale_factor: 1.3
  min_neighbors: 5
  min_size: 10

# Pupil blob detector
blob:
  filter_by_area: true
  min_area: 25.0
  max_area: 1500.0
  filter_by_circularity: false
  min_circularity: 0.1
  filter_by_convexity: true
  min_convexity: 0.87
  filter_by_inertia: true
  min_inertia_ratio: 0.01

# Pupil preprocessing and selection
pupil:
  erode_iterations: 2
  dilate_iterations: 4
  median_kernel: 5
  eyebrow_trim: 0.25
  size_continuity_weight: 1.0
  max_size_change: null

# Initial thresholds and enable flags
tracking:
  left_threshold: 42
  right_threshold: 42
  left_enabled: true
  right_enabled: true

# Display settings
display:
  target_fps: 30
  mirror: false
  show_eye_windows: true
  draw_face_box: true
  draw_pupils_on_main: true
"#;
