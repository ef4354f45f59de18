//! Constants used throughout the application

/// Default Haar cascade file for frontal faces
pub const FACE_CASCADE_FILE: &str = "haarcascade_frontalface_default.xml";

/// Default Haar cascade file for eyes
pub const EYE_CASCADE_FILE: &str = "haarcascade_eye.xml";

/// Directories searched for cascade files when the configured path is missing
pub const SYSTEM_CASCADE_DIRS: [&str; 3] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
];

/// Cascade detection defaults
pub const DEFAULT_FACE_SCALE_FACTOR: f64 = 1.3;
pub const DEFAULT_FACE_MIN_NEIGHBORS: i32 = 5;
pub const DEFAULT_FACE_MIN_SIZE: i32 = 30;
pub const DEFAULT_EYE_SCALE_FACTOR: f64 = 1.3;
pub const DEFAULT_EYE_MIN_NEIGHBORS: i32 = 5;
pub const DEFAULT_EYE_MIN_SIZE: i32 = 10;

/// Binarization output value for pixels at or above the threshold
pub const BINARY_MAX_VALUE: f64 = 255.0;

/// Valid threshold range (inclusive)
pub const THRESHOLD_MIN: i32 = 0;
pub const THRESHOLD_MAX: i32 = 255;

/// Initial per-eye threshold
pub const DEFAULT_THRESHOLD: i32 = 42;

/// Pupil preprocessing defaults
pub const DEFAULT_ERODE_ITERATIONS: i32 = 2;
pub const DEFAULT_DILATE_ITERATIONS: i32 = 4;
pub const DEFAULT_MEDIAN_KERNEL: i32 = 5;
pub const DEFAULT_EYEBROW_TRIM: f32 = 0.25;

/// Blob detector defaults
pub const DEFAULT_BLOB_MIN_AREA: f32 = 25.0;
pub const DEFAULT_BLOB_MAX_AREA: f32 = 1500.0;

/// Weight of size continuity when choosing among several blobs
pub const DEFAULT_SIZE_CONTINUITY_WEIGHT: f32 = 1.0;

/// Display defaults
pub const DEFAULT_TARGET_FPS: u32 = 30;

/// Window titles
pub const MAIN_WINDOW: &str = "Gaze Tracking";
pub const LEFT_EYE_WINDOW: &str = "Left Eye";
pub const RIGHT_EYE_WINDOW: &str = "Right Eye";

/// Trackbar names
pub const THRESHOLD_TRACKBAR: &str = "threshold";
pub const ENABLED_TRACKBAR: &str = "enabled";

/// Numeric precision epsilon
pub const EPSILON: f32 = 1e-6;
