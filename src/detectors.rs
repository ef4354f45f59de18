//! Detector registry: the face, eye and pupil-blob detectors.
//!
//! Detectors are created once at startup and then only read. OpenCV's
//! detection calls take `&mut self`, so each backend keeps its native object
//! behind a `RefCell`; the pipeline is single-threaded and never re-enters a
//! detector while it is running.

use crate::config::{BlobConfig, CascadeParams, Config};
use crate::constants::SYSTEM_CASCADE_DIRS;
use crate::pupil_tracker::Keypoint;
use crate::region::Region;
use crate::{Error, Result};
use log::{info, warn};
use opencv::core::{KeyPoint, Mat, Ptr, Rect, Size, Vector};
use opencv::features2d::{SimpleBlobDetector, SimpleBlobDetector_Params};
use opencv::objdetect::CascadeClassifier;
use opencv::prelude::*;
use std::cell::RefCell;
use std::path::{Path, PathBuf};

/// Finds rectangular objects (faces, eyes) in a grayscale image.
pub trait RegionDetector {
    /// Candidate regions in the coordinate space of `gray`, in detector order.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend itself fails; "nothing found" is
    /// an empty vector.
    fn detect(&self, gray: &Mat) -> Result<Vec<Region>>;

    /// Short name used in logs
    fn name(&self) -> &str;
}

/// Finds compact dark blobs in a binarized single-channel image.
pub trait BlobDetector {
    /// Candidate keypoints in the coordinate space of `binary`, in detector order.
    ///
    /// # Errors
    ///
    /// Returns an error only if the backend itself fails.
    fn detect(&self, binary: &Mat) -> Result<Vec<Keypoint>>;
}

/// Haar cascade backed [`RegionDetector`]
pub struct CascadeRegionDetector {
    classifier: RefCell<CascadeClassifier>,
    params: CascadeParams,
    name: String,
}

impl CascadeRegionDetector {
    /// Load a cascade from an XML model file.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if the file is missing or OpenCV cannot parse it.
    pub fn load<P: AsRef<Path>>(path: P, params: CascadeParams, name: &str) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(Error::ModelError(format!("{name} cascade not found: {}", path.display())));
        }
        let path_str = path
            .to_str()
            .ok_or_else(|| Error::ModelError(format!("Non UTF-8 model path: {}", path.display())))?;

        // OpenCV loads unparseable XML as an empty classifier
        let classifier = CascadeClassifier::new(path_str)
            .map_err(|e| Error::ModelError(format!("Failed to load {name} cascade {}: {e}", path.display())))?;
        if classifier.empty()? {
            return Err(Error::ModelError(format!(
                "{name} cascade is empty or corrupt: {}",
                path.display()
            )));
        }

        info!("Loaded {} cascade from {}", name, path.display());
        Ok(Self {
            classifier: RefCell::new(classifier),
            params,
            name: name.to_string(),
        })
    }
}

impl RegionDetector for CascadeRegionDetector {
    fn detect(&self, gray: &Mat) -> Result<Vec<Region>> {
        let mut objects = Vector::<Rect>::new();
        let min_size = Size::new(self.params.min_size, self.params.min_size);
        self.classifier.borrow_mut().detect_multi_scale(
            gray,
            &mut objects,
            self.params.scale_factor,
            self.params.min_neighbors,
            0,
            min_size,
            Size::new(0, 0),
        )?;

        // Keep only what lies inside the image
        Ok(objects
            .iter()
            .filter_map(|rect| Region::from_rect(rect).clamp_to(gray.cols(), gray.rows()))
            .collect())
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// `SimpleBlobDetector` backed [`BlobDetector`] tuned for dark, round pupils.
///
/// The input is expected to be binarized with the pupil at intensity 0.
pub struct SimpleBlobPupilDetector {
    detector: RefCell<Ptr<SimpleBlobDetector>>,
}

impl SimpleBlobPupilDetector {
    /// Build the detector from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if OpenCV rejects the parameters.
    pub fn new(config: &BlobConfig) -> Result<Self> {
        let mut params = SimpleBlobDetector_Params::default()?;
        // Pupils are the dark (0) blobs of the binarized eye
        params.filter_by_color = true;
        params.blob_color = 0;
        params.filter_by_area = config.filter_by_area;
        params.min_area = config.min_area;
        params.max_area = config.max_area;
        params.filter_by_circularity = config.filter_by_circularity;
        params.min_circularity = config.min_circularity;
        params.filter_by_convexity = config.filter_by_convexity;
        params.min_convexity = config.min_convexity;
        params.filter_by_inertia = config.filter_by_inertia;
        params.min_inertia_ratio = config.min_inertia_ratio;

        let detector = SimpleBlobDetector::create(params)?;
        Ok(Self {
            detector: RefCell::new(detector),
        })
    }
}

impl BlobDetector for SimpleBlobPupilDetector {
    fn detect(&self, binary: &Mat) -> Result<Vec<Keypoint>> {
        let mut keypoints = Vector::<KeyPoint>::new();
        self.detector
            .borrow_mut()
            .detect(binary, &mut keypoints, &Mat::default())?;

        Ok(keypoints
            .iter()
            .map(|kp| {
                let pt = kp.pt();
                Keypoint::new(pt.x, pt.y, kp.size())
            })
            .collect())
    }
}

/// The three detectors shared by every frame of a session.
pub struct DetectorRegistry {
    face: Box<dyn RegionDetector>,
    eye: Box<dyn RegionDetector>,
    blob: Box<dyn BlobDetector>,
}

impl DetectorRegistry {
    /// Assemble a registry from already constructed detectors
    #[must_use]
    pub fn new(face: Box<dyn RegionDetector>, eye: Box<dyn RegionDetector>, blob: Box<dyn BlobDetector>) -> Self {
        Self { face, eye, blob }
    }

    /// Load the cascades and build the blob detector from configuration.
    ///
    /// # Errors
    ///
    /// Returns `ModelError` if either cascade is missing or corrupt. This is
    /// the only fatal failure of the pipeline.
    pub fn load(config: &Config) -> Result<Self> {
        let face_path = resolve_model_path(&config.models.face_cascade, config.models.search_system_paths)?;
        let eye_path = resolve_model_path(&config.models.eye_cascade, config.models.search_system_paths)?;

        let face = CascadeRegionDetector::load(face_path, CascadeParams::from(&config.face_detection), "face")?;
        let eye = CascadeRegionDetector::load(eye_path, CascadeParams::from(&config.eye_detection), "eye")?;
        let blob = SimpleBlobPupilDetector::new(&config.blob)?;

        Ok(Self::new(Box::new(face), Box::new(eye), Box::new(blob)))
    }

    #[must_use]
    pub fn face(&self) -> &dyn RegionDetector {
        self.face.as_ref()
    }

    #[must_use]
    pub fn eye(&self) -> &dyn RegionDetector {
        self.eye.as_ref()
    }

    #[must_use]
    pub fn blob(&self) -> &dyn BlobDetector {
        self.blob.as_ref()
    }
}

/// Locate a cascade file, optionally falling back to the system OpenCV data
/// directories by file name.
///
/// # Errors
///
/// Returns `ModelError` if no candidate exists.
pub fn resolve_model_path(configured: &Path, search_system_paths: bool) -> Result<PathBuf> {
    if configured.is_file() {
        return Ok(configured.to_path_buf());
    }

    if search_system_paths {
        if let Some(file_name) = configured.file_name() {
            for dir in SYSTEM_CASCADE_DIRS {
                let candidate = Path::new(dir).join(file_name);
                if candidate.is_file() {
                    warn!(
                        "Model {} not found, using {}",
                        configured.display(),
                        candidate.display()
                    );
                    return Ok(candidate);
                }
            }
        }
    }

    Err(Error::ModelError(format!("Model file not found: {}", configured.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FaceDetectionConfig;
    use opencv::core::{Point, Scalar, CV_8UC1};
    use opencv::imgproc;
    use std::io::Write;

    fn face_params() -> CascadeParams {
        CascadeParams::from(&FaceDetectionConfig::default())
    }

    fn white_image_with_dark_disc(cx: i32, cy: i32, radius: i32) -> Mat {
        let mut image = Mat::new_rows_cols_with_default(60, 80, CV_8UC1, Scalar::all(255.0)).unwrap();
        imgproc::circle(&mut image, Point::new(cx, cy), radius, Scalar::all(0.0), -1, imgproc::LINE_8, 0).unwrap();
        image
    }

    #[test]
    fn test_resolve_missing_model_without_fallback() {
        let result = resolve_model_path(Path::new("/nonexistent/haarcascade_eye.xml"), false);
        assert!(matches!(result, Err(Error::ModelError(_))));
    }

    #[test]
    fn test_resolve_existing_model() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let resolved = resolve_model_path(file.path(), false).unwrap();
        assert_eq!(resolved, file.path());
    }

    #[test]
    fn test_load_missing_cascade_is_model_error() {
        let result = CascadeRegionDetector::load("/nonexistent/face.xml", face_params(), "face");
        assert!(matches!(result, Err(Error::ModelError(_))));
    }

    #[test]
    fn test_load_corrupt_cascade_fails() {
        let mut file = tempfile::Builder::new().suffix(".xml").tempfile().unwrap();
        writeln!(file, "<?xml version=\"1.0\"?><opencv_storage><nonsense/></opencv_storage>").unwrap();
        let result = CascadeRegionDetector::load(file.path(), face_params(), "face");
        assert!(result.is_err());
    }

    #[test]
    fn test_registry_load_fails_without_models() {
        let mut config = Config::new();
        config.models.face_cascade = PathBuf::from("/nonexistent/face.xml");
        config.models.eye_cascade = PathBuf::from("/nonexistent/eye.xml");
        config.models.search_system_paths = false;
        let result = DetectorRegistry::load(&config);
        assert!(matches!(result, Err(Error::ModelError(_))));
    }

    #[test]
    fn test_blob_detector_finds_dark_disc() {
        let detector = SimpleBlobPupilDetector::new(&BlobConfig::default()).unwrap();
        let image = white_image_with_dark_disc(40, 30, 8);
        let keypoints = detector.detect(&image).unwrap();
        assert_eq!(keypoints.len(), 1);
        assert!((keypoints[0].x - 40.0).abs() < 1.5);
        assert!((keypoints[0].y - 30.0).abs() < 1.5);
        assert!(keypoints[0].size > 10.0);
    }

    #[test]
    fn test_blob_detector_ignores_blank_image() {
        let detector = SimpleBlobPupilDetector::new(&BlobConfig::default()).unwrap();
        let image = Mat::new_rows_cols_with_default(60, 80, CV_8UC1, Scalar::all(255.0)).unwrap();
        assert!(detector.detect(&image).unwrap().is_empty());
    }

    #[test]
    fn test_blob_detector_respects_max_area() {
        let config = BlobConfig {
            max_area: 100.0,
            ..BlobConfig::default()
        };
        let detector = SimpleBlobPupilDetector::new(&config).unwrap();
        let image = white_image_with_dark_disc(40, 30, 15);
        assert!(detector.detect(&image).unwrap().is_empty());
    }
}
