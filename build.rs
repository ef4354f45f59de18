//! Build script: reports the OpenCV installation and where Haar cascade data
//! can be found, with installation hints when something is missing.

use std::path::Path;
use std::process::Command;

const CASCADE_DIRS: [&str; 3] = [
    "/usr/share/opencv4/haarcascades",
    "/usr/local/share/opencv4/haarcascades",
    "/usr/share/opencv/haarcascades",
];

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    if !pkg_config_available() {
        println!("cargo:warning=pkg-config not found. This is required to find system libraries.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
        println!("cargo:warning=On macOS: brew install pkg-config");
        return;
    }

    match opencv_version() {
        Some(version) => println!("cargo:warning=Found OpenCV version: {version}"),
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
            println!("cargo:warning=On macOS: brew install opencv");
        }
    }

    if !CASCADE_DIRS.iter().any(|dir| Path::new(dir).is_dir()) {
        println!("cargo:warning=No system Haar cascade directory found.");
        println!("cargo:warning=Set models.face_cascade and models.eye_cascade in the config file.");
    }
}

fn pkg_config_available() -> bool {
    Command::new("pkg-config")
        .arg("--version")
        .output()
        .is_ok_and(|output| output.status.success())
}

fn opencv_version() -> Option<String> {
    ["opencv4", "opencv"].iter().find_map(|module| {
        let output = Command::new("pkg-config").args(["--modversion", module]).output().ok()?;
        output
            .status
            .success()
            .then(|| String::from_utf8_lossy(&output.stdout).trim().to_string())
    })
}
