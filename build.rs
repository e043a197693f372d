//! Build script for detecting system dependencies and providing installation guidance.
//!
//! This script checks for the libraries the `opencv` crate links against and for
//! pkg-config, and prints installation hints if they are missing.

use std::env;
use std::process::Command;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Check for OpenCV
    check_opencv();

    // highgui needs a GUI backend for the live window
    check_gtk();

    // Check for pkg-config
    check_pkg_config();

    // Print detected environment
    println!(
        "cargo:rustc-env=BUILD_TARGET={}",
        env::var("TARGET").unwrap_or_default()
    );
    println!("cargo:rustc-env=BUILD_HOST={}", env::var("HOST").unwrap_or_default());
}

fn check_opencv() {
    println!("cargo:rerun-if-env-changed=PKG_CONFIG_PATH");
    println!("cargo:rerun-if-env-changed=OPENCV_LINK_PATHS");
    println!("cargo:rerun-if-env-changed=OPENCV_INCLUDE_PATHS");

    // Newer installs register as opencv4, older ones as opencv
    let version = ["opencv4", "opencv"].iter().find_map(|lib| {
        Command::new("pkg-config")
            .args(["--modversion", lib])
            .output()
            .ok()
            .filter(|output| output.status.success())
            .map(|output| String::from_utf8_lossy(&output.stdout).trim().to_string())
    });

    match version {
        Some(version) => println!("cargo:warning=Found OpenCV version: {version}"),
        None => {
            println!("cargo:warning=OpenCV not found via pkg-config. Make sure OpenCV is installed.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install libopencv-dev");
            println!("cargo:warning=On macOS: brew install opencv");
        }
    }
}

fn check_gtk() {
    if !env::var("TARGET").unwrap_or_default().contains("linux") {
        return;
    }
    let found = ["gtk+-3.0", "gtk+-2.0"].iter().any(|lib| {
        Command::new("pkg-config")
            .args(["--exists", lib])
            .output()
            .map(|output| output.status.success())
            .unwrap_or(false)
    });
    if !found {
        println!("cargo:warning=GTK not found. The live window needs OpenCV built with a GUI backend;");
        println!("cargo:warning=--headless file processing still works.");
        println!("cargo:warning=On Ubuntu: sudo apt-get install libgtk-3-dev");
    }
}

fn check_pkg_config() {
    let output = Command::new("pkg-config").arg("--version").output();

    match output {
        Ok(output) if output.status.success() => {
            let version = String::from_utf8_lossy(&output.stdout);
            println!("cargo:warning=Found pkg-config version: {}", version.trim());
        }
        _ => {
            println!("cargo:warning=pkg-config not found. This is required to find system libraries.");
            println!("cargo:warning=On Ubuntu: sudo apt-get install pkg-config");
            println!("cargo:warning=On macOS: brew install pkg-config");
        }
    }
}
