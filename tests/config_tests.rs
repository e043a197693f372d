//! Configuration file round-trips and CLI-style overrides

use finger_count::{
    config::{Config, EXAMPLE_CONFIG},
    pipeline::OutputMode,
    source::VideoSource,
};
use std::path::PathBuf;

#[test]
fn test_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("finger_count.yaml");

    let mut config = Config::default();
    config.detector.min_detection_confidence = 0.65;
    config.detector.model = PathBuf::from("models/hands.onnx");
    config.capture.max_consecutive_read_failures = 0;
    config.output.fourcc = "MJPG".to_string();
    config.display.window_title = "Hands".to_string();
    config.to_file(&path).unwrap();

    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_example_config_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("example.yaml");
    std::fs::write(&path, EXAMPLE_CONFIG).unwrap();

    let config = Config::from_file(&path).unwrap();
    assert_eq!(config.detector.max_hands, 2);
    assert_eq!(config.processing.max_width, 800);
    assert_eq!(config.processing.max_height, 600);
    assert_eq!(config.output.fourcc, "mp4v");
}

#[test]
fn test_empty_file_gives_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.yaml");
    std::fs::write(&path, "{}\n").unwrap();

    assert_eq!(Config::from_file(&path).unwrap(), Config::default());
}

#[test]
fn test_pipeline_config_carries_sections() {
    let mut config = Config::default();
    config.processing.max_width = 640;
    config.output.default_fps = 24.0;

    let pipeline = config.pipeline_config(VideoSource::ip_camera("10.0.0.2:8080"), Some("out.avi".into()));
    assert_eq!(pipeline.source, VideoSource::Network("http://10.0.0.2:8080/video".to_string()));
    assert_eq!(pipeline.processor.max_width, 640);
    assert_eq!(
        pipeline.output,
        OutputMode::File {
            path: PathBuf::from("out.avi"),
            fourcc: "mp4v".to_string(),
            default_fps: 24.0,
        }
    );
}
