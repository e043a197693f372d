//! Configuration management for the finger counting application

use crate::constants::{DEFAULT_FOURCC, DEFAULT_FPS};
use crate::detector::DetectorConfig;
use crate::pipeline::{CaptureConfig, OutputMode, PipelineConfig};
use crate::processor::ProcessorConfig;
use crate::sink::parse_fourcc;
use crate::source::VideoSource;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Hand detector configuration
    pub detector: DetectorConfig,

    /// Frame size limits
    pub processing: ProcessorConfig,

    /// Capture loop tolerances
    pub capture: CaptureConfig,

    /// Video file output
    pub output: OutputConfig,

    /// Live window
    pub display: DisplayConfig,
}

/// Video file output settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Four character codec code
    pub fourcc: String,

    /// Frame rate used when the source reports none
    pub default_fps: f64,
}

/// Live window settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Window title
    pub window_title: String,

    /// How long the window waits for a key between frames
    pub poll_interval_ms: i32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fourcc: DEFAULT_FOURCC.to_string(),
            default_fps: DEFAULT_FPS,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            window_title: "Finger Count".to_string(),
            poll_interval_ms: 10,
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        serde_yaml::from_str(&content).map_err(|e| Error::ConfigError(format!("Failed to parse config: {e}")))
    }

    /// Save configuration to a YAML file
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = serde_yaml::to_string(self)
            .map_err(|e| Error::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)?;

        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.detector.min_detection_confidence) {
            return Err(Error::ConfigError(
                "Detection confidence must be between 0.0 and 1.0".to_string(),
            ));
        }
        if self.detector.max_hands == 0 {
            return Err(Error::ConfigError("max_hands must be at least 1".to_string()));
        }

        if self.processing.max_width <= 0 || self.processing.max_height <= 0 {
            return Err(Error::ConfigError(
                "Processing frame bounds must be greater than 0".to_string(),
            ));
        }

        parse_fourcc(&self.output.fourcc).map_err(|e| Error::ConfigError(e.to_string()))?;
        if !(self.output.default_fps.is_finite() && self.output.default_fps > 0.0) {
            return Err(Error::ConfigError("Default FPS must be greater than 0".to_string()));
        }

        if self.display.poll_interval_ms <= 0 {
            return Err(Error::ConfigError(
                "Display poll interval must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Build the settings for one pipeline run.
    ///
    /// `output` selects the file variant; `None` shows frames live.
    #[must_use]
    pub fn pipeline_config(&self, source: VideoSource, output: Option<PathBuf>) -> PipelineConfig {
        let output = match output {
            Some(path) => OutputMode::File {
                path,
                fourcc: self.output.fourcc.clone(),
                default_fps: self.output.default_fps,
            },
            None => OutputMode::Display,
        };
        PipelineConfig {
            source,
            detector: self.detector.clone(),
            processor: self.processing.clone(),
            capture: self.capture.clone(),
            output,
        }
    }
}

/// Example configuration file content
pub const EXAMPLE_CONFIG: &str = r#"# Finger Count Configuration

# Hand landmark detector
detector:
  model: "assets/hand_landmark.onnx"
  max_hands: 2
  min_detection_confidence: 0.5

# Frames larger than this are resized to exactly this size
processing:
  max_width: 800
  max_height: 600

# Give up after this many failed reads in a row (0 = never)
capture:
  max_consecutive_read_failures: 300

# Video file output
output:
  fourcc: "mp4v"
  default_fps: 30.0

# Live window
display:
  window_title: "Finger Count"
  poll_interval_ms: 10
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_config_matches_defaults() {
        let parsed: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
        assert_eq!(parsed, Config::default());
        assert!(parsed.validate().is_ok());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let parsed: Config = serde_yaml::from_str("detector:\n  min_detection_confidence: 0.7\n").unwrap();
        assert!((parsed.detector.min_detection_confidence - 0.7).abs() < f32::EPSILON);
        assert_eq!(parsed.detector.max_hands, 2);
        assert_eq!(parsed.processing, ProcessorConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.detector.min_detection_confidence = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.detector.max_hands = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.fourcc = "h264x".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.output.default_fps = 0.0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.processing.max_height = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pipeline_config_output_mode() {
        let config = Config::default();
        let live = config.pipeline_config(VideoSource::Camera(1), None);
        assert_eq!(live.output, OutputMode::Display);
        assert_eq!(live.source, VideoSource::Camera(1));

        let file = config.pipeline_config(VideoSource::File("in.mp4".into()), Some("out.mp4".into()));
        match file.output {
            OutputMode::File { path, fourcc, .. } => {
                assert_eq!(path, PathBuf::from("out.mp4"));
                assert_eq!(fourcc, "mp4v");
            }
            OutputMode::Display => panic!("expected file output"),
        }
    }
}
