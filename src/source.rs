//! Frame sources: cameras, video files and network streams.

use crate::{Error, Result};
use log::{debug, info, warn};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, CAP_PROP_BUFFERSIZE, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT},
};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Where frames come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VideoSource {
    /// Webcam index
    Camera(i32),
    /// Video file path
    File(PathBuf),
    /// Network stream URL, passed to the backend unchanged
    Network(String),
}

impl VideoSource {
    /// Stream URL for an IP camera app given as `host:port`
    #[must_use]
    pub fn ip_camera(address: &str) -> Self {
        Self::Network(format!("http://{}/video", address.trim()))
    }

    /// The other of the two camera indices; other sources are unchanged
    #[must_use]
    pub fn next_camera(&self) -> Self {
        match self {
            Self::Camera(index) => Self::Camera((index + 1) % 2),
            other => other.clone(),
        }
    }

    /// Whether running out of frames means the source is exhausted
    #[must_use]
    pub fn is_finite(&self) -> bool {
        matches!(self, Self::File(_))
    }
}

impl Default for VideoSource {
    fn default() -> Self {
        Self::Camera(0)
    }
}

impl fmt::Display for VideoSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Camera(index) => write!(f, "camera {index}"),
            Self::File(path) => write!(f, "{}", path.display()),
            Self::Network(url) => f.write_str(url),
        }
    }
}

impl FromStr for VideoSource {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InvalidInput("Empty video source".to_string()));
        }
        if let Ok(index) = s.parse::<i32>() {
            return Ok(Self::Camera(index));
        }
        if ["http://", "https://", "rtsp://"].iter().any(|scheme| s.starts_with(scheme)) {
            return Ok(Self::Network(s.to_string()));
        }
        Ok(Self::File(PathBuf::from(s)))
    }
}

/// Outcome of a successful read
#[derive(Debug)]
pub enum FrameRead {
    /// A decoded BGR frame, owned by the caller
    Frame(Mat),
    /// The source has no more frames
    EndOfStream,
}

/// A stream of BGR frames.
///
/// A failed read that is not end of stream is reported as
/// [`Error::TransientRead`]; the source stays usable.
pub trait FrameSource: Send {
    /// Read the next frame
    ///
    /// # Errors
    ///
    /// Returns `TransientRead` for a skipped frame
    fn read(&mut self) -> Result<FrameRead>;

    /// Nominal frame rate, if the source reports one
    fn fps(&self) -> Option<f64> {
        None
    }

    /// Total frame count, if cheaply known
    fn frame_count(&self) -> Option<u64> {
        None
    }

    /// Release the underlying device or file
    ///
    /// # Errors
    ///
    /// Returns an error if the backend fails to release
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}

/// `OpenCV` `VideoCapture`-backed source
pub struct CaptureSource {
    source: VideoSource,
    capture: VideoCapture,
}

impl CaptureSource {
    /// Open a source, failing with `SourceUnavailable` if it cannot be read
    ///
    /// # Errors
    ///
    /// Returns `SourceUnavailable` for a wrong camera index, a bad path or an
    /// unreachable stream
    pub fn open(source: &VideoSource) -> Result<Self> {
        let unavailable = |e: opencv::Error| Error::SourceUnavailable(format!("{source}: {e}"));

        let mut capture = match source {
            VideoSource::Camera(index) => {
                info!("Opening camera {index}");
                VideoCapture::new(*index, videoio::CAP_ANY).map_err(unavailable)?
            }
            VideoSource::File(path) => {
                info!("Opening video file: {}", path.display());
                if !path.exists() {
                    return Err(Error::SourceUnavailable(format!("{}: no such file", path.display())));
                }
                VideoCapture::from_file(&path.to_string_lossy(), videoio::CAP_ANY).map_err(unavailable)?
            }
            VideoSource::Network(url) => {
                info!("Opening network stream: {url}");
                VideoCapture::from_file(url, videoio::CAP_ANY).map_err(unavailable)?
            }
        };

        if !capture.is_opened().map_err(unavailable)? {
            return Err(Error::SourceUnavailable(source.to_string()));
        }

        if let VideoSource::Camera(_) = source {
            // Keep live latency at one frame
            if let Err(e) = capture.set(CAP_PROP_BUFFERSIZE, 1.0) {
                debug!("Could not shrink capture buffer: {e}");
            }
        }

        Ok(Self {
            source: source.clone(),
            capture,
        })
    }
}

impl FrameSource for CaptureSource {
    fn read(&mut self) -> Result<FrameRead> {
        let mut frame = Mat::default();
        let ok = self
            .capture
            .read(&mut frame)
            .map_err(|e| Error::TransientRead(e.to_string()))?;

        if ok && !frame.empty() {
            return Ok(FrameRead::Frame(frame));
        }
        if self.source.is_finite() {
            return Ok(FrameRead::EndOfStream);
        }
        Err(Error::TransientRead(format!("No frame from {}", self.source)))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn frame_count(&self) -> Option<u64> {
        if !self.source.is_finite() {
            return None;
        }
        match self.capture.get(CAP_PROP_FRAME_COUNT) {
            Ok(count) if count >= 1.0 => Some(count as u64),
            _ => None,
        }
    }

    fn fps(&self) -> Option<f64> {
        match self.capture.get(CAP_PROP_FPS) {
            Ok(fps) if fps.is_finite() && fps > 0.0 => Some(fps),
            _ => None,
        }
    }

    fn release(&mut self) -> Result<()> {
        info!("Releasing {}", self.source);
        if let Err(e) = self.capture.release() {
            warn!("Failed to release {}: {e}", self.source);
            return Err(e.into());
        }
        Ok(())
    }
}
