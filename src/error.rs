//! Error types for the finger counting pipeline.

use thiserror::Error;

/// Main error type for the library
#[derive(Error, Debug)]
pub enum Error {
    /// `OpenCV` operation failed
    #[error("OpenCV error: {0}")]
    OpenCV(#[from] opencv::Error),

    /// `ONNX` Runtime inference failed
    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::OrtError),

    /// File I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Camera, file or stream could not be opened
    #[error("Input source not accessible: {0}")]
    SourceUnavailable(String),

    /// A single frame could not be read; the source is still open
    #[error("Frame read failed: {0}")]
    TransientRead(String),

    /// The hand detector reported an internal error
    #[error("Detector failure: {0}")]
    Detector(String),

    /// The output writer could not be created or written
    #[error("Output error: {0}")]
    Sink(String),

    /// Invalid input parameters provided
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Operation not allowed in the current pipeline state
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Coarse failure classes reported to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Source could not be opened
    SourceUnavailable,
    /// Frame read failed without end of stream
    TransientReadFailure,
    /// Detector raised an internal error
    DetectorFailure,
    /// Output encoder failed
    SinkFailure,
    /// Anything else (drawing, colour conversion, bad state)
    Internal,
}

impl Error {
    /// Classify this error for reporting.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SourceUnavailable(_) => ErrorKind::SourceUnavailable,
            Self::TransientRead(_) => ErrorKind::TransientReadFailure,
            Self::Detector(_) | Self::OnnxRuntime(_) => ErrorKind::DetectorFailure,
            Self::Sink(_) => ErrorKind::SinkFailure,
            Self::OpenCV(_)
            | Self::Io(_)
            | Self::InvalidInput(_)
            | Self::InvalidState(_)
            | Self::ConfigError(_) => ErrorKind::Internal,
        }
    }

    /// Re-tag an error raised inside a detector call as a detector failure.
    #[must_use]
    pub fn into_detector_failure(self) -> Self {
        match self {
            Self::Detector(_) => self,
            other => Self::Detector(other.to_string()),
        }
    }
}

/// Convenience type alias for Results with our Error type
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            Error::SourceUnavailable("camera 3".into()).kind(),
            ErrorKind::SourceUnavailable
        );
        assert_eq!(Error::TransientRead("empty".into()).kind(), ErrorKind::TransientReadFailure);
        assert_eq!(Error::Detector("boom".into()).kind(), ErrorKind::DetectorFailure);
        assert_eq!(Error::Sink("writer".into()).kind(), ErrorKind::SinkFailure);
        assert_eq!(Error::InvalidState("running".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_into_detector_failure() {
        let err = Error::InvalidInput("20 landmarks".into()).into_detector_failure();
        assert_eq!(err.kind(), ErrorKind::DetectorFailure);
        assert!(err.to_string().contains("20 landmarks"));

        // Already a detector failure: message is not wrapped twice
        let err = Error::Detector("model crashed".into()).into_detector_failure();
        assert_eq!(err.to_string(), "Detector failure: model crashed");
    }
}
