//! Real-time hand tracking and finger counting.
//!
//! This library provides:
//! - Hand landmark detection with ONNX Runtime behind the [`detector::HandDetector`] trait
//! - Mapping of the 21 normalized landmarks to pixel joints
//! - Skeleton rendering with `OpenCV`
//! - A per-finger extended/folded rule and a per-frame finger count
//! - A background capture loop with start, stop, cancel and progress reporting
//!
//! Each frame goes through:
//! 1. Downscaling to at most 800x600
//! 2. Hand detection on the RGB copy
//! 3. Skeleton drawing and finger counting per hand
//! 4. Handoff to a sink: the live display mailbox or a video file
//!
//! # Examples
//!
//! ## Counting fingers on one frame
//!
//! ```no_run
//! use finger_count::{detector::OnnxHandDetector, processor::FrameProcessor};
//! use opencv::{imgcodecs, prelude::*};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut detector = OnnxHandDetector::from_file("assets/hand_landmark.onnx")?;
//! let processor = FrameProcessor::default();
//!
//! let image = imgcodecs::imread("hand.jpg", imgcodecs::IMREAD_COLOR)?;
//! let result = processor.process(image, &mut detector)?;
//! println!("{} hand(s), {} finger(s) up", result.hand_count, result.total_fingers_up);
//! # Ok(())
//! # }
//! ```
//!
//! ## Geometry only
//!
//! ```
//! use finger_count::{fingers::count_extended, landmarks::{to_pixel_joints, HandLandmarks}};
//!
//! # fn main() -> finger_count::Result<()> {
//! let hand = HandLandmarks::from_xy(&[(0.5, 0.5); 21])?;
//! let joints = to_pixel_joints(&hand, 640, 480);
//! assert_eq!(joints[0].x, 320);
//! assert_eq!(count_extended(&joints), 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Processing a video file in the background
//!
//! ```no_run
//! use finger_count::pipeline::{OutputMode, PipelineConfig, PipelineDriver, PipelineEvent};
//! use finger_count::source::VideoSource;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::new(VideoSource::File("hands.mp4".into()))
//!     .with_output(OutputMode::file("hands_output.mp4"));
//! let mut driver = PipelineDriver::new(config);
//! driver.start()?;
//!
//! for event in driver.events().iter() {
//!     match event {
//!         PipelineEvent::Progress(percent) => println!("{percent:.0}%"),
//!         PipelineEvent::Error { kind, message } => eprintln!("{kind:?}: {message}"),
//!         PipelineEvent::Finished { frames, .. } => {
//!             println!("{frames} frames written");
//!             break;
//!         }
//!     }
//! }
//! # Ok(())
//! # }
//! ```

/// Normalized hand landmarks and their pixel projection
pub mod landmarks;

/// Hand skeleton rendering
pub mod skeleton;

/// Extended/folded classification of each finger
pub mod fingers;

/// Hand landmark detection
pub mod detector;

/// Per-frame detect, draw and count
pub mod processor;

/// Cameras, video files and network streams
pub mod source;

/// Display mailbox and video file output
pub mod sink;

/// Background capture loop and its state machine
pub mod pipeline;

/// Live window and file processing front ends
pub mod app;

/// Error types and result handling
pub mod error;

/// Constants used throughout the application
pub mod constants;

/// Configuration management
pub mod config;

pub use error::{Error, ErrorKind, Result};
