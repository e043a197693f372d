//! Hand landmark detection.
//!
//! The pipeline only depends on the [`HandDetector`] trait. [`OnnxHandDetector`]
//! is the bundled backend: a MediaPipe-style hand landmark network run with
//! ONNX Runtime over the whole frame.

use crate::constants::{DEFAULT_MAX_HANDS, DEFAULT_MIN_DETECTION_CONFIDENCE, NUM_HAND_LANDMARKS, PIXEL_SCALE};
use crate::landmarks::{HandLandmarks, NormalizedLandmark};
use crate::{Error, Result};
use log::{debug, info};
use ndarray::{Array4, CowArray};
use opencv::core::{Mat, Size, Vec3f, CV_32F};
use opencv::imgproc::{self, InterpolationFlags};
use opencv::prelude::*;
use ort::{Environment, Session, Value};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Default landmark network input size
const DEFAULT_INPUT_SIZE: i32 = 224;

/// Values per landmark in the network output (x, y, z)
const COORDS_PER_LANDMARK: usize = 3;

/// Detector settings, fixed for the lifetime of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Path to the hand landmark ONNX model
    pub model: PathBuf,

    /// Maximum number of hands reported per frame
    pub max_hands: usize,

    /// Minimum presence score for a hand to be reported (0.0-1.0)
    pub min_detection_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            model: PathBuf::from("assets/hand_landmark.onnx"),
            max_hands: DEFAULT_MAX_HANDS,
            min_detection_confidence: DEFAULT_MIN_DETECTION_CONFIDENCE,
        }
    }
}

/// Something that finds hands in an RGB frame.
///
/// Each returned hand carries exactly 21 landmarks normalized to the frame
/// size. No stability is promised between frames.
pub trait HandDetector: Send {
    /// Detect hands in an RGB frame
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails
    fn detect(&mut self, rgb_frame: &Mat) -> Result<Vec<HandLandmarks>>;
}

impl<D: HandDetector + ?Sized> HandDetector for Box<D> {
    fn detect(&mut self, rgb_frame: &Mat) -> Result<Vec<HandLandmarks>> {
        (**self).detect(rgb_frame)
    }
}

/// Tensor layout expected by the network input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InputLayout {
    Nchw,
    Nhwc,
}

/// Hand landmark network run with `ONNX` Runtime.
///
/// The network sees the whole frame, so it reports at most one hand per call.
pub struct OnnxHandDetector {
    session: Session,
    input_size: i32,
    layout: InputLayout,
    config: DetectorConfig,
}

impl OnnxHandDetector {
    /// Load the model named in `config`
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The ONNX runtime environment cannot be created
    /// - The model file cannot be loaded
    /// - The model has no inputs or fewer than two outputs
    pub fn new(config: &DetectorConfig) -> Result<Self> {
        info!("Loading hand landmark model: {}", config.model.display());
        let environment = Arc::new(
            Environment::builder()
                .with_name("hand_landmarks")
                .with_log_level(ort::LoggingLevel::Warning)
                .build()?,
        );

        let session = ort::SessionBuilder::new(&environment)?
            .with_optimization_level(ort::GraphOptimizationLevel::Level3)?
            .with_model_from_file(&config.model)?;

        let input_meta = session
            .inputs
            .first()
            .ok_or_else(|| Error::Detector("Model has no inputs".to_string()))?;
        if session.outputs.len() < 2 {
            return Err(Error::Detector(format!(
                "Expected landmark and presence outputs, model has {}",
                session.outputs.len()
            )));
        }

        // [batch, 3, h, w] or [batch, h, w, 3]
        let dims = &input_meta.dimensions;
        let (layout, input_size) = match dims.as_slice() {
            [_, Some(3), Some(h), _] => (InputLayout::Nchw, *h as i32),
            [_, Some(h), _, Some(3)] => (InputLayout::Nhwc, *h as i32),
            _ => (InputLayout::Nchw, DEFAULT_INPUT_SIZE),
        };
        debug!("Hand landmark input: {layout:?} {input_size}x{input_size}");

        Ok(Self {
            session,
            input_size,
            layout,
            config: config.clone(),
        })
    }

    /// Create a detector from a model path with default thresholds
    ///
    /// # Errors
    ///
    /// Returns an error if the model cannot be loaded
    pub fn from_file<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        Self::new(&DetectorConfig {
            model: model_path.as_ref().to_path_buf(),
            ..DetectorConfig::default()
        })
    }

    /// Resize, scale to [0, 1] and pack the frame into the input tensor
    #[allow(clippy::cast_sign_loss)] // input size is positive
    fn preprocess(&self, rgb_frame: &Mat) -> Result<Array4<f32>> {
        let mut resized = Mat::default();
        imgproc::resize(
            rgb_frame,
            &mut resized,
            Size::new(self.input_size, self.input_size),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;

        let mut float_image = Mat::default();
        resized.convert_to(&mut float_image, CV_32F, PIXEL_SCALE, 0.0)?;

        let size = self.input_size as usize;
        let mut tensor = match self.layout {
            InputLayout::Nchw => Array4::<f32>::zeros((1, 3, size, size)),
            InputLayout::Nhwc => Array4::<f32>::zeros((1, size, size, 3)),
        };
        for row in 0..self.input_size {
            for col in 0..self.input_size {
                let pixel = float_image.at_2d::<Vec3f>(row, col)?;
                let (r, c) = (row as usize, col as usize);
                for ch in 0..3 {
                    match self.layout {
                        InputLayout::Nchw => tensor[[0, ch, r, c]] = pixel[ch],
                        InputLayout::Nhwc => tensor[[0, r, c, ch]] = pixel[ch],
                    }
                }
            }
        }

        Ok(tensor)
    }

    /// Run the network, returning raw landmark values and the presence score
    fn forward(&self, input: Array4<f32>) -> Result<(Vec<f32>, f32)> {
        let cow_array = CowArray::from(input.into_dyn());
        let input_tensor = Value::from_array(self.session.allocator(), &cow_array)?;
        let outputs = self.session.run(vec![input_tensor])?;

        let mut outputs = outputs.into_iter();
        let landmarks = outputs
            .next()
            .ok_or_else(|| Error::Detector("No landmark output from model".to_string()))?;
        let presence = outputs
            .next()
            .ok_or_else(|| Error::Detector("No presence output from model".to_string()))?;

        let landmarks = landmarks.try_extract::<f32>()?;
        let landmarks = landmarks
            .view()
            .as_slice()
            .ok_or_else(|| Error::Detector("Landmark output is not contiguous".to_string()))?
            .to_vec();

        let presence = presence.try_extract::<f32>()?;
        let presence = presence
            .view()
            .iter()
            .next()
            .copied()
            .ok_or_else(|| Error::Detector("Empty presence output".to_string()))?;

        Ok((landmarks, presence))
    }
}

impl HandDetector for OnnxHandDetector {
    fn detect(&mut self, rgb_frame: &Mat) -> Result<Vec<HandLandmarks>> {
        let input = self.preprocess(rgb_frame)?;
        let (raw, presence) = self.forward(input)?;
        let presence = presence_probability(presence);

        let hand = decode_landmarks(&raw, self.input_size)?;
        Ok(select_hands(vec![hand], presence, &self.config))
    }
}

/// Drop hands below the presence threshold and cap the count at `max_hands`.
fn select_hands(mut hands: Vec<HandLandmarks>, presence: f32, config: &DetectorConfig) -> Vec<HandLandmarks> {
    if presence < config.min_detection_confidence {
        hands.clear();
    }
    hands.truncate(config.max_hands);
    hands
}

/// Some exports emit the presence logit rather than a probability.
fn presence_probability(score: f32) -> f32 {
    if (0.0..=1.0).contains(&score) {
        score
    } else {
        1.0 / (1.0 + (-score).exp())
    }
}

/// Convert `21 * 3` values in input-pixel units into normalized landmarks.
#[allow(clippy::cast_precision_loss)] // input size is small
fn decode_landmarks(raw: &[f32], input_size: i32) -> Result<HandLandmarks> {
    let needed = NUM_HAND_LANDMARKS * COORDS_PER_LANDMARK;
    if raw.len() < needed {
        return Err(Error::Detector(format!(
            "Expected {needed} landmark values, model produced {}",
            raw.len()
        )));
    }

    let scale = input_size as f32;
    let points: Vec<NormalizedLandmark> = raw[..needed]
        .chunks_exact(COORDS_PER_LANDMARK)
        .map(|c| NormalizedLandmark::new(c[0] / scale, c[1] / scale, c[2] / scale))
        .collect();
    HandLandmarks::from_slice(&points)
}
