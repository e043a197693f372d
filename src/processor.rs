//! Per-frame processing: detect, draw, count.

use crate::constants::{MAX_FRAME_HEIGHT, MAX_FRAME_WIDTH};
use crate::detector::HandDetector;
use crate::fingers::count_extended;
use crate::landmarks::to_pixel_joints;
use crate::skeleton::draw_skeleton;
use crate::Result;
use log::trace;
use opencv::{
    core::{Mat, Size},
    imgproc::{self, InterpolationFlags},
    prelude::*,
};
use serde::{Deserialize, Serialize};

/// Frame size limits applied before detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Frames wider than this are resized to `max_width` x `max_height`
    pub max_width: i32,

    /// Frames taller than this are resized to `max_width` x `max_height`
    pub max_height: i32,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            max_width: MAX_FRAME_WIDTH,
            max_height: MAX_FRAME_HEIGHT,
        }
    }
}

/// One processed frame and its counters
#[derive(Debug)]
pub struct FrameResult {
    /// The (possibly downscaled) BGR frame with skeletons drawn on it
    pub frame: Mat,
    /// Number of hands the detector reported
    pub hand_count: usize,
    /// Extended fingers summed over all hands, at most `5 * hand_count`
    pub total_fingers_up: usize,
}

/// Runs detection, rendering and classification on single frames
#[derive(Debug, Clone, Default)]
pub struct FrameProcessor {
    config: ProcessorConfig,
}

impl FrameProcessor {
    #[must_use]
    pub fn new(config: ProcessorConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Process one BGR frame, taking ownership of it.
    ///
    /// # Errors
    ///
    /// Detector errors are returned as `Detector` failures and are never
    /// masked; resizing, colour conversion or drawing errors are returned as is
    pub fn process(&self, frame: Mat, detector: &mut dyn HandDetector) -> Result<FrameResult> {
        let mut frame = self.bound_size(frame)?;

        let mut rgb = Mat::default();
        imgproc::cvt_color(&frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;

        let hands = detector.detect(&rgb).map_err(crate::Error::into_detector_failure)?;

        let (width, height) = (frame.cols(), frame.rows());
        let mut total_fingers_up = 0;
        for hand in &hands {
            let joints = to_pixel_joints(hand, width, height);
            draw_skeleton(&mut frame, &joints)?;
            total_fingers_up += count_extended(&joints);
        }
        trace!("{} hand(s), {} finger(s) up", hands.len(), total_fingers_up);

        Ok(FrameResult {
            frame,
            hand_count: hands.len(),
            total_fingers_up,
        })
    }

    /// Resize to the fixed bound if either side exceeds it
    fn bound_size(&self, frame: Mat) -> Result<Mat> {
        if frame.cols() <= self.config.max_width && frame.rows() <= self.config.max_height {
            return Ok(frame);
        }
        let mut resized = Mat::default();
        imgproc::resize(
            &frame,
            &mut resized,
            Size::new(self.config.max_width, self.config.max_height),
            0.0,
            0.0,
            InterpolationFlags::INTER_LINEAR as i32,
        )?;
        Ok(resized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landmarks::{HandLandmarks, NormalizedLandmark};
    use crate::{Error, ErrorKind};
    use opencv::core::{Vec3b, CV_8UC3};

    struct FixedDetector {
        hands: Vec<HandLandmarks>,
        seen_size: Option<(i32, i32)>,
    }

    impl HandDetector for FixedDetector {
        fn detect(&mut self, rgb_frame: &Mat) -> Result<Vec<HandLandmarks>> {
            self.seen_size = Some((rgb_frame.cols(), rgb_frame.rows()));
            Ok(self.hands.clone())
        }
    }

    struct FailingDetector;

    impl HandDetector for FailingDetector {
        fn detect(&mut self, _rgb_frame: &Mat) -> Result<Vec<HandLandmarks>> {
            Err(Error::InvalidInput("tensor shape".to_string()))
        }
    }

    fn black_frame(width: i32, height: i32) -> Mat {
        Mat::zeros(height, width, CV_8UC3).unwrap().to_mat().unwrap()
    }

    fn centered_hand() -> HandLandmarks {
        HandLandmarks::new([NormalizedLandmark::new(0.5, 0.5, 0.0); 21])
    }

    #[test]
    fn test_no_hands() {
        let mut detector = FixedDetector { hands: vec![], seen_size: None };
        let result = FrameProcessor::default().process(black_frame(640, 480), &mut detector).unwrap();
        assert_eq!(result.hand_count, 0);
        assert_eq!(result.total_fingers_up, 0);
        assert_eq!((result.frame.cols(), result.frame.rows()), (640, 480));
    }

    #[test]
    fn test_large_frame_downscaled() {
        let mut detector = FixedDetector { hands: vec![], seen_size: None };
        let result = FrameProcessor::default().process(black_frame(1280, 720), &mut detector).unwrap();
        assert_eq!((result.frame.cols(), result.frame.rows()), (800, 600));
        assert_eq!(detector.seen_size, Some((800, 600)));
    }

    #[test]
    fn test_tall_frame_downscaled() {
        let mut detector = FixedDetector { hands: vec![], seen_size: None };
        let result = FrameProcessor::default().process(black_frame(480, 640), &mut detector).unwrap();
        assert_eq!((result.frame.cols(), result.frame.rows()), (800, 600));
    }

    #[test]
    fn test_skeleton_drawn_on_frame() {
        let mut detector = FixedDetector {
            hands: vec![centered_hand()],
            seen_size: None,
        };
        let result = FrameProcessor::default().process(black_frame(200, 100), &mut detector).unwrap();
        assert_eq!(result.hand_count, 1);
        let pixel = *result.frame.at_2d::<Vec3b>(50, 103).unwrap();
        assert_eq!(pixel.0, [0, 0, 255]);
    }

    #[test]
    fn test_detector_failure_propagates() {
        let err = FrameProcessor::default()
            .process(black_frame(64, 48), &mut FailingDetector)
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DetectorFailure);
    }
}
