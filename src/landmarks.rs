//! Hand landmark types and the mapping from normalized detector output to pixel space.
//!
//! The detector reports 21 landmarks per hand in a fixed anatomical order
//! (0 = wrist, 4/8/12/16/20 = thumb..pinky tips). The order is part of the
//! detector's contract and is relied on by the renderer and the classifier.

use crate::constants::NUM_HAND_LANDMARKS;
use crate::{Error, Result};
use opencv::core::Point;

/// Landmark indices in detector order
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// A landmark in normalized image coordinates.
///
/// `x` and `y` are relative to frame width and height, nominally in [0, 1].
/// `z` is relative depth and is not used for drawing or counting.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl NormalizedLandmark {
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// The 21 landmarks of one detected hand.
#[derive(Debug, Clone, PartialEq)]
pub struct HandLandmarks {
    points: [NormalizedLandmark; NUM_HAND_LANDMARKS],
}

impl HandLandmarks {
    #[must_use]
    pub const fn new(points: [NormalizedLandmark; NUM_HAND_LANDMARKS]) -> Self {
        Self { points }
    }

    /// Build from a slice, as produced by a detector backend.
    ///
    /// # Errors
    ///
    /// Returns an error if the slice does not hold exactly 21 landmarks
    pub fn from_slice(points: &[NormalizedLandmark]) -> Result<Self> {
        let points: [NormalizedLandmark; NUM_HAND_LANDMARKS] = points.try_into().map_err(|_| {
            Error::InvalidInput(format!(
                "Expected {NUM_HAND_LANDMARKS} hand landmarks, got {}",
                points.len()
            ))
        })?;
        Ok(Self { points })
    }

    /// Build from `(x, y)` pairs with zero depth.
    ///
    /// # Errors
    ///
    /// Returns an error if there are not exactly 21 pairs
    pub fn from_xy(points: &[(f32, f32)]) -> Result<Self> {
        let landmarks: Vec<NormalizedLandmark> = points
            .iter()
            .map(|&(x, y)| NormalizedLandmark::new(x, y, 0.0))
            .collect();
        Self::from_slice(&landmarks)
    }

    #[must_use]
    pub fn points(&self) -> &[NormalizedLandmark; NUM_HAND_LANDMARKS] {
        &self.points
    }
}

/// A joint position on the integer pixel grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PixelJoint {
    pub x: i32,
    pub y: i32,
}

impl PixelJoint {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Shift by a constant offset.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

impl From<PixelJoint> for Point {
    fn from(joint: PixelJoint) -> Self {
        Point::new(joint.x, joint.y)
    }
}

/// Pixel positions of all 21 joints of one hand in one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelJoints([PixelJoint; NUM_HAND_LANDMARKS]);

impl PixelJoints {
    #[must_use]
    pub const fn new(joints: [PixelJoint; NUM_HAND_LANDMARKS]) -> Self {
        Self(joints)
    }

    #[must_use]
    pub fn as_slice(&self) -> &[PixelJoint] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PixelJoint> {
        self.0.iter()
    }

    /// Translate every joint by the same offset.
    #[must_use]
    pub fn translated(&self, dx: i32, dy: i32) -> Self {
        Self(self.0.map(|j| j.offset(dx, dy)))
    }
}

impl std::ops::Index<usize> for PixelJoints {
    type Output = PixelJoint;

    fn index(&self, idx: usize) -> &PixelJoint {
        &self.0[idx]
    }
}

/// Scale normalized landmarks to pixel coordinates for a `width` x `height` frame.
///
/// Coordinates are truncated toward zero and never clamped, so landmarks
/// outside [0, 1] produce joints outside the frame.
#[must_use]
#[allow(clippy::cast_possible_truncation)] // truncation onto the pixel grid is the intent
pub fn to_pixel_joints(hand: &HandLandmarks, width: i32, height: i32) -> PixelJoints {
    let (w, h) = (f64::from(width), f64::from(height));
    PixelJoints(
        hand.points
            .map(|lm| PixelJoint::new((f64::from(lm.x) * w) as i32, (f64::from(lm.y) * h) as i32)),
    )
}
