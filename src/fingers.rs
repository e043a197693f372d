//! Extended-finger classification from pixel-space joints.
//!
//! Each finger is judged on its own by comparing its tip with one reference
//! joint. The four fingers compare `y` (a tip higher on screen than the PIP
//! joint counts as extended), the thumb compares `x` against its IP joint.
//!
//! # Limitations
//!
//! The thumb rule assumes one canonical orientation: a right hand seen palm-on
//! by an unmirrored, upright camera. Left hands, mirrored previews and
//! inverted hands are not corrected for, so the thumb may be miscounted there.

use crate::constants::NUM_FINGERS;
use crate::landmarks::{index, PixelJoints};

/// The five fingers, thumb first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Self; NUM_FINGERS] = [Self::Thumb, Self::Index, Self::Middle, Self::Ring, Self::Pinky];

    /// Landmark index of the fingertip
    #[must_use]
    pub const fn tip(self) -> usize {
        match self {
            Self::Thumb => index::THUMB_TIP,
            Self::Index => index::INDEX_TIP,
            Self::Middle => index::MIDDLE_TIP,
            Self::Ring => index::RING_TIP,
            Self::Pinky => index::PINKY_TIP,
        }
    }

    /// Landmark index the tip is compared against
    #[must_use]
    pub const fn reference(self) -> usize {
        match self {
            Self::Thumb => self.tip() - 1,
            _ => self.tip() - 2,
        }
    }

    /// Whether this finger counts as extended
    #[must_use]
    pub fn is_extended(self, joints: &PixelJoints) -> bool {
        let tip = joints[self.tip()];
        let reference = joints[self.reference()];
        match self {
            Self::Thumb => tip.x < reference.x,
            _ => tip.y < reference.y,
        }
    }
}

/// Extended flag for every finger, thumb first.
#[must_use]
pub fn finger_states(joints: &PixelJoints) -> [bool; NUM_FINGERS] {
    Finger::ALL.map(|finger| finger.is_extended(joints))
}

/// Number of extended fingers on one hand, in `0..=5`.
#[must_use]
pub fn count_extended(joints: &PixelJoints) -> usize {
    finger_states(joints).iter().filter(|&&up| up).count()
}
