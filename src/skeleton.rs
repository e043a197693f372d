//! Hand skeleton overlay: joint markers and bone lines.

use crate::constants::{BONE_THICKNESS, JOINT_RADIUS};
use crate::landmarks::{PixelJoint, PixelJoints};
use crate::Result;
use opencv::core::{Mat, Scalar};
use opencv::imgproc::{self, FILLED, LINE_8};

/// Colour in OpenCV channel order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bgr(pub u8, pub u8, pub u8);

impl Bgr {
    pub const RED: Self = Self(0, 0, 255);
    pub const GREEN: Self = Self(0, 255, 0);

    #[must_use]
    pub fn to_scalar(self) -> Scalar {
        Scalar::new(f64::from(self.0), f64::from(self.1), f64::from(self.2), 0.0)
    }
}

/// Joint marker colour
pub const JOINT_COLOR: Bgr = Bgr::RED;

/// Bone line colour
pub const BONE_COLOR: Bgr = Bgr::GREEN;

/// Bone connections between landmark indices.
///
/// Thumb chain from the wrist, index..pinky chains from their base knuckle,
/// then the four palm spokes from the wrist to each base knuckle.
pub const HAND_CONNECTIONS: [(usize, usize); 20] = [
    // thumb
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 4),
    // index
    (5, 6),
    (6, 7),
    (7, 8),
    // middle
    (9, 10),
    (10, 11),
    (11, 12),
    // ring
    (13, 14),
    (14, 15),
    (15, 16),
    // pinky
    (17, 18),
    (18, 19),
    (19, 20),
    // palm
    (0, 5),
    (0, 9),
    (0, 13),
    (0, 17),
];

/// Drawing surface for the skeleton overlay.
pub trait SkeletonCanvas {
    /// Draw a filled circle
    fn filled_circle(&mut self, center: PixelJoint, radius: i32, color: Bgr) -> Result<()>;

    /// Draw a straight line segment
    fn line(&mut self, from: PixelJoint, to: PixelJoint, color: Bgr, thickness: i32) -> Result<()>;
}

impl SkeletonCanvas for Mat {
    fn filled_circle(&mut self, center: PixelJoint, radius: i32, color: Bgr) -> Result<()> {
        imgproc::circle(self, center.into(), radius, color.to_scalar(), FILLED, LINE_8, 0)?;
        Ok(())
    }

    fn line(&mut self, from: PixelJoint, to: PixelJoint, color: Bgr, thickness: i32) -> Result<()> {
        imgproc::line(self, from.into(), to.into(), color.to_scalar(), thickness, LINE_8, 0)?;
        Ok(())
    }
}

/// Paint one hand's joints and bones onto `canvas`.
///
/// Always issues 21 circles followed by 20 lines; OpenCV clips anything
/// outside the frame.
///
/// # Errors
///
/// Returns an error if the underlying drawing call fails
pub fn draw_skeleton<C: SkeletonCanvas + ?Sized>(canvas: &mut C, joints: &PixelJoints) -> Result<()> {
    for joint in joints.iter() {
        canvas.filled_circle(*joint, JOINT_RADIUS, JOINT_COLOR)?;
    }
    for &(start, end) in &HAND_CONNECTIONS {
        canvas.line(joints[start], joints[end], BONE_COLOR, BONE_THICKNESS)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::NUM_HAND_LANDMARKS;
    use opencv::core::{Vec3b, CV_8UC3};
    use opencv::prelude::*;

    #[derive(Default)]
    struct RecordingCanvas {
        circles: Vec<(PixelJoint, i32, Bgr)>,
        lines: Vec<(PixelJoint, PixelJoint, Bgr, i32)>,
    }

    impl SkeletonCanvas for RecordingCanvas {
        fn filled_circle(&mut self, center: PixelJoint, radius: i32, color: Bgr) -> Result<()> {
            self.circles.push((center, radius, color));
            Ok(())
        }

        fn line(&mut self, from: PixelJoint, to: PixelJoint, color: Bgr, thickness: i32) -> Result<()> {
            self.lines.push((from, to, color, thickness));
            Ok(())
        }
    }

    fn numbered_joints() -> PixelJoints {
        let mut joints = [PixelJoint::default(); NUM_HAND_LANDMARKS];
        for (i, joint) in joints.iter_mut().enumerate() {
            *joint = PixelJoint::new(i as i32 * 10, i as i32);
        }
        PixelJoints::new(joints)
    }

    #[test]
    fn test_connection_table() {
        assert_eq!(HAND_CONNECTIONS.len(), 20);
        assert!(HAND_CONNECTIONS
            .iter()
            .all(|&(a, b)| a < NUM_HAND_LANDMARKS && b < NUM_HAND_LANDMARKS));
        for knuckle in [5, 9, 13, 17] {
            assert!(HAND_CONNECTIONS.contains(&(0, knuckle)));
        }
    }

    #[test]
    fn test_draws_21_circles_and_20_lines() {
        let mut canvas = RecordingCanvas::default();
        let joints = numbered_joints();
        draw_skeleton(&mut canvas, &joints).unwrap();

        assert_eq!(canvas.circles.len(), 21);
        assert_eq!(canvas.lines.len(), 20);
        assert!(canvas.circles.iter().all(|&(_, r, c)| r == 5 && c == Bgr::RED));
        assert!(canvas.lines.iter().all(|&(_, _, c, t)| t == 2 && c == Bgr::GREEN));

        // Bone endpoints are looked up by index
        let (from, to, _, _) = canvas.lines[16];
        assert_eq!((from, to), (joints[0], joints[5]));
    }

    #[test]
    fn test_out_of_frame_joints_still_drawn() {
        let mut canvas = RecordingCanvas::default();
        let joints = numbered_joints().translated(-10_000, 50_000);
        draw_skeleton(&mut canvas, &joints).unwrap();
        assert_eq!(canvas.circles.len(), 21);
        assert_eq!(canvas.lines.len(), 20);
    }

    #[test]
    fn test_draw_on_mat() {
        let mut frame = Mat::zeros(100, 100, CV_8UC3).unwrap().to_mat().unwrap();
        let joints = PixelJoints::new([PixelJoint::new(50, 50); NUM_HAND_LANDMARKS]);
        draw_skeleton(&mut frame, &joints).unwrap();

        // Joint marker covers its radius, bones are painted on top of it
        let rim = *frame.at_2d::<Vec3b>(50, 54).unwrap();
        assert_eq!(rim.0, [0, 0, 255]);
        let center = *frame.at_2d::<Vec3b>(50, 50).unwrap();
        assert_ne!(center.0, [0, 0, 0]);
        // Far corner untouched
        let corner = *frame.at_2d::<Vec3b>(0, 0).unwrap();
        assert_eq!(corner.0, [0, 0, 0]);
    }

    #[test]
    fn test_draw_on_mat_off_frame() {
        let mut frame = Mat::zeros(40, 40, CV_8UC3).unwrap().to_mat().unwrap();
        let joints = PixelJoints::new([PixelJoint::new(-500, 900); NUM_HAND_LANDMARKS]);
        assert!(draw_skeleton(&mut frame, &joints).is_ok());
    }
}
