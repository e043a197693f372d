//! Constants used throughout the application

/// Number of landmarks the hand detector reports per hand
pub const NUM_HAND_LANDMARKS: usize = 21;

/// Number of fingers classified per hand
pub const NUM_FINGERS: usize = 5;

/// Frames wider or taller than this are downscaled before detection
pub const MAX_FRAME_WIDTH: i32 = 800;
pub const MAX_FRAME_HEIGHT: i32 = 600;

/// Joint marker radius in pixels
pub const JOINT_RADIUS: i32 = 5;

/// Bone line thickness in pixels
pub const BONE_THICKNESS: i32 = 2;

/// Default maximum number of hands reported per frame
pub const DEFAULT_MAX_HANDS: usize = 2;

/// Default minimum detection confidence
pub const DEFAULT_MIN_DETECTION_CONFIDENCE: f32 = 0.5;

/// Frame rate used for output files when the source does not report one
pub const DEFAULT_FPS: f64 = 30.0;

/// Default output codec
pub const DEFAULT_FOURCC: &str = "mp4v";

/// Consecutive failed reads tolerated before a run is abandoned
pub const DEFAULT_MAX_CONSECUTIVE_READ_FAILURES: u32 = 300;

/// Progress ceilings while the run is still in flight
pub const PROGRESS_CAP_KNOWN_TOTAL: f32 = 99.0;
pub const PROGRESS_CAP_UNKNOWN_TOTAL: f32 = 90.0;

/// Seconds of video after which the open-ended estimate reaches ~63% of its cap
pub const PROGRESS_TIME_CONSTANT_SECS: f64 = 10.0;

/// Hand landmark network input normalisation
pub const PIXEL_SCALE: f64 = 1.0 / 255.0;
