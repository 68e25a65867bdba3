//! Fundamental types for push-up repetition counting.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a workout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// Monotonic timestamp with nanosecond precision.
///
/// The epoch is arbitrary (typically session start); only differences are
/// meaningful.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis.saturating_mul(1_000_000))
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_millis(&self) -> i64 {
        self.0 / 1_000_000
    }

    /// Milliseconds elapsed since `earlier` (negative if `earlier` is later)
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        self.0.saturating_sub(earlier.0) / 1_000_000
    }
}

/// Body side of a paired joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

/// Tracked skeletal joints.
///
/// Upper body and hips are required for push-up analysis; knees and ankles
/// are optional and only refine the body-alignment angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Joint {
    LeftShoulder = 0,
    RightShoulder = 1,
    LeftElbow = 2,
    RightElbow = 3,
    LeftWrist = 4,
    RightWrist = 5,
    LeftHip = 6,
    RightHip = 7,
    LeftKnee = 8,
    RightKnee = 9,
    LeftAnkle = 10,
    RightAnkle = 11,
}

impl Joint {
    pub const COUNT: usize = 12;

    pub const ALL: [Joint; Joint::COUNT] = [
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
        Joint::LeftHip,
        Joint::RightHip,
        Joint::LeftKnee,
        Joint::RightKnee,
        Joint::LeftAnkle,
        Joint::RightAnkle,
    ];

    pub fn from_index(idx: u8) -> Option<Self> {
        Self::ALL.get(idx as usize).copied()
    }

    pub fn index(&self) -> usize {
        *self as usize
    }

    /// Whether the joint must be visible for a frame to be usable
    pub fn is_mandatory(&self) -> bool {
        !matches!(
            self,
            Joint::LeftKnee | Joint::RightKnee | Joint::LeftAnkle | Joint::RightAnkle
        )
    }
}

/// 2D position in frame-pixel space (y grows downward)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position2D {
    pub x: f64,
    pub y: f64,
}

impl Position2D {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_nalgebra(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// Joint detection with confidence score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub joint: Joint,
    pub position: Position2D,
    pub confidence: f32,
}

impl Landmark {
    pub fn new(joint: Joint, position: Position2D, confidence: f32) -> Self {
        Self {
            joint,
            position,
            confidence,
        }
    }
}

/// All landmarks detected in one frame. Any subset of joints may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FramePose {
    landmarks: [Option<Landmark>; Joint::COUNT],
}

impl FramePose {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a landmark, replacing any previous detection for the same joint
    pub fn insert(&mut self, landmark: Landmark) {
        self.landmarks[landmark.joint.index()] = Some(landmark);
    }

    /// Builder-style insert
    pub fn with(mut self, joint: Joint, x: f64, y: f64, confidence: f32) -> Self {
        self.insert(Landmark::new(joint, Position2D::new(x, y), confidence));
        self
    }

    pub fn remove(&mut self, joint: Joint) -> Option<Landmark> {
        self.landmarks[joint.index()].take()
    }

    pub fn get(&self, joint: Joint) -> Option<&Landmark> {
        self.landmarks[joint.index()].as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Landmark> {
        self.landmarks.iter().flatten()
    }

    pub fn present_joints(&self) -> Vec<Joint> {
        self.iter().map(|lm| lm.joint).collect()
    }

    pub fn len(&self) -> usize {
        self.landmarks.iter().filter(|lm| lm.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl FromIterator<Landmark> for FramePose {
    fn from_iter<I: IntoIterator<Item = Landmark>>(iter: I) -> Self {
        let mut pose = FramePose::new();
        for landmark in iter {
            pose.insert(landmark);
        }
        pose
    }
}

/// Motion phase of the repetition state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Phase {
    #[default]
    NotInPosition,
    Up,
    GoingDown,
    Down,
    GoingUp,
}

/// Display severity of a feedback message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FeedbackSeverity {
    #[default]
    Neutral,
    Info,
    Success,
    Warning,
    Danger,
}

/// Feedback message shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub text: String,
    pub severity: FeedbackSeverity,
}

impl Feedback {
    pub fn new(text: impl Into<String>, severity: FeedbackSeverity) -> Self {
        Self {
            text: text.into(),
            severity,
        }
    }

    pub fn neutral(text: impl Into<String>) -> Self {
        Self::new(text, FeedbackSeverity::Neutral)
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(text, FeedbackSeverity::Info)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(text, FeedbackSeverity::Success)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(text, FeedbackSeverity::Warning)
    }

    pub fn danger(text: impl Into<String>) -> Self {
        Self::new(text, FeedbackSeverity::Danger)
    }
}

/// Per-frame derived angles, all in degrees within [0, 180]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureSet {
    /// Mean of left and right elbow angles
    pub elbow_angle: f64,
    /// Mean shoulder-hip-leg alignment angle (180 = straight)
    pub body_angle: f64,
    /// Absolute difference between left and right elbow angles
    pub arm_asymmetry: f64,
}
