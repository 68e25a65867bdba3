//! Per-frame landmark gating.
//!
//! Push-up form needs the upper body and the hip line on every frame, while
//! legs are frequently cropped out of frame. Mandatory joints therefore reject
//! the frame when missing; knees and ankles are kept only when visible. A
//! joint counts as visible only with enough confidence and a finite position.
//!
//! The validator is the only place that checks joint presence. A
//! [`ValidatedPose`] always carries every mandatory joint.

use serde::{Deserialize, Serialize};

use pushup_core::{FramePose, Joint, Position2D, Side};

/// Why a frame could not be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectionReason {
    /// A shoulder, elbow or wrist is missing or low-confidence
    UpperBodyNotVisible,
    /// A hip is missing or low-confidence
    HipsNotVisible,
}

impl RejectionReason {
    pub fn description(&self) -> &'static str {
        match self {
            RejectionReason::UpperBodyNotVisible => "Upper body not visible",
            RejectionReason::HipsNotVisible => "Hips not visible",
        }
    }
}

impl std::fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.description())
    }
}

/// Landmarks of one body side that passed validation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SideLandmarks {
    pub shoulder: Position2D,
    pub elbow: Position2D,
    pub wrist: Position2D,
    pub hip: Position2D,
    pub knee: Option<Position2D>,
    pub ankle: Option<Position2D>,
}

/// Frame whose mandatory joints are all present and confident
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidatedPose {
    pub left: SideLandmarks,
    pub right: SideLandmarks,
}

impl ValidatedPose {
    pub fn side(&self, side: Side) -> &SideLandmarks {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    /// Number of optional joints that made it through validation
    pub fn optional_joint_count(&self) -> usize {
        [self.left, self.right]
            .iter()
            .map(|s| s.knee.is_some() as usize + s.ankle.is_some() as usize)
            .sum()
    }
}

/// Result of validating one frame
#[derive(Debug, Clone, PartialEq)]
pub enum Validation {
    Accepted(ValidatedPose),
    Rejected(RejectionReason),
}

impl Validation {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Validation::Accepted(_))
    }
}

/// Two-tier landmark validator
#[derive(Debug, Clone)]
pub struct LandmarkValidator {
    min_confidence: f32,
}

impl LandmarkValidator {
    pub const DEFAULT_MIN_CONFIDENCE: f32 = 0.5;

    const UPPER_BODY: [Joint; 6] = [
        Joint::LeftShoulder,
        Joint::RightShoulder,
        Joint::LeftElbow,
        Joint::RightElbow,
        Joint::LeftWrist,
        Joint::RightWrist,
    ];

    const HIPS: [Joint; 2] = [Joint::LeftHip, Joint::RightHip];

    pub fn new(min_confidence: f32) -> Self {
        Self { min_confidence }
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn validate(&self, pose: &FramePose) -> Validation {
        if let Some(joint) = self.first_missing(pose, &Self::UPPER_BODY) {
            tracing::trace!(?joint, "mandatory upper-body joint not visible");
            return Validation::Rejected(RejectionReason::UpperBodyNotVisible);
        }
        if let Some(joint) = self.first_missing(pose, &Self::HIPS) {
            tracing::trace!(?joint, "mandatory hip joint not visible");
            return Validation::Rejected(RejectionReason::HipsNotVisible);
        }

        match (self.side(pose, Side::Left), self.side(pose, Side::Right)) {
            (Some(left), Some(right)) => Validation::Accepted(ValidatedPose { left, right }),
            // Unreachable after the presence checks above
            _ => Validation::Rejected(RejectionReason::UpperBodyNotVisible),
        }
    }

    fn visible(&self, pose: &FramePose, joint: Joint) -> Option<Position2D> {
        pose.get(joint)
            .filter(|lm| lm.confidence >= self.min_confidence)
            .filter(|lm| lm.position.x.is_finite() && lm.position.y.is_finite())
            .map(|lm| lm.position)
    }

    fn first_missing(&self, pose: &FramePose, joints: &[Joint]) -> Option<Joint> {
        joints
            .iter()
            .copied()
            .find(|&joint| self.visible(pose, joint).is_none())
    }

    fn side(&self, pose: &FramePose, side: Side) -> Option<SideLandmarks> {
        let joints = match side {
            Side::Left => [
                Joint::LeftShoulder,
                Joint::LeftElbow,
                Joint::LeftWrist,
                Joint::LeftHip,
                Joint::LeftKnee,
                Joint::LeftAnkle,
            ],
            Side::Right => [
                Joint::RightShoulder,
                Joint::RightElbow,
                Joint::RightWrist,
                Joint::RightHip,
                Joint::RightKnee,
                Joint::RightAnkle,
            ],
        };

        Some(SideLandmarks {
            shoulder: self.visible(pose, joints[0])?,
            elbow: self.visible(pose, joints[1])?,
            wrist: self.visible(pose, joints[2])?,
            hip: self.visible(pose, joints[3])?,
            knee: self.visible(pose, joints[4]),
            ankle: self.visible(pose, joints[5]),
        })
    }
}

impl Default for LandmarkValidator {
    fn default() -> Self {
        Self::new(Self::DEFAULT_MIN_CONFIDENCE)
    }
}
