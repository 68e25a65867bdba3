//! Joint-angle features and form checks derived from a validated pose.

use serde::{Deserialize, Serialize};

use pushup_core::{angle_between, FeatureSet, Side};

use crate::config::ThresholdConfig;
use crate::validator::{SideLandmarks, ValidatedPose};

/// Body angle assumed when neither knee nor ankle is visible on a side
pub const DEFAULT_BODY_ANGLE: f64 = 180.0;

/// Raw per-frame measurements
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameMeasurements {
    pub features: FeatureSet,
    /// Whether each wrist sits no higher than the tolerance above its own shoulder
    pub hands_under_shoulders: bool,
}

impl FrameMeasurements {
    pub fn from_pose(pose: &ValidatedPose, thresholds: &ThresholdConfig) -> Self {
        let left_elbow = elbow_angle(&pose.left);
        let right_elbow = elbow_angle(&pose.right);

        let body_angle = (body_angle(&pose.left) + body_angle(&pose.right)) / 2.0;

        Self {
            features: FeatureSet {
                elbow_angle: (left_elbow + right_elbow) / 2.0,
                body_angle,
                arm_asymmetry: (left_elbow - right_elbow).abs(),
            },
            hands_under_shoulders: hands_under_shoulders(pose, thresholds.hand_tolerance_px),
        }
    }
}

/// Non-fatal form problems. Reported as feedback, never block counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FormWarning {
    BackNotStraight,
    ArmAsymmetry,
    HandsNotUnderShoulders,
}

impl FormWarning {
    /// First applicable warning, checked in order: back, arms, hands
    pub fn evaluate(
        body_angle: f64,
        arm_asymmetry: f64,
        hands_under_shoulders: bool,
        thresholds: &ThresholdConfig,
    ) -> Option<Self> {
        if body_angle < thresholds.min_body_angle {
            Some(FormWarning::BackNotStraight)
        } else if arm_asymmetry > thresholds.max_arm_asymmetry {
            Some(FormWarning::ArmAsymmetry)
        } else if !hands_under_shoulders {
            Some(FormWarning::HandsNotUnderShoulders)
        } else {
            None
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            FormWarning::BackNotStraight => "Keep your back straight",
            FormWarning::ArmAsymmetry => "Keep both arms even",
            FormWarning::HandsNotUnderShoulders => "Place hands under shoulders",
        }
    }
}

/// Shoulder-elbow-wrist angle
fn elbow_angle(side: &SideLandmarks) -> f64 {
    angle_between(&side.shoulder, &side.elbow, &side.wrist)
}

/// Shoulder-hip-leg angle, preferring the ankle over the knee
fn body_angle(side: &SideLandmarks) -> f64 {
    match side.ankle.or(side.knee) {
        Some(leg) => angle_between(&side.shoulder, &side.hip, &leg),
        None => DEFAULT_BODY_ANGLE,
    }
}

fn hands_under_shoulders(pose: &ValidatedPose, tolerance_px: f64) -> bool {
    [Side::Left, Side::Right].iter().all(|&side| {
        let s = pose.side(side);
        s.wrist.y >= s.shoulder.y - tolerance_px
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushup_core::Position2D;

    fn side(
        elbow: (f64, f64),
        wrist: (f64, f64),
        knee: Option<(f64, f64)>,
        ankle: Option<(f64, f64)>,
    ) -> SideLandmarks {
        SideLandmarks {
            shoulder: Position2D::new(100.0, 100.0),
            elbow: Position2D::new(elbow.0, elbow.1),
            wrist: Position2D::new(wrist.0, wrist.1),
            hip: Position2D::new(300.0, 100.0),
            knee: knee.map(|(x, y)| Position2D::new(x, y)),
            ankle: ankle.map(|(x, y)| Position2D::new(x, y)),
        }
    }

    #[test]
    fn test_straight_arms_and_body() {
        let s = side((100.0, 150.0), (100.0, 200.0), None, Some((500.0, 100.0)));
        let pose = ValidatedPose { left: s, right: s };
        let m = FrameMeasurements::from_pose(&pose, &ThresholdConfig::default());

        assert!((m.features.elbow_angle - 180.0).abs() < 1e-9);
        assert!((m.features.body_angle - 180.0).abs() < 1e-9);
        assert!(m.features.arm_asymmetry.abs() < 1e-9);
        assert!(m.hands_under_shoulders);
    }

    #[test]
    fn test_elbow_average_and_asymmetry() {
        // Left arm straight (180), right arm bent at 90
        let left = side((100.0, 150.0), (100.0, 200.0), None, None);
        let right = side((100.0, 150.0), (150.0, 150.0), None, None);
        let pose = ValidatedPose { left, right };
        let m = FrameMeasurements::from_pose(&pose, &ThresholdConfig::default());

        assert!((m.features.elbow_angle - 135.0).abs() < 1e-9);
        assert!((m.features.arm_asymmetry - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_body_angle_fallbacks() {
        // Sagging hips: knee below the shoulder-hip line
        let with_knee = side((100.0, 150.0), (100.0, 200.0), Some((400.0, 200.0)), None);
        assert!((body_angle(&with_knee) - 135.0).abs() < 1e-9);

        // Ankle wins over knee
        let with_both = side(
            (100.0, 150.0),
            (100.0, 200.0),
            Some((400.0, 200.0)),
            Some((500.0, 100.0)),
        );
        assert!((body_angle(&with_both) - 180.0).abs() < 1e-9);

        let legless = side((100.0, 150.0), (100.0, 200.0), None, None);
        assert_eq!(body_angle(&legless), DEFAULT_BODY_ANGLE);
    }

    #[test]
    fn test_hands_above_shoulder_line() {
        let ok = side((100.0, 150.0), (100.0, 200.0), None, None);
        let raised = side((100.0, 50.0), (100.0, -10.0), None, None);
        let pose = ValidatedPose { left: ok, right: raised };
        assert!(!hands_under_shoulders(&pose, 100.0));
        assert!(hands_under_shoulders(&pose, 120.0));
    }

    #[test]
    fn test_hands_checked_against_own_shoulder() {
        // Camera tilt: right shoulder sits much lower in the frame
        let left = side((100.0, 150.0), (100.0, 200.0), None, None);
        let mut right = side((100.0, 350.0), (100.0, 150.0), None, None);
        right.shoulder = Position2D::new(100.0, 300.0);

        // 150 px above its own shoulder, but below the mean shoulder height
        let pose = ValidatedPose { left, right };
        assert!(!hands_under_shoulders(&pose, 100.0));
        assert!(hands_under_shoulders(&pose, 150.0));
    }

    #[test]
    fn test_warning_priority() {
        let t = ThresholdConfig::default();
        assert_eq!(
            FormWarning::evaluate(120.0, 60.0, false, &t),
            Some(FormWarning::BackNotStraight)
        );
        assert_eq!(
            FormWarning::evaluate(170.0, 60.0, false, &t),
            Some(FormWarning::ArmAsymmetry)
        );
        assert_eq!(
            FormWarning::evaluate(170.0, 45.0, false, &t),
            Some(FormWarning::HandsNotUnderShoulders)
        );
        assert_eq!(FormWarning::evaluate(135.0, 45.0, true, &t), None);
    }
}
