//! Per-session repetition pipeline.
//!
//! Integrates landmark validation, angle extraction, smoothing, trend
//! tracking and the repetition state machine into a single per-frame tick.

use serde::{Deserialize, Serialize};

use pushup_core::{FeatureSet, FeedbackSeverity, FramePose, Phase, Result, Timestamp};

use crate::config::EngineConfig;
use crate::features::{FormWarning, FrameMeasurements};
use crate::filtering::{Smoother, TrendTracker};
use crate::state_machine::{RepEvent, RepStateMachine, TickInput};
use crate::validator::{LandmarkValidator, RejectionReason, Validation};

/// Read-only view of the engine for the presentation layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub rep_count: u32,
    pub phase: Phase,
    pub feedback_text: String,
    pub feedback_severity: FeedbackSeverity,
    /// Smoothed mean elbow angle
    pub elbow_angle_deg: f64,
    /// Smoothed body alignment angle
    pub body_angle_deg: f64,
    pub arm_asymmetry_deg: f64,
    /// Newest minus oldest smoothed elbow angle in the trend history
    pub elbow_trend_deg: Option<f64>,
    /// Spread of smoothed elbow angles in the trend history
    pub elbow_range_deg: Option<f64>,
}

impl EngineSnapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Everything one tick produced
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub snapshot: EngineSnapshot,
    /// Set when this frame completed a counted repetition
    pub rep: Option<RepEvent>,
    /// Set when the frame failed landmark validation
    pub rejection: Option<RejectionReason>,
}

/// The complete per-session pipeline
#[derive(Debug, Clone)]
pub struct RepEngine {
    config: EngineConfig,
    validator: LandmarkValidator,
    elbow_smoother: Smoother,
    body_smoother: Smoother,
    elbow_trend: TrendTracker,
    machine: RepStateMachine,
    /// Angles from the last accepted frame (elbow and body smoothed)
    features: FeatureSet,
}

impl RepEngine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            validator: LandmarkValidator::new(config.validation.min_confidence),
            elbow_smoother: Smoother::new(config.smoothing.window_size)?,
            body_smoother: Smoother::new(config.smoothing.window_size)?,
            elbow_trend: TrendTracker::new(config.smoothing.trend_history)?,
            machine: RepStateMachine::new(&config),
            features: FeatureSet {
                elbow_angle: 0.0,
                body_angle: 0.0,
                arm_asymmetry: 0.0,
            },
            config,
        })
    }

    /// Process one frame
    pub fn tick(&mut self, frame: &FramePose, now: Timestamp) -> TickReport {
        let pose = match self.validator.validate(frame) {
            Validation::Accepted(pose) => pose,
            Validation::Rejected(reason) => {
                self.machine.reject(reason);
                return TickReport {
                    snapshot: self.snapshot(),
                    rep: None,
                    rejection: Some(reason),
                };
            }
        };

        let raw = FrameMeasurements::from_pose(&pose, &self.config.thresholds);
        let elbow_angle = self.elbow_smoother.add(raw.features.elbow_angle);
        let body_angle = self.body_smoother.add(raw.features.body_angle);
        self.elbow_trend.add(elbow_angle);

        let warning = FormWarning::evaluate(
            body_angle,
            raw.features.arm_asymmetry,
            raw.hands_under_shoulders,
            &self.config.thresholds,
        );

        let input = TickInput {
            elbow_angle,
            body_angle,
            arm_asymmetry: raw.features.arm_asymmetry,
            warning: warning.map(|w| w.message().to_string()),
        };
        let step = self.machine.step(&input, now);

        self.features = FeatureSet {
            elbow_angle,
            body_angle,
            arm_asymmetry: raw.features.arm_asymmetry,
        };

        TickReport {
            snapshot: self.snapshot(),
            rep: step.rep,
            rejection: None,
        }
    }

    /// Current view without ingesting a frame
    pub fn snapshot(&self) -> EngineSnapshot {
        let feedback = self.machine.feedback();
        EngineSnapshot {
            rep_count: self.machine.rep_count(),
            phase: self.machine.phase(),
            feedback_text: feedback.text.clone(),
            feedback_severity: feedback.severity,
            elbow_angle_deg: self.features.elbow_angle,
            body_angle_deg: self.features.body_angle,
            arm_asymmetry_deg: self.features.arm_asymmetry,
            elbow_trend_deg: self.elbow_trend.trend(),
            elbow_range_deg: self.elbow_trend.range(),
        }
    }

    /// Restore the initial state, clearing smoothing history and the count
    pub fn reset(&mut self) {
        self.elbow_smoother.reset();
        self.body_smoother.reset();
        self.elbow_trend.reset();
        self.machine.reset();
        self.features = FeatureSet {
            elbow_angle: 0.0,
            body_angle: 0.0,
            arm_asymmetry: 0.0,
        };
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn state_machine(&self) -> &RepStateMachine {
        &self.machine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pushup_core::Joint;

    const FRAME_MS: i64 = 30;

    /// Side-view push-up pose with both elbows bent to `elbow_deg`
    fn pose_with_elbow(elbow_deg: f64) -> FramePose {
        let mut pose = FramePose::new();
        for (offset, sh, el, wr, hip, knee, ankle) in [
            (
                0.0,
                Joint::LeftShoulder,
                Joint::LeftElbow,
                Joint::LeftWrist,
                Joint::LeftHip,
                Joint::LeftKnee,
                Joint::LeftAnkle,
            ),
            (
                20.0,
                Joint::RightShoulder,
                Joint::RightElbow,
                Joint::RightWrist,
                Joint::RightHip,
                Joint::RightKnee,
                Joint::RightAnkle,
            ),
        ] {
            let (sx, sy) = (200.0 + offset, 200.0);
            let (ex, ey) = (sx, sy + 60.0);
            // Ray to the shoulder points straight up (-90 degrees)
            let heading = (-90.0 + elbow_deg).to_radians();
            let (wx, wy) = (ex + 60.0 * heading.cos(), ey + 60.0 * heading.sin());

            pose = pose
                .with(sh, sx, sy, 0.9)
                .with(el, ex, ey, 0.9)
                .with(wr, wx, wy, 0.9)
                .with(hip, sx + 200.0, sy, 0.9)
                .with(knee, sx + 300.0, sy, 0.9)
                .with(ankle, sx + 400.0, sy, 0.9);
        }
        pose
    }

    struct Driver {
        engine: RepEngine,
        now_ms: i64,
    }

    impl Driver {
        fn new() -> Self {
            Self {
                engine: RepEngine::new(EngineConfig::default()).unwrap(),
                now_ms: 0,
            }
        }

        fn feed(&mut self, pose: &FramePose, frames: usize) -> TickReport {
            let mut last = None;
            for _ in 0..frames {
                last = Some(self.engine.tick(pose, Timestamp::from_millis(self.now_ms)));
                self.now_ms += FRAME_MS;
            }
            last.unwrap()
        }
    }

    #[test]
    fn test_invalid_config_fails_fast() {
        let mut config = EngineConfig::default();
        config.smoothing.window_size = 0;
        assert!(RepEngine::new(config).is_err());
    }

    #[test]
    fn test_pose_fixture_angles() {
        let mut engine = RepEngine::new(EngineConfig::default()).unwrap();
        let report = engine.tick(&pose_with_elbow(110.0), Timestamp::from_millis(0));
        let snap = report.snapshot;
        assert!((snap.elbow_angle_deg - 110.0).abs() < 1e-6);
        assert!((snap.body_angle_deg - 180.0).abs() < 1e-6);
        assert!(snap.arm_asymmetry_deg.abs() < 1e-6);
        assert!(report.rejection.is_none());
    }

    #[test]
    fn test_smoothed_cycle_counts_once() {
        let mut d = Driver::new();
        let up = pose_with_elbow(170.0);
        let down = pose_with_elbow(110.0);

        let report = d.feed(&up, 8);
        assert_eq!(report.snapshot.phase, Phase::Up);

        let report = d.feed(&down, 8);
        assert_eq!(report.snapshot.phase, Phase::Down);
        assert_eq!(report.snapshot.rep_count, 0);

        // Completion lands on the 7th extended frame once smoothing catches up
        let report = d.feed(&up, 6);
        assert_eq!(report.snapshot.phase, Phase::GoingUp);
        let report = d.feed(&up, 1);
        assert_eq!(report.snapshot.phase, Phase::Up);
        assert_eq!(report.snapshot.rep_count, 1);
        assert_eq!(report.rep.map(|r| r.rep_number), Some(1));
        assert_eq!(report.snapshot.feedback_severity, FeedbackSeverity::Success);
    }

    #[test]
    fn test_rejection_forces_not_in_position() {
        let mut d = Driver::new();
        d.feed(&pose_with_elbow(170.0), 8);
        d.feed(&pose_with_elbow(110.0), 8);
        assert_eq!(d.engine.state_machine().phase(), Phase::Down);

        let mut occluded = pose_with_elbow(110.0);
        occluded.remove(Joint::LeftWrist);
        let report = d.feed(&occluded, 1);

        assert_eq!(report.rejection, Some(RejectionReason::UpperBodyNotVisible));
        assert_eq!(report.snapshot.phase, Phase::NotInPosition);
        assert_eq!(report.snapshot.feedback_text, "Upper body not visible");
        assert_eq!(report.snapshot.feedback_severity, FeedbackSeverity::Danger);
        assert_eq!(d.engine.state_machine().frames_flexed(), 0);
        assert_eq!(d.engine.state_machine().frames_extended(), 0);
        assert!(!d.engine.state_machine().reached_bottom());
        // Last accepted angles are still reported
        assert!((report.snapshot.elbow_angle_deg - 110.0).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_landmark_never_reaches_smoothing() {
        let mut d = Driver::new();
        d.feed(&pose_with_elbow(170.0), 8);

        let corrupt = pose_with_elbow(170.0).with(Joint::LeftWrist, f64::NAN, f64::NAN, 0.9);
        let report = d.feed(&corrupt, 1);
        assert_eq!(report.rejection, Some(RejectionReason::UpperBodyNotVisible));

        let report = d.feed(&pose_with_elbow(170.0), 1);
        let snap = report.snapshot;
        assert!((snap.elbow_angle_deg - 170.0).abs() < 1e-6);
        assert!(snap.arm_asymmetry_deg.is_finite());
        let range = snap.elbow_range_deg.unwrap();
        assert!(range.is_finite() && range >= 0.0);
    }

    #[test]
    fn test_form_warning_overlays_feedback() {
        let mut d = Driver::new();
        d.feed(&pose_with_elbow(170.0), 8);

        // Sagging hips on both sides: knees and ankles well below the hip line
        let mut sagging = pose_with_elbow(170.0);
        for (knee, ankle, x) in [
            (Joint::LeftKnee, Joint::LeftAnkle, 500.0),
            (Joint::RightKnee, Joint::RightAnkle, 520.0),
        ] {
            sagging = sagging
                .with(knee, x, 300.0, 0.9)
                .with(ankle, x + 100.0, 500.0, 0.9);
        }

        let report = d.feed(&sagging, 8);
        assert_eq!(report.snapshot.phase, Phase::Up);
        assert_eq!(report.snapshot.feedback_text, "Keep your back straight");
        assert_eq!(report.snapshot.feedback_severity, FeedbackSeverity::Warning);
        assert!(report.snapshot.body_angle_deg < 135.0);
    }

    #[test]
    fn test_trend_diagnostics() {
        let mut d = Driver::new();
        let report = d.feed(&pose_with_elbow(170.0), 2);
        assert!(report.snapshot.elbow_trend_deg.is_none());
        assert_eq!(report.snapshot.elbow_range_deg.map(|r| r.round()), Some(0.0));

        let report = d.feed(&pose_with_elbow(110.0), 3);
        let trend = report.snapshot.elbow_trend_deg.unwrap();
        assert!(trend < 0.0, "descending elbow should trend negative, got {trend}");
        assert!(report.snapshot.elbow_range_deg.unwrap() > 30.0);
    }

    #[test]
    fn test_reset_clears_everything() {
        let mut d = Driver::new();
        d.feed(&pose_with_elbow(170.0), 8);
        d.feed(&pose_with_elbow(110.0), 8);
        d.feed(&pose_with_elbow(170.0), 8);
        assert_eq!(d.engine.snapshot().rep_count, 1);

        d.engine.reset();
        let snap = d.engine.snapshot();
        assert_eq!(snap.rep_count, 0);
        assert_eq!(snap.phase, Phase::NotInPosition);
        assert_eq!(snap.feedback_severity, FeedbackSeverity::Neutral);
        assert!(snap.elbow_range_deg.is_none());

        // Fresh smoothing: the first frame is reported unblended
        let report = d.feed(&pose_with_elbow(110.0), 1);
        assert!((report.snapshot.elbow_angle_deg - 110.0).abs() < 1e-6);
    }

    #[test]
    fn test_snapshot_json() {
        let engine = RepEngine::new(EngineConfig::default()).unwrap();
        let json = engine.snapshot().to_json().unwrap();
        assert!(json.contains("\"phase\":\"NotInPosition\""));
        assert!(json.contains("\"rep_count\":0"));

        let back: EngineSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, engine.snapshot());
    }
}
