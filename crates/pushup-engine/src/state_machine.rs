//! Repetition state machine.
//!
//! Turns smoothed elbow angles into debounced phase transitions and counted
//! repetitions. A posture is only acted on once it has held for
//! `frames_required` consecutive frames; frames that are neither extended
//! nor flexed decay both counters by one instead of clearing them, so a
//! single noisy frame does not erase accumulated confidence.
//!
//! A repetition is counted on the transition back to `Up` only when the
//! cycle reached the flexed bottom and at least `min_rep_gap_ms` has passed
//! since the previous counted repetition.

use serde::{Deserialize, Serialize};

use pushup_core::{Feedback, Phase, Timestamp};

use crate::config::EngineConfig;
use crate::validator::RejectionReason;

pub const MSG_DEFAULT: &str = "Get into push-up position";
pub const MSG_START_POSITION: &str = "Get into start position";
pub const MSG_READY: &str = "Ready, lower your chest";
pub const MSG_GOOD_DEPTH: &str = "Good depth, push up";
pub const MSG_GOING_DOWN: &str = "Going down";
pub const MSG_GO_LOWER: &str = "Go lower next time";
pub const MSG_PUSH_UP: &str = "Push up";
pub const MSG_TOO_FAST: &str = "Too fast, control the movement";
pub const MSG_FULL_EXTENSION: &str = "Full extension up";

/// Per-frame input, after smoothing
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickInput {
    /// Smoothed mean elbow angle (degrees)
    pub elbow_angle: f64,
    /// Smoothed body alignment angle (degrees)
    pub body_angle: f64,
    /// Left/right elbow difference (degrees)
    pub arm_asymmetry: f64,
    /// Non-fatal form issue detected this frame
    pub warning: Option<String>,
}

impl TickInput {
    pub fn new(elbow_angle: f64, body_angle: f64, arm_asymmetry: f64) -> Self {
        Self {
            elbow_angle,
            body_angle,
            arm_asymmetry,
            warning: None,
        }
    }

    pub fn with_warning(mut self, warning: impl Into<String>) -> Self {
        self.warning = Some(warning.into());
        self
    }
}

/// A counted repetition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepEvent {
    /// 1-based repetition number within the session
    pub rep_number: u32,
    pub timestamp: Timestamp,
    /// Time since the previous counted repetition
    pub since_previous_ms: Option<i64>,
}

/// Result of one state-machine tick
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub phase: Phase,
    pub rep_count: u32,
    /// Feedback to display, with any form warning applied
    pub feedback: Feedback,
    /// Set when this tick counted a repetition
    pub rep: Option<RepEvent>,
}

/// Debounced push-up phase tracker and repetition counter
#[derive(Debug, Clone)]
pub struct RepStateMachine {
    extended_angle: f64,
    flexed_angle: f64,
    frames_required: u32,
    min_rep_gap_ms: i64,

    phase: Phase,
    frames_extended: u32,
    frames_flexed: u32,
    rep_count: u32,
    reached_bottom: bool,
    last_rep_at: Option<Timestamp>,
    /// Feedback from the last transition, before warning overlay
    base_feedback: Feedback,
    /// Feedback last shown to the user
    displayed: Feedback,
}

impl RepStateMachine {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            extended_angle: config.thresholds.extended_angle,
            flexed_angle: config.thresholds.flexed_angle,
            frames_required: config.debounce.frames_required,
            min_rep_gap_ms: i64::try_from(config.debounce.min_rep_gap_ms).unwrap_or(i64::MAX),
            phase: Phase::NotInPosition,
            frames_extended: 0,
            frames_flexed: 0,
            rep_count: 0,
            reached_bottom: false,
            last_rep_at: None,
            base_feedback: Feedback::neutral(MSG_DEFAULT),
            displayed: Feedback::neutral(MSG_DEFAULT),
        }
    }

    /// Advance the machine by one accepted frame
    pub fn step(&mut self, input: &TickInput, now: Timestamp) -> StepOutcome {
        let is_extended = input.elbow_angle >= self.extended_angle;
        let is_flexed = input.elbow_angle <= self.flexed_angle;
        self.update_posture_counters(is_extended, is_flexed);

        let confirmed_extended = self.frames_extended >= self.frames_required;
        let confirmed_flexed = self.frames_flexed >= self.frames_required;

        let previous = self.phase;
        let mut rep = None;

        match self.phase {
            Phase::NotInPosition => {
                if confirmed_extended {
                    self.phase = Phase::Up;
                    self.reached_bottom = false;
                    self.base_feedback = Feedback::info(MSG_READY);
                } else if confirmed_flexed {
                    self.enter_bottom();
                } else {
                    self.base_feedback = Feedback::neutral(MSG_START_POSITION);
                }
            }
            Phase::Up => {
                if confirmed_extended {
                    // Holding the top position
                } else if confirmed_flexed {
                    self.enter_bottom();
                } else if !is_extended {
                    self.phase = Phase::GoingDown;
                    self.base_feedback = Feedback::info(MSG_GOING_DOWN);
                }
            }
            Phase::GoingDown => {
                if confirmed_extended {
                    self.phase = Phase::Up;
                    self.base_feedback = Feedback::warning(MSG_GO_LOWER);
                } else if confirmed_flexed {
                    self.enter_bottom();
                }
            }
            Phase::Down => {
                if confirmed_extended {
                    rep = self.complete_cycle(now);
                } else if confirmed_flexed {
                    // Holding the bottom position
                } else if !is_flexed {
                    self.phase = Phase::GoingUp;
                    self.base_feedback = Feedback::info(MSG_PUSH_UP);
                }
            }
            Phase::GoingUp => {
                if confirmed_extended {
                    rep = self.complete_cycle(now);
                } else if confirmed_flexed {
                    self.phase = Phase::Down;
                    self.base_feedback = Feedback::warning(MSG_FULL_EXTENSION);
                }
            }
        }

        if previous != self.phase {
            tracing::debug!(
                from = ?previous,
                to = ?self.phase,
                elbow_angle = input.elbow_angle,
                "phase transition"
            );
        }

        self.displayed = match input.warning.as_deref() {
            Some(warning) if !warning.is_empty() && self.phase != Phase::NotInPosition => {
                Feedback::warning(warning)
            }
            _ => self.base_feedback.clone(),
        };

        self.outcome(rep)
    }

    /// Handle a frame the validator rejected
    pub fn reject(&mut self, reason: RejectionReason) -> StepOutcome {
        if self.phase != Phase::NotInPosition {
            tracing::debug!(
                from = ?self.phase,
                reason = reason.description(),
                "frame rejected, leaving position"
            );
        }

        self.phase = Phase::NotInPosition;
        self.frames_extended = 0;
        self.frames_flexed = 0;
        self.reached_bottom = false;
        self.base_feedback = Feedback::danger(reason.description());
        self.displayed = self.base_feedback.clone();

        self.outcome(None)
    }

    /// Restore the initial state, including the repetition count
    pub fn reset(&mut self) {
        self.phase = Phase::NotInPosition;
        self.frames_extended = 0;
        self.frames_flexed = 0;
        self.rep_count = 0;
        self.reached_bottom = false;
        self.last_rep_at = None;
        self.base_feedback = Feedback::neutral(MSG_DEFAULT);
        self.displayed = self.base_feedback.clone();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn frames_extended(&self) -> u32 {
        self.frames_extended
    }

    pub fn frames_flexed(&self) -> u32 {
        self.frames_flexed
    }

    pub fn reached_bottom(&self) -> bool {
        self.reached_bottom
    }

    pub fn last_rep_at(&self) -> Option<Timestamp> {
        self.last_rep_at
    }

    /// Feedback last shown to the user
    pub fn feedback(&self) -> &Feedback {
        &self.displayed
    }

    fn update_posture_counters(&mut self, is_extended: bool, is_flexed: bool) {
        if is_extended {
            self.frames_extended += 1;
            self.frames_flexed = 0;
        } else if is_flexed {
            self.frames_flexed += 1;
            self.frames_extended = 0;
        } else {
            self.frames_extended = self.frames_extended.saturating_sub(1);
            self.frames_flexed = self.frames_flexed.saturating_sub(1);
        }
    }

    fn enter_bottom(&mut self) {
        self.phase = Phase::Down;
        self.reached_bottom = true;
        self.base_feedback = Feedback::success(MSG_GOOD_DEPTH);
    }

    /// Return to `Up`, counting the cycle if it reached the bottom and is not too soon
    fn complete_cycle(&mut self, now: Timestamp) -> Option<RepEvent> {
        self.phase = Phase::Up;
        let mut rep = None;

        if self.reached_bottom {
            let since_previous_ms = self.last_rep_at.map(|last| now.millis_since(last));
            let gap_ok = since_previous_ms.map_or(true, |ms| ms >= self.min_rep_gap_ms);

            if gap_ok {
                self.rep_count += 1;
                self.last_rep_at = Some(now);
                self.base_feedback = Feedback::success(format!("Rep {} complete", self.rep_count));
                tracing::info!(rep = self.rep_count, ?since_previous_ms, "repetition counted");
                rep = Some(RepEvent {
                    rep_number: self.rep_count,
                    timestamp: now,
                    since_previous_ms,
                });
            } else {
                self.base_feedback = Feedback::warning(MSG_TOO_FAST);
                tracing::warn!(
                    ?since_previous_ms,
                    min_gap_ms = self.min_rep_gap_ms,
                    "repetition ignored, too soon after previous"
                );
            }
        } else {
            self.base_feedback = Feedback::warning(MSG_GO_LOWER);
        }

        self.reached_bottom = false;
        rep
    }

    fn outcome(&self, rep: Option<RepEvent>) -> StepOutcome {
        StepOutcome {
            phase: self.phase,
            rep_count: self.rep_count,
            feedback: self.displayed.clone(),
            rep,
        }
    }
}

impl Default for RepStateMachine {
    fn default() -> Self {
        Self::new(&EngineConfig::default())
    }
}
