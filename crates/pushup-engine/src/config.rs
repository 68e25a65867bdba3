//! Engine configuration.
//!
//! Every section has defaults tuned for a 30 fps pose feed, so a partial file
//! (or none at all) is valid. Configurations are validated once at load or
//! construction time and never per frame.

use serde::{Deserialize, Serialize};

use pushup_core::{Error, Result};

/// Complete engine configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Angle smoothing windows
    pub smoothing: SmoothingConfig,

    /// Landmark gating
    pub validation: ValidationConfig,

    /// Posture and form thresholds
    pub thresholds: ThresholdConfig,

    /// Repetition debouncing
    pub debounce: DebounceConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Moving-average window for elbow and body angles (samples)
    pub window_size: usize,

    /// Elbow angle history kept for trend diagnostics (samples)
    pub trend_history: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window_size: 5,
            trend_history: 15,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Minimum landmark confidence for a joint to count as visible
    pub min_confidence: f32,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Smoothed elbow angle at or above which the arms count as extended (degrees)
    pub extended_angle: f64,

    /// Smoothed elbow angle at or below which the arms count as flexed (degrees)
    pub flexed_angle: f64,

    /// Body alignment below this triggers the straight-back warning (degrees)
    pub min_body_angle: f64,

    /// Left/right elbow difference above this triggers the asymmetry warning (degrees)
    pub max_arm_asymmetry: f64,

    /// How far a wrist may sit above the shoulder line (pixels)
    pub hand_tolerance_px: f64,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            extended_angle: 160.0,
            flexed_angle: 125.0,
            min_body_angle: 135.0,
            max_arm_asymmetry: 45.0,
            hand_tolerance_px: 100.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebounceConfig {
    /// Consecutive frames needed to confirm a posture
    pub frames_required: u32,

    /// Minimum time between two counted repetitions (milliseconds)
    pub min_rep_gap_ms: u64,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            frames_required: 3,
            min_rep_gap_ms: 600,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.smoothing.window_size == 0 {
            return Err(Error::InvalidConfig(
                "smoothing.window_size must be at least 1".into(),
            ));
        }
        if self.smoothing.trend_history == 0 {
            return Err(Error::InvalidConfig(
                "smoothing.trend_history must be at least 1".into(),
            ));
        }
        if self.debounce.frames_required == 0 {
            return Err(Error::InvalidConfig(
                "debounce.frames_required must be at least 1".into(),
            ));
        }
        if i64::try_from(self.debounce.min_rep_gap_ms).is_err() {
            return Err(Error::InvalidConfig(format!(
                "debounce.min_rep_gap_ms must not exceed {} ms, got {}",
                i64::MAX,
                self.debounce.min_rep_gap_ms
            )));
        }

        let confidence = self.validation.min_confidence;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(Error::InvalidConfig(format!(
                "validation.min_confidence must be within [0, 1], got {confidence}"
            )));
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("extended_angle", t.extended_angle),
            ("flexed_angle", t.flexed_angle),
            ("min_body_angle", t.min_body_angle),
            ("max_arm_asymmetry", t.max_arm_asymmetry),
        ] {
            if !(0.0..=180.0).contains(&value) {
                return Err(Error::InvalidConfig(format!(
                    "thresholds.{name} must be within [0, 180], got {value}"
                )));
            }
        }
        if t.flexed_angle >= t.extended_angle {
            return Err(Error::InvalidConfig(format!(
                "thresholds.flexed_angle ({}) must be below thresholds.extended_angle ({})",
                t.flexed_angle, t.extended_angle
            )));
        }
        if !t.hand_tolerance_px.is_finite() || t.hand_tolerance_px < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "thresholds.hand_tolerance_px must be a non-negative number, got {}",
                t.hand_tolerance_px
            )));
        }

        Ok(())
    }

    /// Load configuration from file, with `PUSHUP__*` environment overrides
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(Self::environment())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::finish(settings)
    }

    /// Load from environment variables, e.g. `PUSHUP__DEBOUNCE__MIN_REP_GAP_MS=800`
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(Self::environment())
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::finish(settings)
    }

    /// Load from an in-memory TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::from_str(toml, config::FileFormat::Toml))
            .build()
            .map_err(|e| Error::Config(e.to_string()))?;

        Self::finish(settings)
    }

    fn environment() -> config::Environment {
        config::Environment::with_prefix("PUSHUP")
            .prefix_separator("__")
            .separator("__")
            .try_parsing(true)
    }

    fn finish(settings: config::Config) -> Result<Self> {
        let config: Self = settings
            .try_deserialize()
            .map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }
}
