//! Scalar signal smoothing and trend tracking for joint angles.

use std::collections::VecDeque;

use pushup_core::{Error, Result};

/// Moving-average smoother over the most recent `window_size` samples.
///
/// Smoothing is best-effort: before the window fills, the mean of whatever
/// samples are held is returned.
#[derive(Debug, Clone)]
pub struct Smoother {
    window_size: usize,
    buffer: VecDeque<f64>,
}

impl Smoother {
    pub const DEFAULT_WINDOW: usize = 5;

    pub fn new(window_size: usize) -> Result<Self> {
        if window_size == 0 {
            return Err(Error::InvalidConfig(
                "smoother window must hold at least one sample".into(),
            ));
        }

        Ok(Self {
            window_size,
            buffer: VecDeque::with_capacity(window_size),
        })
    }

    /// Add a sample and return the mean of the current window
    pub fn add(&mut self, value: f64) -> f64 {
        if self.buffer.len() >= self.window_size {
            self.buffer.pop_front();
        }
        self.buffer.push_back(value);

        self.buffer.iter().sum::<f64>() / self.buffer.len() as f64
    }

    pub fn has_enough_data(&self) -> bool {
        self.buffer.len() >= self.window_size
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self {
            window_size: Self::DEFAULT_WINDOW,
            buffer: VecDeque::with_capacity(Self::DEFAULT_WINDOW),
        }
    }
}

/// Bounded history of a scalar signal exposing its short-term trend and range
#[derive(Debug, Clone)]
pub struct TrendTracker {
    capacity: usize,
    history: VecDeque<f64>,
}

impl TrendTracker {
    pub const DEFAULT_CAPACITY: usize = 15;

    /// Samples required before `trend` is defined
    pub const MIN_TREND_SAMPLES: usize = 3;

    pub fn new(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidConfig(
                "trend tracker must hold at least one sample".into(),
            ));
        }

        Ok(Self {
            capacity,
            history: VecDeque::with_capacity(capacity),
        })
    }

    pub fn add(&mut self, value: f64) {
        if self.history.len() >= self.capacity {
            self.history.pop_front();
        }
        self.history.push_back(value);
    }

    /// Newest minus oldest sample (positive = increasing)
    pub fn trend(&self) -> Option<f64> {
        if self.history.len() < Self::MIN_TREND_SAMPLES {
            return None;
        }
        Some(self.history.back()? - self.history.front()?)
    }

    /// Spread between the largest and smallest held sample
    pub fn range(&self) -> Option<f64> {
        if self.history.is_empty() {
            return None;
        }
        let min = self.history.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.history.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some(max - min)
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }
}

impl Default for TrendTracker {
    fn default() -> Self {
        Self {
            capacity: Self::DEFAULT_CAPACITY,
            history: VecDeque::with_capacity(Self::DEFAULT_CAPACITY),
        }
    }
}
