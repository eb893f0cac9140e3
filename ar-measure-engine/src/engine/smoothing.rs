use std::collections::VecDeque;
use std::ops::{Add, Div, Mul, Sub};

use bevy::math::{Vec2, Vec3};
use constants::tracking::{DEFAULT_ROLLING_WINDOW, DEFAULT_SMOOTH_FACTOR};
use serde::{Deserialize, Serialize};

/// Coordinate types that can be filtered.
pub trait Sample:
    Copy
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<f32, Output = Self>
    + Div<f32, Output = Self>
    + Send
    + Sync
    + 'static
{
    const ZERO: Self;
}

impl Sample for Vec2 {
    const ZERO: Self = Vec2::ZERO;
}

impl Sample for Vec3 {
    const ZERO: Self = Vec3::ZERO;
}

/// Which filter a use site runs its samples through.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum SmoothingStrategy {
    /// Single-pole low-pass: `out = prev + (raw - prev) * factor`, factor in (0, 1].
    Exponential { factor: f32 },
    /// Arithmetic mean of the last `window` raw samples.
    RollingAverage { window: usize },
}

impl Default for SmoothingStrategy {
    fn default() -> Self {
        Self::Exponential {
            factor: DEFAULT_SMOOTH_FACTOR,
        }
    }
}

impl SmoothingStrategy {
    pub fn rolling_default() -> Self {
        Self::RollingAverage {
            window: DEFAULT_ROLLING_WINDOW,
        }
    }
}

/// Exponential moving average. A miss wipes the history.
#[derive(Debug, Clone)]
pub struct ExponentialSmoother<S> {
    factor: f32,
    last: Option<S>,
}

impl<S: Sample> ExponentialSmoother<S> {
    /// Factor is clamped into (0, 1]; 1.0 disables smoothing.
    pub fn new(factor: f32) -> Self {
        let factor = if factor.is_nan() {
            DEFAULT_SMOOTH_FACTOR
        } else {
            factor.clamp(f32::EPSILON, 1.0)
        };
        Self { factor, last: None }
    }

    pub fn factor(&self) -> f32 {
        self.factor
    }

    /// Filter one raw sample. The first sample after a reset passes through unchanged.
    pub fn smooth(&mut self, raw: S) -> S {
        let next = match self.last {
            // Short-circuit so a factor of 1.0 is an exact identity.
            Some(_) if self.factor >= 1.0 => raw,
            Some(previous) => previous + (raw - previous) * self.factor,
            None => raw,
        };
        self.last = Some(next);
        next
    }

    /// Filter a hit-test result; `None` resets the state and yields no estimate.
    pub fn observe(&mut self, raw: Option<S>) -> Option<S> {
        match raw {
            Some(sample) => Some(self.smooth(sample)),
            None => {
                self.reset();
                None
            }
        }
    }

    pub fn current(&self) -> Option<S> {
        self.last
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Bounded rolling average. Misses coast on the last average until `window`
/// consecutive misses have drained it.
#[derive(Debug, Clone)]
pub struct RollingAverageSmoother<S> {
    window: usize,
    samples: VecDeque<S>,
    consecutive_misses: usize,
}

impl<S: Sample> RollingAverageSmoother<S> {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            samples: VecDeque::with_capacity(window),
            consecutive_misses: 0,
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Number of buffered raw samples, never above `window`.
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn smooth(&mut self, raw: S) -> S {
        self.consecutive_misses = 0;
        if self.samples.len() >= self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(raw);
        // Buffer is non-empty after the push.
        self.mean().unwrap_or(raw)
    }

    pub fn observe(&mut self, raw: Option<S>) -> Option<S> {
        match raw {
            Some(sample) => Some(self.smooth(sample)),
            None => {
                self.consecutive_misses += 1;
                if self.consecutive_misses >= self.window {
                    self.samples.clear();
                }
                self.mean()
            }
        }
    }

    pub fn mean(&self) -> Option<S> {
        if self.samples.is_empty() {
            return None;
        }
        let sum = self.samples.iter().fold(S::ZERO, |acc, s| acc + *s);
        Some(sum / self.samples.len() as f32)
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.consecutive_misses = 0;
    }
}

/// Either smoothing strategy behind one interface.
#[derive(Debug, Clone)]
pub enum Smoother<S> {
    Exponential(ExponentialSmoother<S>),
    RollingAverage(RollingAverageSmoother<S>),
}

impl<S: Sample> Smoother<S> {
    pub fn from_strategy(strategy: SmoothingStrategy) -> Self {
        match strategy {
            SmoothingStrategy::Exponential { factor } => {
                Self::Exponential(ExponentialSmoother::new(factor))
            }
            SmoothingStrategy::RollingAverage { window } => {
                Self::RollingAverage(RollingAverageSmoother::new(window))
            }
        }
    }

    pub fn smooth(&mut self, raw: S) -> S {
        match self {
            Self::Exponential(inner) => inner.smooth(raw),
            Self::RollingAverage(inner) => inner.smooth(raw),
        }
    }

    pub fn observe(&mut self, raw: Option<S>) -> Option<S> {
        match self {
            Self::Exponential(inner) => inner.observe(raw),
            Self::RollingAverage(inner) => inner.observe(raw),
        }
    }

    pub fn reset(&mut self) {
        match self {
            Self::Exponential(inner) => inner.reset(),
            Self::RollingAverage(inner) => inner.reset(),
        }
    }
}
