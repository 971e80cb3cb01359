//! Backoff delay calculation.
//!
//! The delay between two failed attempts is the sum of one or more
//! [`BackoffComponent`]s:
//!
//! | Component | Delay |
//! |-----------|-------|
//! | `Exponential` | `base_delay * 2^n`, capped at `max_delay` |
//! | `Fixed` | `base_delay` |
//! | `Random` | uniform in `[0, max_jitter)` |
//!
//! `n` is the 0-based attempt index supplied by the running scheme.
//! Components may repeat; each occurrence adds to the total.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Growth factor of the exponential component.
pub const FACTOR: u32 = 2;

/// Default base delay (10 minutes).
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(10 * 60);

/// Default upper bound for any computed delay (100 minutes).
pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(100 * 60);

/// Default exclusive upper bound of the random component (100 minutes).
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_secs(100 * 60);

/// One contributor to the inter-attempt delay.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffComponent {
    /// `base_delay * FACTOR^n`.
    Exponential,
    /// Constant `base_delay`.
    Fixed,
    /// Uniform jitter in `[0, max_jitter)`.
    Random,
}

impl fmt::Display for BackoffComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exponential => write!(f, "exponential"),
            Self::Fixed => write!(f, "fixed"),
            Self::Random => write!(f, "random"),
        }
    }
}

/// Returned when a backoff component name is not recognized.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown backoff component: {0}")]
pub struct ParseComponentError(pub String);

impl FromStr for BackoffComponent {
    type Err = ParseComponentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "exponential" | "backoff" => Ok(Self::Exponential),
            "fixed" => Ok(Self::Fixed),
            "random" | "jitter" => Ok(Self::Random),
            _ => Err(ParseComponentError(s.to_string())),
        }
    }
}

/// Delay parameters and the set of components that are summed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackoffPolicy {
    /// Base unit for the exponential and fixed components.
    pub base_delay: Duration,
    /// Hard upper bound on any computed delay. Zero disables the bound.
    pub max_delay: Duration,
    /// Exclusive upper bound of the random component.
    pub max_jitter: Duration,
    /// Components summed by [`combine`](Self::combine).
    pub components: Vec<BackoffComponent>,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_delay: DEFAULT_MAX_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
            components: vec![BackoffComponent::Exponential],
        }
    }
}

impl BackoffPolicy {
    /// Exponential component for attempt index `n`.
    ///
    /// Saturates instead of overflowing, then applies `max_delay` when it is
    /// non-zero.
    pub fn exponential(&self, n: u32) -> Duration {
        let delay = if self.base_delay.is_zero() {
            Duration::ZERO
        } else {
            FACTOR
                .checked_pow(n)
                .and_then(|factor| self.base_delay.checked_mul(factor))
                .unwrap_or(Duration::MAX)
        };
        self.cap(delay)
    }

    /// Fixed component.
    pub fn fixed(&self) -> Duration {
        self.base_delay
    }

    /// Random component, drawn fresh on every call.
    ///
    /// Returns zero when `max_jitter` is zero since the range is empty.
    pub fn random(&self) -> Duration {
        let upper = u64::try_from(self.max_jitter.as_nanos()).unwrap_or(u64::MAX);
        if upper == 0 {
            return Duration::ZERO;
        }
        Duration::from_nanos(rand::thread_rng().gen_range(0..upper))
    }

    /// Sum of the selected components for attempt index `n`.
    ///
    /// Falls back to the exponential component when no component is
    /// selected. The result never exceeds `max_delay` when it is non-zero.
    pub fn combine(&self, n: u32) -> Duration {
        if self.components.is_empty() {
            return self.exponential(n);
        }

        let total = self
            .components
            .iter()
            .map(|component| match component {
                BackoffComponent::Exponential => self.exponential(n),
                BackoffComponent::Fixed => self.fixed(),
                BackoffComponent::Random => self.random(),
            })
            .fold(Duration::ZERO, Duration::saturating_add);

        self.cap(total)
    }

    fn cap(&self, delay: Duration) -> Duration {
        if !self.max_delay.is_zero() && delay > self.max_delay {
            self.max_delay
        } else {
            delay
        }
    }
}
