//! Poll interval normalization.
//!
//! The configuration store keeps a poll period as a `(value, unit)` pair.
//! Everything downstream works with a single [`PollInterval`] built from
//! that pair.

use core::fmt;
use core::str::FromStr;
use core::time::Duration;

/// Smallest poll interval a worker will run with.
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Longest poll interval a worker will run with (30 days).
pub const MAX_POLL_INTERVAL: Duration = Duration::from_secs(30 * 24 * 3600);

/// Unit of a configured poll period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IntervalUnit {
    Milliseconds,
    Seconds,
    Minutes,
    Hours,
}

impl IntervalUnit {
    /// The canonical upper-case name used by the configuration store.
    pub const fn as_str(&self) -> &'static str {
        match self {
            IntervalUnit::Milliseconds => "MILLISECONDS",
            IntervalUnit::Seconds => "SECONDS",
            IntervalUnit::Minutes => "MINUTES",
            IntervalUnit::Hours => "HOURS",
        }
    }
}

impl fmt::Display for IntervalUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntervalUnit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MILLISECONDS" => Ok(IntervalUnit::Milliseconds),
            "SECONDS" => Ok(IntervalUnit::Seconds),
            "MINUTES" => Ok(IntervalUnit::Minutes),
            "HOURS" => Ok(IntervalUnit::Hours),
            _ => Err(s.to_string()),
        }
    }
}

/// Convert a `(value, unit)` pair to seconds.
///
/// ```rust
/// use fieldgate_types::{convert_to_seconds, IntervalUnit};
///
/// assert_eq!(convert_to_seconds(1.0, IntervalUnit::Hours), 3600.0);
/// assert_eq!(convert_to_seconds(1000.0, IntervalUnit::Milliseconds), 1.0);
/// ```
pub fn convert_to_seconds(value: f64, unit: IntervalUnit) -> f64 {
    match unit {
        IntervalUnit::Milliseconds => value / 1000.0,
        IntervalUnit::Seconds => value,
        IntervalUnit::Minutes => value * 60.0,
        IntervalUnit::Hours => value * 3600.0,
    }
}

/// Normalized poll interval of a device.
///
/// Always between [`MIN_POLL_INTERVAL`] and [`MAX_POLL_INTERVAL`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PollInterval(Duration);

impl PollInterval {
    /// Build an interval from a configured `(value, unit)` pair.
    ///
    /// Non-finite, negative or too-small values are clamped to
    /// [`MIN_POLL_INTERVAL`], too-large ones to [`MAX_POLL_INTERVAL`].
    pub fn from_parts(value: f64, unit: IntervalUnit) -> Self {
        Self::from_secs_f64(convert_to_seconds(value, unit))
    }

    /// Build an interval from a number of seconds.
    pub fn from_secs_f64(secs: f64) -> Self {
        if !secs.is_finite() || secs < MIN_POLL_INTERVAL.as_secs_f64() {
            return Self(MIN_POLL_INTERVAL);
        }
        match Duration::try_from_secs_f64(secs) {
            Ok(d) => Self(d.min(MAX_POLL_INTERVAL)),
            Err(_) => Self(MAX_POLL_INTERVAL),
        }
    }

    /// The interval as a standard Duration.
    pub const fn as_duration(&self) -> Duration {
        self.0
    }

    /// The interval in seconds.
    pub fn as_secs_f64(&self) -> f64 {
        self.0.as_secs_f64()
    }
}

impl From<Duration> for PollInterval {
    fn from(d: Duration) -> Self {
        Self(d.clamp(MIN_POLL_INTERVAL, MAX_POLL_INTERVAL))
    }
}

impl From<PollInterval> for Duration {
    fn from(interval: PollInterval) -> Self {
        interval.0
    }
}

impl fmt::Display for PollInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0.as_secs_f64())
    }
}
