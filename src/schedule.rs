//! Advance timing: how long the current item stays up before the next one.

use std::f64::consts::TAU;
use std::time::Duration;

use rand::Rng;

/// Delay used whenever a configured interval cannot be read as a number.
pub const FALLBACK_INTERVAL: Duration = Duration::from_millis(200);

pub const MIN_SIN_RATE: u32 = 1;
pub const MAX_SIN_RATE: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingConfig {
    Constant {
        interval: Duration,
    },
    /// Uniform in `[min, max)`, resampled on every advance.
    Random {
        min: Duration,
        max: Duration,
    },
    /// Oscillates between `min` and `max` over `period` of scene time.
    Sin {
        min: Duration,
        max: Duration,
        period: Duration,
    },
}

impl TimingConfig {
    pub const fn constant_millis(ms: u64) -> Self {
        Self::Constant {
            interval: Duration::from_millis(ms),
        }
    }

    pub const fn random_millis(min: u64, max: u64) -> Self {
        Self::Random {
            min: Duration::from_millis(min),
            max: Duration::from_millis(max),
        }
    }

    /// Sinusoidal timing whose period is derived from a speed `rate`.
    pub fn sin_with_rate(min: Duration, max: Duration, rate: u32) -> Self {
        Self::Sin {
            min,
            max,
            period: period_for_rate(rate),
        }
    }

    /// `(min, max)` bounds, when the function has any.
    pub fn bounds(&self) -> Option<(Duration, Duration)> {
        match *self {
            Self::Constant { .. } => None,
            Self::Random { min, max } | Self::Sin { min, max, .. } => Some((min, max)),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self::constant_millis(1000)
    }
}

/// A duration that is either timed on its own or tracks the scene delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DurationTiming {
    /// As long as the current item stays on screen.
    Scene,
    Timed(TimingConfig),
}

impl DurationTiming {
    pub fn resolve<R: Rng + ?Sized>(
        &self,
        scene_delay: Duration,
        elapsed: Duration,
        rng: &mut R,
    ) -> Duration {
        match self {
            Self::Scene => scene_delay,
            Self::Timed(timing) => next_delay(timing, elapsed, rng),
        }
    }
}

/// Sinusoidal period for a speed setting in `1..=100`; faster rates give
/// shorter periods. Out-of-range rates are clamped.
pub fn period_for_rate(rate: u32) -> Duration {
    let rate = rate.clamp(MIN_SIN_RATE, MAX_SIN_RATE);
    let span = f64::from(MAX_SIN_RATE.abs_diff(rate) + 2);
    Duration::from_secs_f64(TAU * span)
}

/// Delay before the next advance. `elapsed` is the time since the scene
/// started and only matters for [`TimingConfig::Sin`].
pub fn next_delay<R: Rng + ?Sized>(
    config: &TimingConfig,
    elapsed: Duration,
    rng: &mut R,
) -> Duration {
    match *config {
        TimingConfig::Constant { interval } => interval,
        TimingConfig::Random { min, max } => {
            let lo = duration_millis(min);
            let hi = duration_millis(max);
            if lo >= hi {
                return min;
            }
            Duration::from_millis(rng.random_range(lo..hi))
        }
        TimingConfig::Sin { min, max, period } => {
            if max <= min {
                return min;
            }
            let period = period.as_secs_f64();
            if period <= 0.0 {
                return min;
            }
            let lo = min.as_secs_f64() * 1000.0;
            let hi = max.as_secs_f64() * 1000.0;
            let phase = TAU * elapsed.as_secs_f64() / period;
            let ms = lo + (hi - lo) * (0.5 + 0.5 * phase.sin());
            Duration::from_millis(ms.round().clamp(lo, hi) as u64)
        }
    }
}

/// Read an interval the way a loose config editor wrote it: optional sign,
/// then leading decimal digits; anything after the digits is ignored.
/// Negative values clamp to zero. Returns `None` when there are no digits.
pub fn coerce_millis(raw: &str) -> Option<u64> {
    let trimmed = raw.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let end = digits
        .bytes()
        .position(|b| !b.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    if negative {
        return Some(0);
    }
    Some(digits[..end].parse::<u64>().unwrap_or(u64::MAX))
}

/// Like [`coerce_millis`], substituting [`FALLBACK_INTERVAL`].
pub fn coerce_interval(raw: &str) -> Duration {
    coerce_millis(raw)
        .map(Duration::from_millis)
        .unwrap_or(FALLBACK_INTERVAL)
}

fn duration_millis(d: Duration) -> u64 {
    d.as_millis().min(u128::from(u64::MAX)) as u64
}
