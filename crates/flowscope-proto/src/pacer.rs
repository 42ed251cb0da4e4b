//! Render pacer options.
//!
//! Both disciplines validate eagerly: a pacer is never constructed from
//! options that fail [`FixedRateOptions::validate`] or
//! [`SmoothedOptions::validate`].

use serde::{Deserialize, Serialize};

use crate::PacerError;

/// Options for the fixed-rate queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FixedRateOptions {
    /// Tick period in milliseconds.
    #[serde(default = "default_interval_ms")]
    pub interval_ms: f64,

    /// Lines delivered per tick at most.
    #[serde(default = "default_max_lines_per_tick")]
    pub max_lines_per_tick: usize,
}

fn default_interval_ms() -> f64 {
    250.0
}

fn default_max_lines_per_tick() -> usize {
    1
}

impl Default for FixedRateOptions {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_lines_per_tick: default_max_lines_per_tick(),
        }
    }
}

impl FixedRateOptions {
    pub fn new(interval_ms: f64, max_lines_per_tick: usize) -> Self {
        Self {
            interval_ms,
            max_lines_per_tick,
        }
    }

    pub fn validate(&self) -> Result<(), PacerError> {
        positive("interval_ms", self.interval_ms)?;
        if self.max_lines_per_tick == 0 {
            return Err(PacerError::NotPositive {
                option: "max_lines_per_tick",
                value: 0.0,
            });
        }
        Ok(())
    }
}

/// Options for the timestamp-smoothed queue.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedOptions {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: f64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: f64,

    /// Multiplier applied to real timestamp deltas (0.1 = ten times faster).
    #[serde(default = "default_time_scale")]
    pub time_scale: f64,

    /// Weight of the newest delay; 1.0 disables smoothing.
    #[serde(default = "default_smoothing_alpha")]
    pub smoothing_alpha: f64,
}

fn default_min_delay_ms() -> f64 {
    50.0
}

fn default_max_delay_ms() -> f64 {
    1500.0
}

fn default_time_scale() -> f64 {
    0.1
}

fn default_smoothing_alpha() -> f64 {
    0.5
}

impl Default for SmoothedOptions {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            time_scale: default_time_scale(),
            smoothing_alpha: default_smoothing_alpha(),
        }
    }
}

impl SmoothedOptions {
    pub fn validate(&self) -> Result<(), PacerError> {
        non_negative("min_delay_ms", self.min_delay_ms)?;
        non_negative("max_delay_ms", self.max_delay_ms)?;
        if self.max_delay_ms < self.min_delay_ms {
            return Err(PacerError::BoundsOutOfOrder {
                min: self.min_delay_ms,
                max: self.max_delay_ms,
            });
        }
        positive("time_scale", self.time_scale)?;
        finite("smoothing_alpha", self.smoothing_alpha)?;
        if !(0.0..=1.0).contains(&self.smoothing_alpha) {
            return Err(PacerError::OutOfRange {
                option: "smoothing_alpha",
                value: self.smoothing_alpha,
                min: 0.0,
                max: 1.0,
            });
        }
        Ok(())
    }
}

fn finite(option: &'static str, value: f64) -> Result<(), PacerError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(PacerError::NotFinite { option, value })
    }
}

fn non_negative(option: &'static str, value: f64) -> Result<(), PacerError> {
    finite(option, value)?;
    if value < 0.0 {
        return Err(PacerError::Negative { option, value });
    }
    Ok(())
}

fn positive(option: &'static str, value: f64) -> Result<(), PacerError> {
    finite(option, value)?;
    if value <= 0.0 {
        return Err(PacerError::NotPositive { option, value });
    }
    Ok(())
}
