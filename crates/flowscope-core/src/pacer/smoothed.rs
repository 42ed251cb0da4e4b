//! Timestamp-proportional draining.

use flowscope_proto::{PacerError, SmoothedOptions};
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

use super::{Delivery, Pacer};
use crate::normalizer::leading_timestamp_ms;

/// Longest delay an override may impose: one day.
pub const MAX_OVERRIDE_DELAY_MS: f64 = 86_400_000.0;

/// Per-line delay override in milliseconds; `None` falls back to timestamps.
///
/// Returned delays are clamped to `[0, MAX_OVERRIDE_DELAY_MS]`.
pub type DelayOverride = Arc<dyn Fn(&str) -> Option<f64> + Send + Sync>;

/// Shows lines one at a time, spaced like the original log.
///
/// The gap before a line is the real gap between its timestamp and the last
/// shown timestamped line, scaled by `time_scale`, smoothed against the
/// previous gap and clamped to `[min_delay_ms, max_delay_ms]`.
pub struct SmoothedPacer {
    options: SmoothedOptions,
    delay_override: Option<DelayOverride>,
    queue: VecDeque<String>,
    running: bool,
    /// Due time of the queue head, set while running with a non-empty queue.
    head_due: Option<u64>,
    last_shown_at: Option<u64>,
    last_timestamp: Option<i64>,
    last_delay: Option<f64>,
}

impl fmt::Debug for SmoothedPacer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmoothedPacer")
            .field("options", &self.options)
            .field("queued", &self.queue.len())
            .field("running", &self.running)
            .field("head_due", &self.head_due)
            .finish_non_exhaustive()
    }
}

impl SmoothedPacer {
    pub fn new(options: SmoothedOptions) -> Result<Self, PacerError> {
        options.validate()?;
        Ok(Self {
            options,
            delay_override: None,
            queue: VecDeque::new(),
            running: false,
            head_due: None,
            last_shown_at: None,
            last_timestamp: None,
            last_delay: None,
        })
    }

    /// Installs a per-line delay override.
    pub fn with_delay_override(mut self, delay: DelayOverride) -> Self {
        self.delay_override = Some(delay);
        self
    }

    pub fn options(&self) -> &SmoothedOptions {
        &self.options
    }

    /// Delay to wait after the last shown line before showing `line`.
    fn delay_for(&mut self, line: &str) -> f64 {
        let timestamp = leading_timestamp_ms(line);

        if self.last_shown_at.is_none() {
            if timestamp.is_some() {
                self.last_timestamp = timestamp;
            }
            return 0.0;
        }

        let overridden = self.delay_override.as_ref().and_then(|f| f(line));
        if let Some(delay) = overridden.filter(|d| d.is_finite()) {
            return delay.clamp(0.0, MAX_OVERRIDE_DELAY_MS);
        }

        let Some(timestamp) = timestamp else {
            return self.options.min_delay_ms;
        };
        let Some(previous) = self.last_timestamp.replace(timestamp) else {
            return self.options.min_delay_ms;
        };

        let raw = (timestamp - previous).max(0) as f64 * self.options.time_scale;
        let alpha = self.options.smoothing_alpha;
        let smoothed = match self.last_delay {
            Some(prev) => alpha * raw + (1.0 - alpha) * prev,
            None => raw,
        };
        let clamped = smoothed.clamp(self.options.min_delay_ms, self.options.max_delay_ms);
        self.last_delay = Some(clamped);
        clamped
    }

    /// Computes the due time of a new queue head that became head at `since`.
    fn schedule_head(&mut self, since: u64) {
        let Some(line) = self.queue.front().cloned() else {
            self.head_due = None;
            return;
        };
        let delay = self.delay_for(&line);
        let due = self
            .last_shown_at
            .map_or(since, |shown| shown.saturating_add(delay.round() as u64))
            .max(since);
        trace!(delay_ms = delay, due, "Scheduled next line");
        self.head_due = Some(due);
    }
}

impl Pacer for SmoothedPacer {
    fn start(&mut self, now_ms: u64) {
        if self.running {
            return;
        }
        debug!(queued = self.queue.len(), now_ms, "Smoothed pacer started");
        self.running = true;
        self.schedule_head(now_ms);
    }

    fn stop(&mut self) {
        if self.running {
            debug!(discarded = self.queue.len(), "Smoothed pacer stopped");
        }
        self.running = false;
        self.queue.clear();
        self.head_due = None;
        self.last_shown_at = None;
        self.last_timestamp = None;
        self.last_delay = None;
    }

    fn push(&mut self, line: String, now_ms: u64) -> Vec<Delivery> {
        let was_empty = self.queue.is_empty();
        self.queue.push_back(line);
        if !self.running || !was_empty {
            return Vec::new();
        }
        self.schedule_head(now_ms);
        self.poll(now_ms)
    }

    fn poll(&mut self, now_ms: u64) -> Vec<Delivery> {
        let mut deliveries = Vec::new();
        while let Some(due) = self.head_due.filter(|&due| due <= now_ms && self.running) {
            let Some(line) = self.queue.pop_front() else {
                self.head_due = None;
                break;
            };
            self.last_shown_at = Some(due);
            deliveries.push(Delivery::new(due, vec![line]));
            self.schedule_head(due);
        }
        deliveries
    }

    fn next_deadline(&self) -> Option<u64> {
        if self.running { self.head_due } else { None }
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn is_running(&self) -> bool {
        self.running
    }
}
