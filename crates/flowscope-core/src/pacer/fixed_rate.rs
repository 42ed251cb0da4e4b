//! Fixed-rate draining.

use flowscope_proto::{FixedRateOptions, PacerError};
use std::collections::VecDeque;
use tracing::debug;

use super::{Delivery, Pacer};

/// Delivers up to `max_lines_per_tick` lines on a fixed tick grid.
///
/// Ticks fall at `start + k * interval_ms`. A line pushed into an idle,
/// running pacer is shown at once when a full interval has passed since the
/// last delivery; the grid itself never moves.
#[derive(Debug)]
pub struct FixedRatePacer {
    options: FixedRateOptions,
    queue: VecDeque<String>,
    started_at: Option<u64>,
    /// Index of the next tick on the grid.
    tick: u64,
    last_delivery_at: Option<u64>,
}

impl FixedRatePacer {
    pub fn new(options: FixedRateOptions) -> Result<Self, PacerError> {
        options.validate()?;
        Ok(Self {
            options,
            queue: VecDeque::new(),
            started_at: None,
            tick: 1,
            last_delivery_at: None,
        })
    }

    pub fn options(&self) -> &FixedRateOptions {
        &self.options
    }

    fn tick_at(&self, start: u64, tick: u64) -> u64 {
        start.saturating_add((tick as f64 * self.options.interval_ms).round() as u64)
    }

    /// Moves the tick index to the first grid point after `now_ms`.
    fn skip_past(&mut self, start: u64, now_ms: u64) {
        let elapsed = now_ms.saturating_sub(start) as f64;
        self.tick = self
            .tick
            .max((elapsed / self.options.interval_ms).floor() as u64 + 1);
        while self.tick_at(start, self.tick) <= now_ms {
            self.tick += 1;
        }
    }

    fn take_batch(&mut self) -> Vec<String> {
        let n = self.queue.len().min(self.options.max_lines_per_tick);
        self.queue.drain(..n).collect()
    }
}

impl Pacer for FixedRatePacer {
    fn start(&mut self, now_ms: u64) {
        if self.started_at.is_some() {
            return;
        }
        debug!(queued = self.queue.len(), now_ms, "Fixed-rate pacer started");
        self.started_at = Some(now_ms);
        self.tick = 1;
    }

    fn stop(&mut self) {
        if self.started_at.take().is_some() {
            debug!(discarded = self.queue.len(), "Fixed-rate pacer stopped");
        }
        self.queue.clear();
        self.tick = 1;
        self.last_delivery_at = None;
    }

    fn push(&mut self, line: String, now_ms: u64) -> Vec<Delivery> {
        let Some(start) = self.started_at else {
            self.queue.push_back(line);
            return Vec::new();
        };

        let interval_elapsed = self
            .last_delivery_at
            .is_none_or(|last| now_ms.saturating_sub(last) as f64 >= self.options.interval_ms);

        if self.queue.is_empty() && interval_elapsed {
            self.last_delivery_at = Some(now_ms);
            self.skip_past(start, now_ms);
            return vec![Delivery::new(now_ms, vec![line])];
        }

        self.queue.push_back(line);
        Vec::new()
    }

    fn poll(&mut self, now_ms: u64) -> Vec<Delivery> {
        let Some(start) = self.started_at else {
            return Vec::new();
        };

        let mut deliveries = Vec::new();
        loop {
            let due = self.tick_at(start, self.tick);
            if due > now_ms {
                break;
            }
            if self.queue.is_empty() {
                self.skip_past(start, now_ms);
                break;
            }
            deliveries.push(Delivery::new(due, self.take_batch()));
            self.last_delivery_at = Some(due);
            self.tick += 1;
        }
        deliveries
    }

    fn next_deadline(&self) -> Option<u64> {
        let start = self.started_at?;
        if self.queue.is_empty() {
            None
        } else {
            Some(self.tick_at(start, self.tick))
        }
    }

    fn pending(&self) -> usize {
        self.queue.len()
    }

    fn is_running(&self) -> bool {
        self.started_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pacer(interval_ms: f64, max_lines_per_tick: usize) -> FixedRatePacer {
        FixedRatePacer::new(FixedRateOptions::new(interval_ms, max_lines_per_tick)).unwrap()
    }

    fn lines(deliveries: &[Delivery]) -> Vec<(u64, Vec<&str>)> {
        deliveries
            .iter()
            .map(|d| (d.at_ms, d.lines.iter().map(String::as_str).collect()))
            .collect()
    }

    #[test]
    fn rejects_invalid_options() {
        assert!(matches!(
            FixedRatePacer::new(FixedRateOptions::new(0.0, 1)),
            Err(PacerError::NotPositive { option: "interval_ms", .. })
        ));
        assert!(matches!(
            FixedRatePacer::new(FixedRateOptions::new(f64::NAN, 1)),
            Err(PacerError::NotFinite { .. })
        ));
        assert!(matches!(
            FixedRatePacer::new(FixedRateOptions::new(10.0, 0)),
            Err(PacerError::NotPositive { option: "max_lines_per_tick", .. })
        ));
    }

    #[test]
    fn queued_lines_drain_one_per_tick() {
        let mut pacer = pacer(50.0, 1);
        for line in ["a", "b", "c"] {
            assert!(pacer.push(line.to_string(), 0).is_empty());
        }
        pacer.start(0);
        assert_eq!(pacer.next_deadline(), Some(50));

        let shown = pacer.poll(150);
        assert_eq!(
            lines(&shown),
            vec![(50, vec!["a"]), (100, vec!["b"]), (150, vec!["c"])]
        );
        assert_eq!(pacer.next_deadline(), None);
    }

    #[test]
    fn batches_up_to_max_lines() {
        let mut pacer = pacer(100.0, 2);
        for line in ["a", "b", "c"] {
            pacer.push(line.to_string(), 0);
        }
        pacer.start(0);
        assert_eq!(
            lines(&pacer.poll(250)),
            vec![(100, vec!["a", "b"]), (200, vec!["c"])]
        );
    }

    #[test]
    fn idle_push_delivers_immediately_without_moving_grid() {
        let mut pacer = pacer(50.0, 1);
        pacer.start(0);
        assert_eq!(lines(&pacer.push("a".into(), 10)), vec![(10, vec!["a"])]);

        // Within one interval of the last delivery: wait for the grid
        assert!(pacer.push("b".into(), 30).is_empty());
        assert_eq!(pacer.next_deadline(), Some(50));
        assert_eq!(lines(&pacer.poll(50)), vec![(50, vec!["b"])]);

        // Idle for a while, then a push is shown at once and the next tick stays on the grid
        assert_eq!(lines(&pacer.push("c".into(), 237)), vec![(237, vec!["c"])]);
        assert!(pacer.push("d".into(), 240).is_empty());
        assert_eq!(pacer.next_deadline(), Some(250));
    }

    #[test]
    fn empty_ticks_are_skipped() {
        let mut pacer = pacer(50.0, 1);
        pacer.start(0);
        assert!(pacer.poll(1000).is_empty());
        pacer.push("a".into(), 1000);
        assert!(pacer.push("b".into(), 1001).is_empty());
        assert_eq!(pacer.next_deadline(), Some(1050));
    }

    #[test]
    fn stop_discards_queue() {
        let mut pacer = pacer(50.0, 1);
        pacer.push("a".into(), 0);
        pacer.push("b".into(), 0);
        pacer.start(0);
        pacer.stop();
        assert_eq!(pacer.pending(), 0);
        assert!(!pacer.is_running());
        assert!(pacer.poll(500).is_empty());
    }

    #[test]
    fn huge_interval_saturates_instead_of_overflowing() {
        let mut pacer = pacer(1e20, 1);
        pacer.push("a".into(), 0);
        pacer.start(10);
        assert_eq!(pacer.next_deadline(), Some(u64::MAX));
        assert!(pacer.poll(1_000_000).is_empty());
        assert_eq!(pacer.pending(), 1);
    }

    #[test]
    fn fractional_interval_stays_on_grid() {
        let mut pacer = pacer(33.3, 1);
        for line in ["a", "b", "c"] {
            pacer.push(line.to_string(), 0);
        }
        pacer.start(0);
        let at: Vec<u64> = pacer.poll(100).iter().map(|d| d.at_ms).collect();
        assert_eq!(at, vec![33, 67, 100]);
    }
}
