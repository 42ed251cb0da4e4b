//! Hand-stepped clock for pacers.

use crate::pacer::{Delivery, Pacer};

/// Drives a [`Pacer`] on a manual millisecond clock and records every
/// delivery.
///
/// # Example
///
/// ```
/// use flowscope_core::testing::ManualScheduler;
/// use flowscope_core::FixedRatePacer;
/// use flowscope_proto::FixedRateOptions;
///
/// let pacer = FixedRatePacer::new(FixedRateOptions::new(50.0, 1)).unwrap();
/// let mut scheduler = ManualScheduler::new(pacer);
/// scheduler.push("a");
/// scheduler.push("b");
/// scheduler.start();
/// scheduler.advance_to(100);
/// assert_eq!(scheduler.shown_at(50), vec!["a"]);
/// assert_eq!(scheduler.shown_at(100), vec!["a", "b"]);
/// ```
#[derive(Debug)]
pub struct ManualScheduler<P> {
    pacer: P,
    now_ms: u64,
    deliveries: Vec<Delivery>,
}

impl<P: Pacer> ManualScheduler<P> {
    pub fn new(pacer: P) -> Self {
        Self {
            pacer,
            now_ms: 0,
            deliveries: Vec::new(),
        }
    }

    pub fn now(&self) -> u64 {
        self.now_ms
    }

    pub fn start(&mut self) {
        self.pacer.start(self.now_ms);
    }

    pub fn stop(&mut self) {
        self.pacer.stop();
    }

    /// Pushes a line at the current time.
    pub fn push(&mut self, line: impl Into<String>) {
        let shown = self.pacer.push(line.into(), self.now_ms);
        self.deliveries.extend(shown);
    }

    /// Moves the clock to `t_ms`, firing every deadline on the way in order.
    pub fn advance_to(&mut self, t_ms: u64) {
        while let Some(deadline) = self.pacer.next_deadline().filter(|&d| d <= t_ms) {
            self.now_ms = self.now_ms.max(deadline);
            let shown = self.pacer.poll(self.now_ms);
            if shown.is_empty() {
                break;
            }
            self.deliveries.extend(shown);
        }
        self.now_ms = self.now_ms.max(t_ms);
    }

    pub fn advance_by(&mut self, ms: u64) {
        self.advance_to(self.now_ms + ms);
    }

    /// Fires deadlines until the pacer has nothing left scheduled.
    pub fn run_until_idle(&mut self) {
        while let Some(deadline) = self.pacer.next_deadline() {
            let before = self.deliveries.len();
            self.advance_to(deadline);
            if self.deliveries.len() == before {
                break;
            }
        }
    }

    pub fn deliveries(&self) -> &[Delivery] {
        &self.deliveries
    }

    /// Every line shown at or before `t_ms`, in delivery order.
    pub fn shown_at(&self, t_ms: u64) -> Vec<&str> {
        self.deliveries
            .iter()
            .filter(|d| d.at_ms <= t_ms)
            .flat_map(|d| d.lines.iter().map(String::as_str))
            .collect()
    }

    pub fn pacer(&self) -> &P {
        &self.pacer
    }

    pub fn into_inner(self) -> P {
        self.pacer
    }
}
