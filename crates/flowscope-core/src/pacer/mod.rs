//! Render pacers.
//!
//! A pacer decides *when* lines that are already available get shown. Both
//! disciplines are sans-IO state machines driven by an explicit millisecond
//! clock: callers push lines, ask for the next deadline, and poll once that
//! deadline has passed. [`PacerDriver`] runs a pacer on tokio's clock;
//! [`crate::testing::ManualScheduler`] steps one by hand.

mod driver;
mod fixed_rate;
mod smoothed;

pub use driver::{PacerDriver, PacerHandle};
pub use fixed_rate::FixedRatePacer;
pub use smoothed::{DelayOverride, MAX_OVERRIDE_DELAY_MS, SmoothedPacer};

use flowscope_proto::PacerError;

use crate::config::{PacerConfig, PacerMode};

/// Lines shown together at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    /// Clock time the batch was due, in milliseconds.
    pub at_ms: u64,
    pub lines: Vec<String>,
}

impl Delivery {
    pub fn new(at_ms: u64, lines: Vec<String>) -> Self {
        Self { at_ms, lines }
    }
}

/// A queue discipline deciding when buffered lines are shown.
///
/// Lines pushed before [`Pacer::start`] are buffered and paced from the
/// start time on.
pub trait Pacer: Send {
    /// Starts pacing at `now_ms`. Starting a running pacer does nothing.
    fn start(&mut self, now_ms: u64);

    /// Stops pacing and discards every undelivered line.
    fn stop(&mut self);

    /// Queues a line. Returns what becomes visible immediately, if anything.
    fn push(&mut self, line: String, now_ms: u64) -> Vec<Delivery>;

    /// Delivers everything due at or before `now_ms`, in order.
    fn poll(&mut self, now_ms: u64) -> Vec<Delivery>;

    /// Clock time at which [`Pacer::poll`] next has something to deliver.
    fn next_deadline(&self) -> Option<u64>;

    /// Lines buffered and not yet delivered.
    fn pending(&self) -> usize;

    fn is_running(&self) -> bool;
}

impl<P: Pacer + ?Sized> Pacer for Box<P> {
    fn start(&mut self, now_ms: u64) {
        (**self).start(now_ms);
    }

    fn stop(&mut self) {
        (**self).stop();
    }

    fn push(&mut self, line: String, now_ms: u64) -> Vec<Delivery> {
        (**self).push(line, now_ms)
    }

    fn poll(&mut self, now_ms: u64) -> Vec<Delivery> {
        (**self).poll(now_ms)
    }

    fn next_deadline(&self) -> Option<u64> {
        (**self).next_deadline()
    }

    fn pending(&self) -> usize {
        (**self).pending()
    }

    fn is_running(&self) -> bool {
        (**self).is_running()
    }
}

/// Builds the pacer selected by `config`, or `None` when pacing is off.
pub fn from_config(config: &PacerConfig) -> Result<Option<Box<dyn Pacer>>, PacerError> {
    Ok(match config.mode {
        PacerMode::Off => None,
        PacerMode::Fixed => Some(Box::new(FixedRatePacer::new(config.fixed)?)),
        PacerMode::Smoothed => Some(Box::new(SmoothedPacer::new(config.smoothed)?)),
    })
}
