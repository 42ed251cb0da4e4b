//! Scripted log scenarios run through a flow session.

use flowscope_proto::{FlowState, FlowUpdate};
use std::sync::Arc;

use crate::config::TranscriptPolicy;
use crate::reducer::FlowSession;

/// A named sequence of raw lines.
#[derive(Debug, Clone)]
pub struct Scenario {
    pub name: String,
    pub lines: Vec<String>,
    pub policy: TranscriptPolicy,
}

impl Scenario {
    /// Creates a new scenario.
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
            policy: TranscriptPolicy::default(),
        }
    }

    /// Sets the transcript policy.
    pub fn with_policy(mut self, policy: TranscriptPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Simulates a transport reconnect after the first `at` lines: a status
    /// line, then the last `replayed` lines delivered again.
    pub fn with_reconnect(mut self, at: usize, replayed: usize) -> Self {
        let at = at.min(self.lines.len());
        let start = at.saturating_sub(replayed);
        let mut lines = self.lines[..at].to_vec();
        lines.push("INFO: stream reconnected".to_string());
        lines.extend_from_slice(&self.lines[start..at]);
        lines.extend_from_slice(&self.lines[at..]);
        self.lines = lines;
        self
    }
}

/// Executes scenarios line by line.
#[derive(Debug, Default)]
pub struct ScenarioRunner;

impl ScenarioRunner {
    pub fn new() -> Self {
        Self
    }

    /// Runs a scenario and returns the trace.
    pub fn run(&self, scenario: &Scenario) -> ExecutionTrace {
        let mut session = FlowSession::new(scenario.policy.clone());
        let mut updates = Vec::new();
        let mut changed_lines = 0;
        let mut snapshots = Vec::with_capacity(scenario.lines.len());

        for line in &scenario.lines {
            let before = Arc::clone(session.state());
            updates.extend(session.feed_updates(line));
            if !Arc::ptr_eq(&before, session.state()) {
                changed_lines += 1;
            }
            snapshots.push(Arc::clone(session.state()));
        }

        ExecutionTrace {
            name: scenario.name.clone(),
            updates,
            changed_lines,
            snapshots,
        }
    }
}

/// Trace of a scenario execution.
#[derive(Debug)]
pub struct ExecutionTrace {
    pub name: String,
    pub updates: Vec<FlowUpdate>,
    /// Lines that produced a new snapshot.
    pub changed_lines: usize,
    /// Snapshot after each line.
    pub snapshots: Vec<Arc<FlowState>>,
}

impl ExecutionTrace {
    pub fn final_state(&self) -> Option<&FlowState> {
        self.snapshots.last().map(Arc::as_ref)
    }
}
