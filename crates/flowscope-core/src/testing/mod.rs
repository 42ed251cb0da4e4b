//! Testing utilities for deterministic flow and pacer tests.

pub mod log_builder;
pub mod manual_scheduler;
pub mod scenario;

pub use log_builder::LogBuilder;
pub use manual_scheduler::ManualScheduler;
pub use scenario::{ExecutionTrace, Scenario, ScenarioRunner};
