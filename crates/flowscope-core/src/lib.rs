//! # flowscope-core
//!
//! Core line processing for flowscope.
//!
//! This crate provides:
//! - The line reducer turning raw workflow log lines into `FlowState` snapshots
//! - Role classification, field extraction, stage tracking and transcript compaction
//! - Configuration loading and validation
//! - Fixed-rate and timestamp-smoothed render pacers with a tokio driver
//! - Replay and tail line sources

pub mod classifier;
mod config;
pub mod extractor;
pub mod normalizer;
pub mod pacer;
mod patterns;
mod reducer;
mod source;
pub mod stage;
pub mod testing;
pub mod transcript;

pub use config::{
    ConfigError, ConfigWarning, FlowConfig, PacerConfig, PacerMode, RoleLimits, TranscriptPolicy,
};
pub use normalizer::{NormalizedLine, TransportStatus, normalize};
pub use pacer::{
    DelayOverride, Delivery, FixedRatePacer, Pacer, PacerDriver, PacerHandle, SmoothedPacer,
};
pub use reducer::{FlowReducer, FlowSession};
pub use source::{
    LineSource, ReplayRecords, ReplaySource, StopSignal, TailReader, TailSource, TimedLine,
};
