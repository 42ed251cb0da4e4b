//! # flowscope-proto
//!
//! Shared types and error definitions for the flowscope workspace.
//!
//! This crate provides the foundational abstractions used across all flowscope
//! crates, including:
//! - The four workflow roles and their card status
//! - The `FlowState` snapshot produced by the line reducer
//! - Snapshot diffing into `FlowUpdate` events
//! - Render pacer options and their eager validation
//! - Common error types

mod error;
mod pacer;
mod role;
mod state;
mod update;

pub use error::{Error, PacerError, Result};
pub use pacer::{FixedRateOptions, SmoothedOptions};
pub use role::{Role, RoleStatus};
pub use state::{
    CommentKey, FlowContext, FlowState, LeaderComment, NoiseCategory, PendingMultiline,
    RoleCardState, RoleCards, SUMMARY_SLOTS, StageProgress,
};
pub use update::FlowUpdate;
