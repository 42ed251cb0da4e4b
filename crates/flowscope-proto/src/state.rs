//! The flow state snapshot produced by the reducer.
//!
//! A `FlowState` is the only value threaded through line processing. Consumers
//! treat it as read-only and re-render whenever the reducer hands back a new
//! snapshot.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::{Role, RoleStatus};

/// Number of fixed summary slots on every role card.
pub const SUMMARY_SLOTS: usize = 4;

/// Progress through a role's canonical stage list.
///
/// `current` may move backwards when the backend emits steps out of logical
/// order; `max` never decreases within a round.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StageProgress {
    pub current: Option<usize>,
    pub max: Option<usize>,
    /// Distinct stage indices in first-seen order.
    pub order: Vec<usize>,
}

impl StageProgress {
    /// Progress that has already observed `index`.
    pub fn seeded(index: usize) -> Self {
        let mut progress = Self::default();
        progress.record(index);
        progress
    }

    /// Records an observed stage index. Returns true if `current` changed.
    pub fn record(&mut self, index: usize) -> bool {
        let changed = self.current != Some(index);
        self.current = Some(index);
        self.max = Some(self.max.map_or(index, |max| max.max(index)));
        if !self.order.contains(&index) {
            self.order.push(index);
        }
        changed
    }
}

/// Display state for one role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleCardState {
    pub status: RoleStatus,
    /// Stable-position facts; an empty string means unknown.
    pub summary: [String; SUMMARY_SLOTS],
    pub stage: StageProgress,
    /// Rolling transcript while the role is active.
    pub during: Vec<String>,
    /// Transcript tail frozen when the role last lost focus.
    pub after: Option<Vec<String>>,
}

/// One card per fixed role.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RoleCards {
    pub analyst: RoleCardState,
    pub strategist: RoleCardState,
    pub leader: RoleCardState,
    pub amplifier: RoleCardState,
}

impl RoleCards {
    pub fn get(&self, role: Role) -> &RoleCardState {
        match role {
            Role::Analyst => &self.analyst,
            Role::Strategist => &self.strategist,
            Role::Leader => &self.leader,
            Role::Amplifier => &self.amplifier,
        }
    }

    pub fn get_mut(&mut self, role: Role) -> &mut RoleCardState {
        match role {
            Role::Analyst => &mut self.analyst,
            Role::Strategist => &mut self.strategist,
            Role::Leader => &mut self.leader,
            Role::Amplifier => &mut self.amplifier,
        }
    }

    /// Iterates cards in priority order.
    pub fn iter(&self) -> impl Iterator<Item = (Role, &RoleCardState)> {
        Role::ALL.into_iter().map(move |role| (role, self.get(role)))
    }
}

/// De-duplication key of a posted leader comment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CommentKey {
    pub post_id: String,
    pub ordinal: u32,
}

impl CommentKey {
    pub fn new(post_id: impl Into<String>, ordinal: u32) -> Self {
        Self {
            post_id: post_id.into(),
            ordinal,
        }
    }
}

/// A comment body posted by the Leader role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderComment {
    pub key: CommentKey,
    pub body: String,
}

/// Which context field is absorbing unprefixed continuation lines.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum PendingMultiline {
    #[default]
    None,
    PostContent,
    LeaderComment(CommentKey),
    /// A replayed comment whose continuation lines are swallowed unchanged.
    ReplayedComment,
}

impl PendingMultiline {
    pub fn is_open(&self) -> bool {
        !matches!(self, PendingMultiline::None)
    }
}

/// Long-lived facts that outlive individual role activations.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowContext {
    pub post_content: Option<String>,
    pub feed_score: Option<f64>,
    pub leader_comments: Vec<LeaderComment>,
    pub comment_keys: BTreeSet<CommentKey>,
    pub pending: PendingMultiline,
}

impl FlowContext {
    /// Looks up a stored comment by key.
    pub fn comment_mut(&mut self, key: &CommentKey) -> Option<&mut LeaderComment> {
        self.leader_comments.iter_mut().find(|c| &c.key == key)
    }
}

/// Categories of infrastructure noise counted but never routed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseCategory {
    Http,
    Cache,
    Retry,
    Tokens,
}

/// The full display-ready state of one monitoring session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FlowState {
    pub active_role: Option<Role>,
    pub amplifier_sticky: bool,
    pub roles: RoleCards,
    pub context: FlowContext,
    pub noise_counters: BTreeMap<NoiseCategory, u64>,
}

impl FlowState {
    /// State at session start: nothing active, everything unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// State at the start of a workflow round.
    ///
    /// The Analyst is claimed immediately and seeded at its first stage so
    /// lines emitted before the first per-role anchor are kept.
    pub fn new_round() -> Self {
        let mut state = Self::default();
        state.active_role = Some(Role::Analyst);
        let analyst = state.roles.get_mut(Role::Analyst);
        analyst.status = RoleStatus::Running;
        analyst.stage = StageProgress::seeded(0);
        state
    }

    pub fn role(&self, role: Role) -> &RoleCardState {
        self.roles.get(role)
    }

    pub fn role_mut(&mut self, role: Role) -> &mut RoleCardState {
        self.roles.get_mut(role)
    }

    /// Total noise lines filtered so far.
    pub fn noise_total(&self) -> u64 {
        self.noise_counters.values().sum()
    }
}
