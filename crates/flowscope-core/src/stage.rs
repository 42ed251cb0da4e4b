//! Stage tracking.
//!
//! Each role walks a fixed list of named stages. The backend does not emit
//! steps in a guaranteed order, so a line may map to an earlier index than
//! the line before it; `StageProgress` keeps the max monotonic regardless.

use flowscope_proto::Role;
use std::sync::LazyLock;

use crate::patterns::PatternTable;

const ANALYST_STAGES: &[&str] = &[
    "Content intake",
    "Comment sampling",
    "Extremity scoring",
    "Sentiment analysis",
    "Intervention decision",
    "Effect monitoring",
];

const STRATEGIST_STAGES: &[&str] = &[
    "Situation review",
    "Strategy search",
    "Style selection",
    "Plan finalized",
];

const LEADER_STAGES: &[&str] = &["Drafting", "Candidate scoring", "Selection", "Posting"];

const AMPLIFIER_STAGES: &[&str] = &[
    "Cluster activation",
    "Agent fan-out",
    "Engagement",
    "Effect check",
];

static ANALYST: LazyLock<PatternTable<usize>> = LazyLock::new(|| {
    PatternTable::new([
        (r"(?i)^(?:analy[sz]ing post content|post content:)", 0),
        (r"(?i)^sampl(?:ing|ed) \d+ comments", 1),
        (r"(?i)^extremity (?:analysis|score)", 2),
        (r"(?i)^sentiment (?:analysis|score)", 3),
        (r"(?i)^(?:needs intervention|urgency level|intervention reason):", 4),
        (
            r"(?i)^(?:starting effectiveness monitoring|monitoring round \d+)|^\[Monitor\]",
            5,
        ),
    ])
});

static STRATEGIST: LazyLock<PatternTable<usize>> = LazyLock::new(|| {
    PatternTable::new([
        (
            r"(?i)^(?:strategist (?:is )?(?:planning|developing)|generating intervention strategy|reviewing (?:analysis|situation))",
            0,
        ),
        (r"(?i)^(?:evaluating strategy candidates?|candidate strategy \d+)", 1),
        (r"(?i)^(?:tone|style):", 2),
        (r"(?i)^(?:selected strategy|strategy confidence|core argument):", 3),
    ])
});

static LEADER: LazyLock<PatternTable<usize>> = LazyLock::new(|| {
    PatternTable::new([
        (
            r"(?i)^(?:leader (?:is )?(?:drafting|generating|writing)|drafting candidate comment)",
            0,
        ),
        (r"(?i)^candidate \d+ score:", 1),
        (r"(?i)^(?:selected candidate \d+|best candidate score:)", 2),
        (r"(?i)^leader comment \d+ on post", 3),
    ])
});

static AMPLIFIER: LazyLock<PatternTable<usize>> = LazyLock::new(|| {
    PatternTable::new([
        (r"(?i)^activating (?:echo|amplifier) cluster", 0),
        (r"(?i)^(?:echo|amplifier) agent \d+ (?:joined|spawned|ready)", 1),
        (r"(?i)^(?:echo|amplifier) agent \d+ (?:liked|responded|reposted)", 2),
        (r"(?i)^(?:amplification (?:complete|summary)|total likes:)", 3),
    ])
});

/// Canonical stage names of a role, in index order.
pub fn stage_names(role: Role) -> &'static [&'static str] {
    match role {
        Role::Analyst => ANALYST_STAGES,
        Role::Strategist => STRATEGIST_STAGES,
        Role::Leader => LEADER_STAGES,
        Role::Amplifier => AMPLIFIER_STAGES,
    }
}

/// Name of a stage index, if it exists for the role.
pub fn stage_name(role: Role, index: usize) -> Option<&'static str> {
    stage_names(role).get(index).copied()
}

/// Stage index a message signals for `role`.
pub fn stage_index(role: Role, message: &str) -> Option<usize> {
    let table: &PatternTable<usize> = match role {
        Role::Analyst => &ANALYST,
        Role::Strategist => &STRATEGIST,
        Role::Leader => &LEADER,
        Role::Amplifier => &AMPLIFIER,
    };
    table.first(message).copied()
}
