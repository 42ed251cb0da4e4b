//! Role classification.
//!
//! Backend lines carry no explicit role tag, so routing relies on anchor
//! patterns. While the Amplifier cluster is fanning out, its agents repost
//! lines that read like Leader activity ("Leader comment 2 on post p-7");
//! sticky mode pins every line to the Amplifier until a monitoring anchor
//! shows the workflow has moved on.

use flowscope_proto::Role;
use std::sync::LazyLock;

use crate::patterns::PatternSet;

const MONITORING_ANCHORS: [&str; 3] = [
    r"(?i)^starting effectiveness monitoring",
    r"(?i)^monitoring round \d+",
    r"^\[Monitor\]",
];

const CLUSTER_ACTIVATION: &str = r"(?i)^activating (?:echo|amplifier) cluster";

static ANALYST: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::set(
        [
            r"^\[Analyst\]",
            r"(?i)^analyst (?:is )?analy[sz]ing",
            r"(?i)^analy[sz]ing post content",
        ]
        .into_iter()
        .chain(MONITORING_ANCHORS),
    )
});

static STRATEGIST: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::set([
        r"^\[Strategist\]",
        r"(?i)^strategist (?:is )?(?:planning|developing)",
        r"(?i)^generating intervention strategy",
    ])
});

static LEADER: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::set([
        r"^\[Leader\]",
        r"(?i)^leader (?:is )?(?:drafting|generating|writing)",
        r"(?i)\bleader comment \d+ on post\b",
    ])
});

static AMPLIFIER: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::set([
        r"^\[Amplifier\]",
        CLUSTER_ACTIVATION,
        r"(?i)^(?:echo|amplifier) agent \d+\b",
    ])
});

static MONITORING: LazyLock<PatternSet> = LazyLock::new(|| PatternSet::set(MONITORING_ANCHORS));

static ACTIVATION: LazyLock<PatternSet> = LazyLock::new(|| PatternSet::set([CLUSTER_ACTIVATION]));

fn anchors(role: Role) -> &'static PatternSet {
    match role {
        Role::Analyst => &ANALYST,
        Role::Strategist => &STRATEGIST,
        Role::Leader => &LEADER,
        Role::Amplifier => &AMPLIFIER,
    }
}

/// First role, in priority order, whose anchors match the message.
pub fn anchored_role(message: &str) -> Option<Role> {
    Role::ALL
        .into_iter()
        .find(|&role| anchors(role).is_match(message))
}

/// True for lines that mark the start of effect monitoring.
pub fn is_monitoring_anchor(message: &str) -> bool {
    MONITORING.is_match(message)
}

/// True for lines that activate the amplifier cluster.
pub fn is_cluster_activation(message: &str) -> bool {
    ACTIVATION.is_match(message)
}

/// Outcome of routing one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Routing {
    /// Role that receives the line, if any.
    pub receiver: Option<Role>,
    /// Sticky flag after this line.
    pub sticky: bool,
}

/// Routes a message given the currently active role and sticky flag.
pub fn route(active: Option<Role>, sticky: bool, message: &str) -> Routing {
    let mut sticky = sticky;
    if sticky && is_monitoring_anchor(message) {
        sticky = false;
    }

    let target = if sticky {
        Some(Role::Amplifier)
    } else {
        anchored_role(message)
    };

    if is_cluster_activation(message) {
        sticky = true;
    }

    Routing {
        receiver: target.or(active),
        sticky,
    }
}
