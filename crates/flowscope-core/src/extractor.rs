//! Field extraction.
//!
//! Two rule tables run on every clean line, whichever role is active:
//! summary rules fill the four fixed slots of each role card, and context
//! rules maintain the facts that outlive a single activation (the post under
//! discussion, its feed score, the comments the Leader posted).

use flowscope_proto::{
    CommentKey, FlowContext, LeaderComment, PendingMultiline, Role, RoleCards, SUMMARY_SLOTS,
};
use std::sync::LazyLock;
use tracing::debug;

use crate::patterns::{PatternTable, group};
use crate::transcript::truncate;

/// Longest excerpt of a posted comment kept in the Leader summary.
const EXCERPT_CHARS: usize = 60;

#[derive(Debug, Clone, Copy)]
enum SummaryRule {
    /// Capture 1 written verbatim.
    Text { role: Role, slot: usize },
    /// Largest number seen in capture 1.
    Highest { role: Role, slot: usize },
    /// Analyst decision: needs intervention.
    Need,
    /// Analyst decision: urgency level.
    Urgency,
    /// Strategist style words, accumulated.
    Style,
    /// Leader picked a candidate.
    Selected,
    /// Leader posted a comment.
    Posted,
}

static SUMMARY_RULES: LazyLock<PatternTable<SummaryRule>> = LazyLock::new(|| {
    use SummaryRule::{Highest, Need, Posted, Selected, Style, Text, Urgency};
    PatternTable::new([
        (
            r"(?i)^needs intervention:\s*(yes|no|true|false|是|否)\b",
            Need,
        ),
        (r"(?i)^urgency level:\s*(\d+)", Urgency),
        (
            r"(?i)^extremity score:\s*(-?\d+(?:\.\d+)?)",
            Text {
                role: Role::Analyst,
                slot: 1,
            },
        ),
        (
            r"(?i)^sentiment score:\s*(-?\d+(?:\.\d+)?)",
            Text {
                role: Role::Analyst,
                slot: 2,
            },
        ),
        (
            r"(?i)^intervention reason:\s*(.+)$",
            Text {
                role: Role::Analyst,
                slot: 3,
            },
        ),
        (
            r"(?i)^selected strategy:\s*(.+)$",
            Text {
                role: Role::Strategist,
                slot: 0,
            },
        ),
        (r"(?i)^(?:tone|style):\s*(.+)$", Style),
        (
            r"(?i)^strategy confidence:\s*(\d+(?:\.\d+)?)",
            Text {
                role: Role::Strategist,
                slot: 2,
            },
        ),
        (
            r"(?i)^core argument:\s*(.+)$",
            Text {
                role: Role::Strategist,
                slot: 3,
            },
        ),
        (r"(?i)^selected candidate (\d+)", Selected),
        (
            r"(?i)^drafting candidate comment (\d+)",
            Highest {
                role: Role::Leader,
                slot: 1,
            },
        ),
        (
            r"(?i)^best candidate score:\s*(\d+(?:\.\d+)?)",
            Text {
                role: Role::Leader,
                slot: 2,
            },
        ),
        (r"(?i)^leader comment (\d+) on post (\S+):\s*(.*)$", Posted),
        (
            r"(?i)^activating (?:echo|amplifier) cluster with (\d+) agents",
            Text {
                role: Role::Amplifier,
                slot: 0,
            },
        ),
        (
            r"(?i)^total likes:\s*(\d+)",
            Text {
                role: Role::Amplifier,
                slot: 1,
            },
        ),
        (
            r"(?i)^(?:amplifier|echo) responses:\s*(\d+)",
            Text {
                role: Role::Amplifier,
                slot: 2,
            },
        ),
        (
            r"(?i)^effectiveness:\s*(.+)$",
            Text {
                role: Role::Amplifier,
                slot: 3,
            },
        ),
    ])
});

/// The Analyst's merged intervention decision.
///
/// Rendered into summary slot 0 and parsed back when a later line sets the
/// other half, so whichever fact arrived last is kept alongside the earlier
/// one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Decision {
    pub intervene: Option<bool>,
    pub urgency: Option<u32>,
}

impl Decision {
    pub fn parse(slot: &str) -> Self {
        let mut decision = Self::default();
        for part in slot.split(" · ") {
            let lower = part.trim().to_lowercase();
            if lower == "intervene" {
                decision.intervene = Some(true);
            } else if lower == "no intervention" {
                decision.intervene = Some(false);
            } else if let Some(level) = lower.strip_prefix("urgency ") {
                decision.urgency = level.trim().parse().ok();
            }
        }
        decision
    }

    pub fn render(&self) -> String {
        let verdict = self.intervene.map(|yes| {
            if yes { "Intervene" } else { "No intervention" }
        });
        match (verdict, self.urgency) {
            (Some(verdict), Some(level)) => format!("{verdict} · urgency {level}"),
            (Some(verdict), None) => verdict.to_string(),
            (None, Some(level)) => format!("Urgency {level}"),
            (None, None) => String::new(),
        }
    }
}

/// One derived summary write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotWrite {
    pub role: Role,
    pub slot: usize,
    pub value: String,
}

impl SlotWrite {
    fn new(role: Role, slot: usize, value: impl Into<String>) -> Self {
        Self {
            role,
            slot,
            value: value.into(),
        }
    }
}

fn merge_style(existing: &str, words: &str) -> String {
    let mut merged: Vec<String> = existing
        .split('/')
        .map(str::trim)
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect();
    for word in words
        .split([',', '/', '、', '，', ';'])
        .map(str::trim)
        .filter(|w| !w.is_empty())
    {
        if !merged.iter().any(|w| w.eq_ignore_ascii_case(word)) {
            merged.push(word.to_string());
        }
    }
    merged.join("/")
}

/// Derives the summary writes a message implies, given the current cards.
///
/// Pure: the cards are only read. Writes that would not change a slot are
/// omitted, so an empty result means the line carries no new summary fact.
pub fn summary_writes(cards: &RoleCards, message: &str) -> Vec<SlotWrite> {
    let mut writes = Vec::new();
    for (rule, caps) in SUMMARY_RULES.all_captures(message) {
        let first = group(&caps, 1);
        match *rule {
            SummaryRule::Text { role, slot } => {
                writes.push(SlotWrite::new(role, slot, first));
            }
            SummaryRule::Highest { role, slot } => {
                let current: u64 = cards.get(role).summary[slot].parse().unwrap_or(0);
                if let Ok(seen) = first.parse::<u64>() {
                    writes.push(SlotWrite::new(role, slot, current.max(seen).to_string()));
                }
            }
            SummaryRule::Need => {
                let mut decision = Decision::parse(&cards.analyst.summary[0]);
                decision.intervene = Some(matches!(
                    first.to_lowercase().as_str(),
                    "yes" | "true" | "是"
                ));
                writes.push(SlotWrite::new(Role::Analyst, 0, decision.render()));
            }
            SummaryRule::Urgency => {
                // An out-of-range level says nothing; keep what is known
                if let Ok(urgency) = first.parse() {
                    let mut decision = Decision::parse(&cards.analyst.summary[0]);
                    decision.urgency = Some(urgency);
                    writes.push(SlotWrite::new(Role::Analyst, 0, decision.render()));
                }
            }
            SummaryRule::Style => {
                let merged = merge_style(&cards.strategist.summary[1], first);
                writes.push(SlotWrite::new(Role::Strategist, 1, merged));
            }
            SummaryRule::Selected => {
                writes.push(SlotWrite::new(Role::Leader, 0, format!("Selected #{first}")));
            }
            SummaryRule::Posted => {
                writes.push(SlotWrite::new(Role::Leader, 0, format!("Posted #{first}")));
                let body = group(&caps, 3);
                if !body.is_empty() {
                    writes.push(SlotWrite::new(
                        Role::Leader,
                        3,
                        truncate(body, EXCERPT_CHARS),
                    ));
                }
            }
        }
    }
    writes.retain(|w| w.slot < SUMMARY_SLOTS && !w.value.is_empty());
    writes.retain(|w| cards.get(w.role).summary[w.slot] != w.value);
    writes
}

/// Applies the summary rules to the cards. Returns true if a slot changed.
pub fn apply_summary_rules(cards: &mut RoleCards, message: &str) -> bool {
    let writes = summary_writes(cards, message);
    let changed = !writes.is_empty();
    for write in writes {
        cards.get_mut(write.role).summary[write.slot] = write.value;
    }
    changed
}

#[derive(Debug, Clone, Copy)]
enum ContextRule {
    PostContent,
    FeedScore,
    LeaderComment,
}

static CONTEXT_RULES: LazyLock<PatternTable<ContextRule>> = LazyLock::new(|| {
    PatternTable::new([
        (r"(?i)^post content:\s*(.*)$", ContextRule::PostContent),
        (r"(?i)^feed score:\s*(-?\d+(?:\.\d+)?)", ContextRule::FeedScore),
        (
            r"(?i)^leader comment (\d+) on post (\S+):\s*(.*)$",
            ContextRule::LeaderComment,
        ),
    ])
});

/// Applies the context rules. Returns true if the context changed.
///
/// Post content and leader comments may continue on unprefixed lines, so
/// matching either opens a continuation session in `context.pending`.
pub fn apply_context_rules(context: &mut FlowContext, message: &str) -> bool {
    let Some((rule, caps)) = CONTEXT_RULES.captures(message) else {
        return false;
    };
    let before = (
        context.post_content.clone(),
        context.feed_score,
        context.leader_comments.len(),
        context.pending.clone(),
    );

    match rule {
        ContextRule::PostContent => {
            context.post_content = Some(group(&caps, 1).to_string());
            context.pending = PendingMultiline::PostContent;
        }
        ContextRule::FeedScore => {
            if let Ok(score) = group(&caps, 1).parse::<f64>() {
                context.feed_score = Some(score);
            }
        }
        ContextRule::LeaderComment => {
            let Ok(ordinal) = group(&caps, 1).parse::<u32>() else {
                return false;
            };
            let key = CommentKey::new(group(&caps, 2), ordinal);
            if context.comment_keys.contains(&key) {
                debug!(post_id = %key.post_id, ordinal, "Ignoring replayed leader comment");
                context.pending = PendingMultiline::ReplayedComment;
            } else {
                context.comment_keys.insert(key.clone());
                context.leader_comments.push(LeaderComment {
                    key: key.clone(),
                    body: group(&caps, 3).to_string(),
                });
                context.pending = PendingMultiline::LeaderComment(key);
            }
        }
    }

    before
        != (
            context.post_content.clone(),
            context.feed_score,
            context.leader_comments.len(),
            context.pending.clone(),
        )
}

/// Appends an unprefixed continuation line to the pending field.
///
/// Returns true if a stored field changed; replayed comments swallow their
/// continuation lines without changing anything.
pub fn absorb_continuation(context: &mut FlowContext, message: &str) -> bool {
    match context.pending.clone() {
        PendingMultiline::None | PendingMultiline::ReplayedComment => false,
        PendingMultiline::PostContent => {
            join_line(context.post_content.get_or_insert_with(String::new), message);
            true
        }
        PendingMultiline::LeaderComment(key) => match context.comment_mut(&key) {
            Some(comment) => {
                join_line(&mut comment.body, message);
                true
            }
            None => false,
        },
    }
}

fn join_line(field: &mut String, line: &str) {
    if !field.is_empty() {
        field.push('\n');
    }
    field.push_str(line);
}
