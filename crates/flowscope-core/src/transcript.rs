//! Transcript management.
//!
//! Lines shown on a role card go through compaction first: pure plumbing is
//! dropped, the retired "echo" vocabulary and phase-header codes are
//! rewritten, and well-known milestones collapse to one fixed phrase so the
//! backend's "in progress" and "completed" variants of the same step do not
//! show up twice.

use flowscope_proto::{RoleCardState, RoleStatus};
use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

use crate::patterns::{PatternSet, PatternTable, regex};

static DROPPED: LazyLock<PatternSet> = LazyLock::new(|| {
    PatternSet::set([
        r"^[-=*_~#]{3,}$",
        r"(?i)^(?:allocated|assigned) (?:agent )?id\b",
        r"(?i)^[\w ]+:\s*unknown$",
    ])
});

static ECHO_NAMING: LazyLock<Regex> = LazyLock::new(|| regex(r"\b([Ee])cho (cluster|agent)"));

static PHASE_HEADER: LazyLock<Regex> = LazyLock::new(|| regex(r"^\[P([1-5])\]\s*"));

static MILESTONES: LazyLock<PatternTable<&'static str>> = LazyLock::new(|| {
    PatternTable::new([
        (
            r"(?i)^starting (?:new )?workflow round.*$",
            "New workflow round started",
        ),
        (r"(?i)^analy[sz]ing post content.*$", "Reading the post"),
        (r"(?i)^sampl(?:ing|ed) (\d+) comments.*$", "Sampled $1 comments"),
        (
            r"(?i)^extremity analysis (?:started|in progress|running|completed|done).*$",
            "Extremity analysis",
        ),
        (
            r"(?i)^sentiment analysis (?:started|in progress|running|completed|done).*$",
            "Sentiment analysis",
        ),
        (
            r"(?i)^generating intervention strategy.*$",
            "Drafting intervention strategy",
        ),
        (
            r"(?i)^activating amplifier cluster.*$",
            "Amplifier cluster activated",
        ),
        (
            r"(?i)^starting effectiveness monitoring.*$",
            "Monitoring intervention effect",
        ),
    ])
});

fn phase_label(code: &str) -> &'static str {
    match code {
        "1" => "Analysis",
        "2" => "Strategy",
        "3" => "Leader comments",
        "4" => "Amplification",
        _ => "Monitoring",
    }
}

/// Rewrites a clean message for display.
///
/// Returns `None` for lines that carry no information for a reader.
pub fn compact(message: &str, max_chars: Option<usize>) -> Option<String> {
    let message = message.trim_end();
    if message.is_empty() || DROPPED.is_match(message) {
        trace!(line = message, "Dropped plumbing line");
        return None;
    }

    let renamed = ECHO_NAMING.replace_all(message, |caps: &Captures<'_>| {
        let amplifier = if &caps[1] == "E" { "Amplifier" } else { "amplifier" };
        format!("{amplifier} {}", &caps[2])
    });

    let labeled = match PHASE_HEADER.captures(&renamed) {
        Some(caps) => {
            let rest = &renamed[caps.get(0).map_or(0, |m| m.end())..];
            let label = phase_label(&caps[1]);
            if rest.is_empty() {
                format!("[{label}]")
            } else {
                format!("[{label}] {rest}")
            }
        }
        None => renamed.into_owned(),
    };

    if let Some((template, caps)) = MILESTONES.captures(&labeled) {
        let mut phrase = String::new();
        caps.expand(template, &mut phrase);
        return Some(phrase);
    }

    Some(match max_chars {
        Some(max) => truncate(&labeled, max),
        None => labeled,
    })
}

/// Truncates a string to approximately `max_len` characters, adding "..." if truncated.
///
/// Uses `char_indices` to find a valid UTF-8 boundary, ensuring we never slice
/// in the middle of a multi-byte character.
pub(crate) fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let byte_idx = s
            .char_indices()
            .nth(max_len)
            .map_or(s.len(), |(idx, _)| idx);
        format!("{}...", &s[..byte_idx])
    }
}

/// Appends a display line to a rolling transcript.
///
/// Lines already present anywhere in the buffer are dropped; the oldest
/// entries roll off beyond `capacity`. Returns true if the buffer changed.
pub fn append(during: &mut Vec<String>, line: String, capacity: usize) -> bool {
    if during.last() == Some(&line) || during.contains(&line) {
        return false;
    }
    during.push(line);
    if during.len() > capacity {
        let overflow = during.len() - capacity;
        during.drain(..overflow);
    }
    true
}

/// Freezes a card that is losing focus.
///
/// The tail of `during` (at most `after_capacity` lines) becomes `after`, the
/// status becomes `Done` and `during` is emptied for the next activation.
pub fn freeze_after(card: &mut RoleCardState, after_capacity: usize) {
    let during = std::mem::take(&mut card.during);
    let skip = during.len().saturating_sub(after_capacity);
    card.after = Some(during.into_iter().skip(skip).collect());
    card.status = RoleStatus::Done;
}
