//! The line reducer.
//!
//! [`FlowReducer::process`] is the only way a [`FlowState`] changes. It runs
//! one raw line through normalization, continuation handling, extraction,
//! routing, stage tracking and transcript compaction, and hands back either
//! a new snapshot or the very same `Arc` when the line changed nothing.

use flowscope_proto::{FlowState, FlowUpdate, NoiseCategory, PendingMultiline, Role, RoleStatus};
use std::sync::{Arc, LazyLock};
use tracing::debug;

use crate::classifier;
use crate::config::TranscriptPolicy;
use crate::extractor;
use crate::normalizer::normalize;
use crate::patterns::{PatternSet, PatternTable};
use crate::stage;
use crate::transcript;

static NEW_ROUND: LazyLock<PatternSet> =
    LazyLock::new(|| PatternSet::set([r"(?i)^starting (?:new )?workflow round"]));

static NOISE: LazyLock<PatternTable<NoiseCategory>> = LazyLock::new(|| {
    PatternTable::new([
        (r"^HTTP Request:", NoiseCategory::Http),
        (r"(?i)^(?:\[cache\]\s*)?cache hit\b", NoiseCategory::Cache),
        (r"(?i)^retrying\b", NoiseCategory::Retry),
        (r"(?i)^token usage:", NoiseCategory::Tokens),
    ])
});

/// Pure line reducer, parameterized by the transcript policy.
#[derive(Debug, Clone, Default)]
pub struct FlowReducer {
    policy: TranscriptPolicy,
}

impl FlowReducer {
    pub fn new(policy: TranscriptPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &TranscriptPolicy {
        &self.policy
    }

    /// Applies one raw line to `state`.
    ///
    /// Returns `state` itself (same allocation) when the line has no visible
    /// effect, so callers can detect change with [`Arc::ptr_eq`].
    pub fn process(&self, state: &Arc<FlowState>, raw: &str) -> Arc<FlowState> {
        let mut next = FlowState::clone(state);
        self.apply(&mut next, raw);
        if next == **state {
            Arc::clone(state)
        } else {
            Arc::new(next)
        }
    }

    fn apply(&self, state: &mut FlowState, raw: &str) {
        let line = normalize(raw);
        if line.is_empty() {
            return;
        }
        let message = line.message.as_str();

        if state.context.pending.is_open() {
            if line.ends_continuation() {
                state.context.pending = PendingMultiline::None;
            } else {
                extractor::absorb_continuation(&mut state.context, message);
                return;
            }
        }

        if NEW_ROUND.is_match(message) {
            debug!(line = message, "New workflow round, resetting flow state");
            *state = FlowState::new_round();
            let limits = self.policy.limits(Role::Analyst);
            if let Some(display) = transcript::compact(message, self.policy.max_line_chars) {
                transcript::append(&mut state.roles.analyst.during, display, limits.capacity);
            }
            return;
        }

        // Extraction sees every line; noise only stays out of routing and transcripts
        extractor::apply_context_rules(&mut state.context, message);
        extractor::apply_summary_rules(&mut state.roles, message);

        if let Some(category) = NOISE.first(message) {
            *state.noise_counters.entry(*category).or_insert(0) += 1;
            return;
        }

        let routing = classifier::route(state.active_role, state.amplifier_sticky, message);
        if routing.sticky != state.amplifier_sticky {
            debug!(sticky = routing.sticky, line = message, "Amplifier sticky mode changed");
            state.amplifier_sticky = routing.sticky;
        }
        let Some(receiver) = routing.receiver else {
            return;
        };

        if state.active_role != Some(receiver) {
            if let Some(outgoing) = state.active_role {
                let after_capacity = self.policy.limits(outgoing).after_capacity;
                transcript::freeze_after(state.role_mut(outgoing), after_capacity);
            }
            debug!(from = ?state.active_role, to = %receiver, "Role switch");
            state.active_role = Some(receiver);
            state.role_mut(receiver).status = RoleStatus::Running;
        }

        let limits = self.policy.limits(receiver);
        let card = state.role_mut(receiver);

        if let Some(index) = stage::stage_index(receiver, message) {
            if card.stage.record(index) {
                debug!(
                    role = %receiver,
                    stage = stage::stage_name(receiver, index).unwrap_or("?"),
                    "Stage changed"
                );
                if limits.clear_on_stage_change {
                    card.during.clear();
                }
            }
        }

        if line.is_error() {
            card.status = RoleStatus::Error;
        }

        if let Some(display) = transcript::compact(message, self.policy.max_line_chars) {
            transcript::append(&mut card.during, display, limits.capacity);
        }
    }
}

/// A reducer paired with the current snapshot of one monitoring session.
#[derive(Debug, Clone, Default)]
pub struct FlowSession {
    reducer: FlowReducer,
    state: Arc<FlowState>,
}

impl FlowSession {
    pub fn new(policy: TranscriptPolicy) -> Self {
        Self {
            reducer: FlowReducer::new(policy),
            state: Arc::new(FlowState::new()),
        }
    }

    /// Current snapshot.
    pub fn state(&self) -> &Arc<FlowState> {
        &self.state
    }

    /// Feeds one line. Returns true if the snapshot changed.
    pub fn feed(&mut self, raw: &str) -> bool {
        let next = self.reducer.process(&self.state, raw);
        let changed = !Arc::ptr_eq(&next, &self.state);
        self.state = next;
        changed
    }

    /// Feeds one line and reports what changed.
    pub fn feed_updates(&mut self, raw: &str) -> Vec<FlowUpdate> {
        let prev = Arc::clone(&self.state);
        if self.feed(raw) {
            FlowUpdate::between(&prev, &self.state)
        } else {
            Vec::new()
        }
    }

    /// Feeds every line in order. Returns the number that changed the snapshot.
    pub fn feed_all<'a>(&mut self, lines: impl IntoIterator<Item = &'a str>) -> usize {
        lines.into_iter().filter(|line| self.feed(line)).count()
    }

    /// Drops all state, as at session start.
    pub fn reset(&mut self) {
        self.state = Arc::new(FlowState::new());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: &str = "2025-03-14 09:26:53,589 - INFO - ";

    fn line(message: &str) -> String {
        format!("{TS}{message}")
    }

    fn session() -> FlowSession {
        FlowSession::new(TranscriptPolicy::default())
    }

    #[test]
    fn unchanged_state_keeps_the_same_arc() {
        let reducer = FlowReducer::default();
        let state = Arc::new(FlowState::new());
        let next = reducer.process(&state, "");
        assert!(Arc::ptr_eq(&state, &next));

        // Anchor-less line before any role is active
        let next = reducer.process(&state, &line("some preamble"));
        assert!(Arc::ptr_eq(&state, &next));
    }

    #[test]
    fn first_anchor_starts_a_role() {
        let mut session = session();
        assert!(session.feed(&line("[Strategist] reviewing the analysis")));
        let state = session.state();
        assert_eq!(state.active_role, Some(Role::Strategist));
        assert_eq!(state.role(Role::Strategist).status, RoleStatus::Running);
        assert_eq!(
            state.role(Role::Strategist).during,
            vec!["[Strategist] reviewing the analysis"]
        );
    }

    #[test]
    fn new_round_resets_and_claims_analyst() {
        let mut session = session();
        session.feed(&line("Leader is drafting comments"));
        session.feed(&line("Starting new workflow round 2"));
        let state = session.state();
        assert_eq!(state.active_role, Some(Role::Analyst));
        assert_eq!(state.role(Role::Leader).status, RoleStatus::Idle);
        assert_eq!(state.role(Role::Analyst).during, vec!["New workflow round started"]);
        assert_eq!(state.role(Role::Analyst).stage.current, Some(0));
    }

    #[test]
    fn noise_is_counted_not_routed() {
        let mut session = session();
        session.feed(&line("[Analyst] reading"));
        assert!(session.feed(&line("HTTP Request: POST https://api/v1 \"200 OK\"")));
        assert!(session.feed(&line("Token usage: 512")));
        let state = session.state();
        assert_eq!(state.noise_total(), 2);
        assert_eq!(state.noise_counters[&NoiseCategory::Http], 1);
        assert_eq!(state.role(Role::Analyst).during.len(), 1);
    }

    #[test]
    fn noise_words_inside_content_are_not_noise() {
        let mut session = session();
        session.feed(&line("Leader is drafting comments"));
        session.feed(&line(
            "Leader comment 1 on post p-1: A cache hit is not evidence of anything.",
        ));
        session.feed("second paragraph");
        session.feed(&line("Post content: The cache hit ratio proves nothing"));

        let state = session.state();
        assert_eq!(state.noise_total(), 0);
        assert_eq!(state.context.leader_comments.len(), 1);
        assert_eq!(
            state.context.leader_comments[0].body,
            "A cache hit is not evidence of anything.\nsecond paragraph"
        );
        assert_eq!(state.role(Role::Leader).summary[0], "Posted #1");
        assert_eq!(
            state.context.post_content.as_deref(),
            Some("The cache hit ratio proves nothing")
        );
        assert!(
            !state
                .role(Role::Leader)
                .during
                .contains(&"second paragraph".to_string())
        );
    }

    #[test]
    fn infrastructure_cache_lines_are_noise() {
        let mut session = session();
        session.feed(&line("[Analyst] reading"));
        session.feed(&line("Cache hit for prompt prefix"));
        session.feed(&line("[cache] cache hit: embeddings"));
        assert_eq!(session.state().noise_counters[&NoiseCategory::Cache], 2);
        assert_eq!(session.state().role(Role::Analyst).during.len(), 1);
    }

    #[test]
    fn reset_returns_to_session_start() {
        let mut session = session();
        session.feed(&line("[Leader] drafting"));
        session.feed(&line("Leader comment 1 on post p-1: hi"));
        session.reset();
        assert_eq!(**session.state(), FlowState::new());

        // The dedup key set went with the state, so the comment is new again
        session.feed(&line("Leader comment 1 on post p-1: hi"));
        assert_eq!(session.state().context.leader_comments.len(), 1);
    }

    #[test]
    fn error_line_marks_receiver() {
        let mut session = session();
        session.feed(&line("Generating intervention strategy"));
        session.feed("2025-03-14 09:26:54,000 - ERROR - strategy model timed out");
        assert_eq!(session.state().role(Role::Strategist).status, RoleStatus::Error);

        session.feed("ERROR: stream disconnected");
        assert_eq!(session.state().role(Role::Strategist).status, RoleStatus::Error);
    }

    #[test]
    fn status_line_closes_continuation() {
        let mut session = session();
        session.feed(&line("Post content: Headline"));
        session.feed("INFO: stream reconnected");
        session.feed("not part of the post");
        assert_eq!(
            session.state().context.post_content.as_deref(),
            Some("Headline")
        );
    }

    #[test]
    fn stage_change_clears_during_per_policy() {
        let mut session = session();
        session.feed(&line("Analyzing post content"));
        session.feed(&line("Sampled 40 comments"));
        assert_eq!(session.state().role(Role::Analyst).during, vec!["Sampled 40 comments"]);

        session.feed(&line("Strategist is planning"));
        session.feed(&line("Evaluating strategy candidates"));
        assert_eq!(session.state().role(Role::Strategist).during.len(), 2);
    }

    #[test]
    fn feed_updates_reports_changes() {
        let mut session = session();
        let updates = session.feed_updates(&line("[Leader] drafting"));
        assert!(updates.contains(&FlowUpdate::RoleSwitched {
            from: None,
            to: Some(Role::Leader)
        }));
        assert!(session.feed_updates(&line("[Leader] drafting")).is_empty());
    }

    #[test]
    fn truncation_applies_to_unmatched_lines() {
        let policy = TranscriptPolicy {
            max_line_chars: Some(12),
            ..TranscriptPolicy::default()
        };
        let mut session = FlowSession::new(policy);
        session.feed(&line("[Leader] drafting a very long comment"));
        assert_eq!(session.state().role(Role::Leader).during, vec!["[Leader] dra..."]);
    }
}
