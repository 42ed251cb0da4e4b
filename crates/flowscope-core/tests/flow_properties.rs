//! Behavioral properties of the line reducer and the render pacers.

use flowscope_core::testing::{LogBuilder, ManualScheduler};
use flowscope_core::{
    FixedRatePacer, FlowReducer, FlowSession, SmoothedPacer, TranscriptPolicy, normalize,
};
use flowscope_proto::{
    CommentKey, FixedRateOptions, FlowState, NoiseCategory, PendingMultiline, Role, RoleStatus,
    SmoothedOptions,
};
use std::sync::Arc;

fn session() -> FlowSession {
    FlowSession::new(TranscriptPolicy::default())
}

#[test]
fn duplicate_lines_never_grow_during_twice() {
    let lines = LogBuilder::new()
        .info("Leader is drafting comments")
        .info("Drafting candidate comment 1")
        .info("Candidate 1 score: 7.5")
        .build();

    let mut session = session();
    for line in &lines {
        session.feed(line);
        let len = session.state().role(Role::Leader).during.len();
        for _ in 0..3 {
            assert!(!session.feed(line), "replayed line changed state: {line}");
        }
        assert_eq!(session.state().role(Role::Leader).during.len(), len);
    }
}

#[test]
fn prefix_stripping_keeps_message() {
    for message in ["Tone: calm", "  indented text", "Leader comment 1 on post p-1: hi"] {
        let raw = format!("2025-03-14 09:26:53,589 - INFO - {message}");
        let line = normalize(&raw);
        assert_eq!(line.message, message.trim_start());
        assert!(line.had_prefix());
    }
}

#[test]
fn stage_max_is_monotonic_and_order_is_first_seen() {
    let lines = LogBuilder::new()
        .info("Starting workflow round 1")
        .info("Sentiment score: 0.1")
        .info("Sampled 12 comments")
        .info("Extremity score: 0.3")
        .info("Sampled 12 comments")
        .build();

    let mut session = session();
    let mut last_max = None;
    for line in &lines {
        session.feed(line);
        let stage = &session.state().role(Role::Analyst).stage;
        assert!(stage.max >= last_max, "max regressed on {line}");
        last_max = stage.max;
    }

    let stage = &session.state().role(Role::Analyst).stage;
    assert_eq!(stage.order, vec![0, 3, 1, 2]);
    assert_eq!(stage.current, Some(1));
    assert_eq!(stage.max, Some(3));
}

#[test]
fn role_switch_freezes_outgoing_tail() {
    let policy = TranscriptPolicy {
        strategist: flowscope_core::RoleLimits {
            capacity: 20,
            after_capacity: 2,
            clear_on_stage_change: false,
        },
        ..TranscriptPolicy::default()
    };
    let mut session = FlowSession::new(policy);
    for line in LogBuilder::new()
        .info("Strategist is planning")
        .info("Candidate strategy 1 looks weak")
        .info("Candidate strategy 2 looks better")
        .info("Leader is drafting comments")
        .build()
    {
        session.feed(&line);
    }

    let state = session.state();
    let strategist = state.role(Role::Strategist);
    assert_eq!(strategist.status, RoleStatus::Done);
    assert!(strategist.during.is_empty());
    assert_eq!(
        strategist.after.as_deref(),
        Some(
            &[
                "Candidate strategy 1 looks weak".to_string(),
                "Candidate strategy 2 looks better".to_string()
            ][..]
        )
    );
    assert_eq!(state.role(Role::Leader).status, RoleStatus::Running);
    assert_eq!(state.active_role, Some(Role::Leader));
}

#[test]
fn sticky_contains_lines_until_monitoring_anchor() {
    let lines = LogBuilder::new()
        .info("Activating amplifier cluster with 5 agents")
        .info("[Leader] posting follow-up")
        .info("Leader comment 3 on post p-2: repost")
        .info("[Analyst] checking")
        .info("Monitoring round 1")
        .info("Leader is drafting comments")
        .build();

    let mut session = session();
    for (i, line) in lines.iter().enumerate() {
        session.feed(line);
        let state = session.state();
        if i < 4 {
            assert!(state.amplifier_sticky, "line {i}");
            assert_eq!(state.active_role, Some(Role::Amplifier), "line {i}");
        }
    }

    let state = session.state();
    assert!(!state.amplifier_sticky);
    assert_eq!(state.active_role, Some(Role::Leader));
    assert_eq!(state.role(Role::Analyst).status, RoleStatus::Done);
}

#[test]
fn continuation_joins_the_pending_comment_only() {
    let lines = LogBuilder::new()
        .info("Leader is drafting comments")
        .info("Leader comment 1 on post p-1: first")
        .info("Leader comment 2 on post p-1: second")
        .raw("second, continued")
        .build();

    let mut session = session();
    session.feed_all(lines.iter().map(String::as_str));

    let state = session.state();
    let bodies: Vec<&str> = state
        .context
        .leader_comments
        .iter()
        .map(|c| c.body.as_str())
        .collect();
    assert_eq!(bodies, vec!["first", "second\nsecond, continued"]);
    assert_eq!(
        state.context.pending,
        PendingMultiline::LeaderComment(CommentKey::new("p-1", 2))
    );
    assert!(
        !state
            .role(Role::Leader)
            .during
            .iter()
            .any(|l| l.contains("continued"))
    );
}

#[test]
fn comments_are_keyed_by_post_and_ordinal() {
    let lines = LogBuilder::new()
        .info("Leader comment 1 on post p-1: a")
        .info("Leader comment 1 on post p-2: b")
        .info("Leader comment 1 on post p-1: a, replayed")
        .build();

    let mut session = session();
    session.feed_all(lines.iter().map(String::as_str));

    let keys: Vec<&CommentKey> = session
        .state()
        .context
        .leader_comments
        .iter()
        .map(|c| &c.key)
        .collect();
    assert_eq!(keys, vec![&CommentKey::new("p-1", 1), &CommentKey::new("p-2", 1)]);
    assert_eq!(session.state().context.leader_comments[0].body, "a");
}

#[test]
fn extraction_is_independent_of_noise_filtering() {
    let content = [
        "Leader is drafting comments",
        "Leader comment 1 on post p-1: cache hit rates are irrelevant",
        "Post content: Retrying the same claim does not make it true",
        "Sentiment score: -0.3",
        "Core argument: token usage is not the point",
    ];
    let noise = [
        "HTTP Request: POST https://api.example.com/v1/chat \"HTTP/1.1 200 OK\"",
        "Cache hit for prompt prefix",
        "Retrying request (attempt 2)",
        "Token usage: 1024",
    ];

    let mut clean = LogBuilder::new();
    let mut noisy = LogBuilder::new();
    for (i, message) in content.iter().enumerate() {
        clean = clean.info(message);
        noisy = noisy.info(message);
        if let Some(extra) = noise.get(i) {
            noisy = noisy.info(extra);
        }
    }

    let mut plain = session();
    plain.feed_all(clean.build().iter().map(String::as_str));
    let mut mixed = session();
    mixed.feed_all(noisy.build().iter().map(String::as_str));

    let (plain, mixed) = (plain.state(), mixed.state());
    assert_eq!(plain.noise_total(), 0);
    assert_eq!(mixed.noise_total(), 4);
    assert_eq!(plain.context, mixed.context);
    for role in Role::ALL {
        assert_eq!(plain.role(role).summary, mixed.role(role).summary, "{role}");
    }
    assert_eq!(
        mixed.context.leader_comments[0].body,
        "cache hit rates are irrelevant"
    );
    assert_eq!(
        mixed.context.post_content.as_deref(),
        Some("Retrying the same claim does not make it true")
    );
    assert_eq!(mixed.role(Role::Strategist).summary[3], "token usage is not the point");
}

#[test]
fn prefixed_noise_closes_pending_comment() {
    let lines = LogBuilder::new()
        .info("Leader is drafting comments")
        .info("Leader comment 1 on post p-1: first")
        .raw("continued")
        .info("HTTP Request: POST https://api.example.com/v1/chat \"HTTP/1.1 200 OK\"")
        .raw("after the request")
        .build();

    let mut session = session();
    session.feed_all(lines.iter().map(String::as_str));

    let state = session.state();
    assert_eq!(state.context.leader_comments[0].body, "first\ncontinued");
    assert_eq!(state.context.pending, PendingMultiline::None);
    assert_eq!(state.noise_counters[&NoiseCategory::Http], 1);
    assert!(
        state
            .role(Role::Leader)
            .during
            .contains(&"after the request".to_string())
    );
}

#[test]
fn lines_before_first_anchor_are_dropped() {
    let reducer = FlowReducer::default();
    let start = Arc::new(FlowState::new());
    let next = reducer.process(&start, "2025-03-14 09:00:00,000 - INFO - warming up");
    assert!(Arc::ptr_eq(&start, &next));
    assert_eq!(next.active_role, None);
}

#[test]
fn fixed_rate_example() {
    let pacer = FixedRatePacer::new(FixedRateOptions::new(50.0, 1)).unwrap();
    let mut scheduler = ManualScheduler::new(pacer);
    for line in ["a", "b", "c"] {
        scheduler.push(line);
    }
    scheduler.start();
    scheduler.advance_to(200);

    assert!(scheduler.shown_at(49).is_empty());
    assert_eq!(scheduler.shown_at(50), vec!["a"]);
    assert_eq!(scheduler.shown_at(100), vec!["a", "b"]);
    assert_eq!(scheduler.shown_at(150), vec!["a", "b", "c"]);
}

#[test]
fn smoothed_example() {
    let options = SmoothedOptions {
        min_delay_ms: 50.0,
        max_delay_ms: 200.0,
        time_scale: 0.1,
        smoothing_alpha: 1.0,
    };
    let mut scheduler = ManualScheduler::new(SmoothedPacer::new(options).unwrap());
    let log = LogBuilder::new()
        .info("a")
        .advance(2000)
        .info("b")
        .advance(50)
        .info("c")
        .build();
    scheduler.start();
    for line in log {
        scheduler.push(line);
    }
    scheduler.run_until_idle();

    let at: Vec<u64> = scheduler.deliveries().iter().map(|d| d.at_ms).collect();
    assert_eq!(at, vec![0, 200, 250]);
}

#[test]
fn stopped_pacer_discards_pending_lines() {
    let pacer = FixedRatePacer::new(FixedRateOptions::new(50.0, 1)).unwrap();
    let mut scheduler = ManualScheduler::new(pacer);
    for line in ["a", "b", "c"] {
        scheduler.push(line);
    }
    scheduler.start();
    scheduler.advance_to(60);
    scheduler.stop();
    scheduler.advance_to(1000);
    assert_eq!(scheduler.shown_at(1000), vec!["a"]);
}
