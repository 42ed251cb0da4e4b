//! Plain-text rendering of boards and update feeds.

use flowscope_core::stage::stage_names;
use flowscope_proto::{FlowState, FlowUpdate, Role, RoleCardState, RoleStatus};
use std::fmt::Write as _;

/// ANSI color codes for terminal output.
mod colors {
    pub const RESET: &str = "\x1b[0m";
    pub const BOLD: &str = "\x1b[1m";
    pub const DIM: &str = "\x1b[2m";
    pub const GREEN: &str = "\x1b[32m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const RED: &str = "\x1b[31m";
    pub const CYAN: &str = "\x1b[36m";
    pub const MAGENTA: &str = "\x1b[35m";
}

struct Paint {
    enabled: bool,
}

impl Paint {
    fn wrap(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("{code}{text}{}", colors::RESET)
        } else {
            text.to_string()
        }
    }
}

fn status_color(status: RoleStatus) -> &'static str {
    match status {
        RoleStatus::Idle => colors::DIM,
        RoleStatus::Running => colors::YELLOW,
        RoleStatus::Done => colors::GREEN,
        RoleStatus::Error => colors::RED,
    }
}

fn status_label(status: RoleStatus) -> &'static str {
    match status {
        RoleStatus::Idle => "idle",
        RoleStatus::Running => "running",
        RoleStatus::Done => "done",
        RoleStatus::Error => "error",
    }
}

fn stage_label(role: Role, card: &RoleCardState) -> String {
    let names = stage_names(role);
    match card.stage.current {
        Some(index) => format!(
            "stage {}/{} {}",
            index + 1,
            names.len(),
            names.get(index).copied().unwrap_or("?")
        ),
        None => "no stage".to_string(),
    }
}

/// Renders the full four-card board.
pub fn board(state: &FlowState, use_colors: bool) -> String {
    let paint = Paint {
        enabled: use_colors,
    };
    let mut out = String::new();

    let active = state.active_role.map_or("none", Role::display_name);
    let _ = writeln!(
        out,
        "{}  active: {}  sticky: {}  noise: {}",
        paint.wrap(colors::BOLD, "== Flowscope =="),
        paint.wrap(colors::CYAN, active),
        if state.amplifier_sticky { "yes" } else { "no" },
        state.noise_total()
    );

    for (role, card) in state.roles.iter() {
        let marker = if state.active_role == Some(role) { ">" } else { " " };
        let _ = writeln!(
            out,
            "{marker} {} [{}] {}",
            paint.wrap(colors::BOLD, role.display_name()),
            paint.wrap(status_color(card.status), status_label(card.status)),
            stage_label(role, card)
        );

        let summary: Vec<&str> = card
            .summary
            .iter()
            .map(String::as_str)
            .filter(|s| !s.is_empty())
            .collect();
        if !summary.is_empty() {
            let _ = writeln!(out, "    {}", summary.join(" | "));
        }

        let lines = card.after.as_deref().unwrap_or(&card.during);
        for line in lines {
            let _ = writeln!(out, "    {}", paint.wrap(colors::DIM, line));
        }
    }

    if let Some(post) = &state.context.post_content {
        let _ = writeln!(out, "{} {post}", paint.wrap(colors::MAGENTA, "post:"));
    }
    if let Some(score) = state.context.feed_score {
        let _ = writeln!(out, "{} {score}", paint.wrap(colors::MAGENTA, "feed score:"));
    }
    for comment in &state.context.leader_comments {
        let _ = writeln!(
            out,
            "{} {} #{}: {}",
            paint.wrap(colors::MAGENTA, "comment"),
            comment.key.post_id,
            comment.key.ordinal,
            comment.body.replace('\n', " / ")
        );
    }
    out
}

/// Renders one update as a single feed line.
pub fn update_line(update: &FlowUpdate, use_colors: bool) -> String {
    let paint = Paint {
        enabled: use_colors,
    };
    let name = |role: Option<Role>| role.map_or("none", Role::display_name);

    match update {
        FlowUpdate::RoleSwitched { from, to } => format!(
            "{} {} (was {})",
            paint.wrap(colors::CYAN, "->"),
            paint.wrap(colors::BOLD, name(*to)),
            name(*from)
        ),
        FlowUpdate::StatusChanged { role, status } => format!(
            "[{role}] {}",
            paint.wrap(status_color(*status), status_label(*status))
        ),
        FlowUpdate::StickyChanged { sticky } => {
            format!("amplifier sticky {}", if *sticky { "on" } else { "off" })
        }
        FlowUpdate::StageChanged { role, stage } => {
            let label = stage_names(*role).get(*stage).copied().unwrap_or("?");
            format!("[{role}] stage {}: {label}", stage + 1)
        }
        FlowUpdate::SummaryChanged { role, slot, value } => {
            format!("[{role}] summary {slot} = {value}")
        }
        FlowUpdate::TranscriptAppended { role, line } => {
            format!("[{role}] {}", paint.wrap(colors::DIM, line))
        }
        FlowUpdate::CommentPosted { key } => format!(
            "{} {} #{}",
            paint.wrap(colors::MAGENTA, "comment posted"),
            key.post_id,
            key.ordinal
        ),
    }
}
