//! Change events derived from consecutive flow snapshots.
//!
//! The reducer only produces snapshots. Consumers that prefer an event feed
//! (the CLI's JSON-lines output, log shippers) diff two snapshots with
//! [`FlowUpdate::between`].

use serde::{Deserialize, Serialize};

use crate::{CommentKey, FlowState, Role, RoleStatus};

/// A single observable change between two snapshots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum FlowUpdate {
    #[serde(rename = "flow.role_switched")]
    RoleSwitched {
        from: Option<Role>,
        to: Option<Role>,
    },

    #[serde(rename = "flow.status_changed")]
    StatusChanged { role: Role, status: RoleStatus },

    #[serde(rename = "flow.sticky_changed")]
    StickyChanged { sticky: bool },

    #[serde(rename = "flow.stage_changed")]
    StageChanged { role: Role, stage: usize },

    #[serde(rename = "flow.summary_changed")]
    SummaryChanged {
        role: Role,
        slot: usize,
        value: String,
    },

    #[serde(rename = "flow.transcript_appended")]
    TranscriptAppended { role: Role, line: String },

    #[serde(rename = "flow.comment_posted")]
    CommentPosted { key: CommentKey },
}

impl FlowUpdate {
    /// Lists the changes from `prev` to `next`, role switches first.
    pub fn between(prev: &FlowState, next: &FlowState) -> Vec<FlowUpdate> {
        let mut updates = Vec::new();

        if prev.active_role != next.active_role {
            updates.push(FlowUpdate::RoleSwitched {
                from: prev.active_role,
                to: next.active_role,
            });
        }
        if prev.amplifier_sticky != next.amplifier_sticky {
            updates.push(FlowUpdate::StickyChanged {
                sticky: next.amplifier_sticky,
            });
        }

        for role in Role::ALL {
            let before = prev.role(role);
            let after = next.role(role);

            if before.status != after.status {
                updates.push(FlowUpdate::StatusChanged {
                    role,
                    status: after.status,
                });
            }
            if before.stage.current != after.stage.current {
                if let Some(stage) = after.stage.current {
                    updates.push(FlowUpdate::StageChanged { role, stage });
                }
            }
            for (slot, (old, new)) in before.summary.iter().zip(&after.summary).enumerate() {
                if old != new {
                    updates.push(FlowUpdate::SummaryChanged {
                        role,
                        slot,
                        value: new.clone(),
                    });
                }
            }
            // `during` never holds duplicates, so membership identifies new lines
            for line in &after.during {
                if !before.during.contains(line) {
                    updates.push(FlowUpdate::TranscriptAppended {
                        role,
                        line: line.clone(),
                    });
                }
            }
        }

        for comment in &next.context.leader_comments {
            if !prev.context.comment_keys.contains(&comment.key) {
                updates.push(FlowUpdate::CommentPosted {
                    key: comment.key.clone(),
                });
            }
        }

        updates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LeaderComment;

    #[test]
    fn identical_snapshots_produce_nothing() {
        let state = FlowState::new_round();
        assert!(FlowUpdate::between(&state, &state.clone()).is_empty());
    }

    #[test]
    fn reports_switch_transcript_and_comment() {
        let prev = FlowState::new_round();
        let mut next = prev.clone();
        next.active_role = Some(Role::Leader);
        next.role_mut(Role::Leader).status = RoleStatus::Running;
        next.role_mut(Role::Leader).during.push("Drafting".to_string());
        let key = CommentKey::new("p-1", 1);
        next.context.comment_keys.insert(key.clone());
        next.context.leader_comments.push(LeaderComment {
            key: key.clone(),
            body: "Let's keep it civil.".to_string(),
        });

        let updates = FlowUpdate::between(&prev, &next);

        assert_eq!(
            updates[0],
            FlowUpdate::RoleSwitched {
                from: Some(Role::Analyst),
                to: Some(Role::Leader)
            }
        );
        assert!(updates.contains(&FlowUpdate::TranscriptAppended {
            role: Role::Leader,
            line: "Drafting".to_string()
        }));
        assert!(updates.contains(&FlowUpdate::CommentPosted { key }));
    }

    #[test]
    fn serializes_with_event_tag() {
        let update = FlowUpdate::StickyChanged { sticky: true };
        let json = serde_json::to_value(&update).unwrap();
        assert_eq!(json["event"], "flow.sticky_changed");
        assert_eq!(json["data"]["sticky"], true);
    }
}
