//! The four fixed workflow roles and their card status.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::Error;

/// A participant in the monitored workflow.
///
/// Declaration order is also the anchor priority order used by the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Analyst,
    Strategist,
    Leader,
    Amplifier,
}

impl Role {
    /// All roles in priority order.
    pub const ALL: [Role; 4] = [
        Role::Analyst,
        Role::Strategist,
        Role::Leader,
        Role::Amplifier,
    ];

    /// Stable lowercase identifier.
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Analyst => "analyst",
            Role::Strategist => "strategist",
            Role::Leader => "leader",
            Role::Amplifier => "amplifier",
        }
    }

    /// Human-readable name for boards and logs.
    pub fn display_name(self) -> &'static str {
        match self {
            Role::Analyst => "Analyst",
            Role::Strategist => "Strategist",
            Role::Leader => "Leader",
            Role::Amplifier => "Amplifier",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for Role {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "analyst" => Ok(Role::Analyst),
            "strategist" => Ok(Role::Strategist),
            "leader" => Ok(Role::Leader),
            // "echo" is the retired name of the amplification role
            "amplifier" | "echo" => Ok(Role::Amplifier),
            _ => Err(Error::UnknownRole(s.to_string())),
        }
    }
}

/// Lifecycle status of a role card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoleStatus {
    #[default]
    Idle,
    Running,
    Done,
    Error,
}

impl fmt::Display for RoleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RoleStatus::Idle => "idle",
            RoleStatus::Running => "running",
            RoleStatus::Done => "done",
            RoleStatus::Error => "error",
        };
        f.write_str(s)
    }
}
