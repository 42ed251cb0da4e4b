//! Configuration types for flowscope.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working board. Invalid values are rejected by [`FlowConfig::validate`];
//! values that are legal but pointless produce [`ConfigWarning`]s.

use flowscope_proto::{FixedRateOptions, PacerError, Role, SmoothedOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Per-role transcript limits and compaction.
    #[serde(default)]
    pub transcript: TranscriptPolicy,

    /// Render pacing for replayed or bursty input.
    #[serde(default)]
    pub pacer: PacerConfig,
}

impl FlowConfig {
    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        debug!(path = %path_ref.display(), "Loading configuration from file");
        let content = std::fs::read_to_string(path_ref)?;
        let config: Self = serde_yaml::from_str(&content)?;
        debug!(
            pacer = ?config.pacer.mode,
            max_line_chars = ?config.transcript.max_line_chars,
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads configuration from `path` if it exists, defaults otherwise.
    pub fn from_file_or_default(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path_ref = path.as_ref();
        if path_ref.exists() {
            Self::from_file(path_ref)
        } else {
            debug!(path = %path_ref.display(), "No configuration file, using defaults");
            Ok(Self::default())
        }
    }

    /// Validates the configuration.
    ///
    /// Returns warnings for settings that are accepted but have no effect.
    pub fn validate(&self) -> Result<Vec<ConfigWarning>, ConfigError> {
        let mut warnings = Vec::new();

        if self.transcript.max_line_chars == Some(0) {
            return Err(ConfigError::Invalid {
                field: "transcript.max_line_chars".to_string(),
                reason: "must be greater than zero when set".to_string(),
            });
        }

        for role in Role::ALL {
            let limits = self.transcript.limits(role);
            if limits.capacity == 0 {
                return Err(ConfigError::Invalid {
                    field: format!("transcript.{}.capacity", role.as_str()),
                    reason: "must be greater than zero".to_string(),
                });
            }
            if limits.after_capacity > limits.capacity {
                warnings.push(ConfigWarning::IneffectiveValue {
                    field: format!("transcript.{}.after_capacity", role.as_str()),
                    message: format!(
                        "{} exceeds capacity {}; the frozen snapshot can never hold more",
                        limits.after_capacity, limits.capacity
                    ),
                });
            }
        }

        self.pacer.fixed.validate()?;
        self.pacer.smoothed.validate()?;

        if self.pacer.mode == PacerMode::Off && self.pacer.customized() {
            warnings.push(ConfigWarning::IneffectiveValue {
                field: "pacer".to_string(),
                message: "pacer options are set but mode is 'off'".to_string(),
            });
        }

        Ok(warnings)
    }
}

/// Transcript limits of one role card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleLimits {
    /// Lines kept in the rolling `during` transcript.
    pub capacity: usize,

    /// Lines kept in the `after` snapshot taken on role switch.
    pub after_capacity: usize,

    /// Clear `during` whenever the role's current stage changes.
    #[serde(default)]
    pub clear_on_stage_change: bool,
}

impl RoleLimits {
    const fn new(capacity: usize, clear_on_stage_change: bool) -> Self {
        Self {
            capacity,
            after_capacity: capacity,
            clear_on_stage_change,
        }
    }
}

/// Per-role transcript policy.
///
/// Analyst and Amplifier stream short-lived step output, so their
/// transcripts restart with each stage; Strategist and Leader accumulate
/// candidate output across stages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptPolicy {
    /// Truncate display lines longer than this many characters.
    #[serde(default)]
    pub max_line_chars: Option<usize>,

    #[serde(default = "default_analyst")]
    pub analyst: RoleLimits,

    #[serde(default = "default_strategist")]
    pub strategist: RoleLimits,

    #[serde(default = "default_leader")]
    pub leader: RoleLimits,

    #[serde(default = "default_amplifier")]
    pub amplifier: RoleLimits,
}

fn default_analyst() -> RoleLimits {
    RoleLimits::new(10, true)
}

fn default_strategist() -> RoleLimits {
    RoleLimits::new(20, false)
}

fn default_leader() -> RoleLimits {
    RoleLimits::new(40, false)
}

fn default_amplifier() -> RoleLimits {
    RoleLimits::new(10, true)
}

impl Default for TranscriptPolicy {
    fn default() -> Self {
        Self {
            max_line_chars: None,
            analyst: default_analyst(),
            strategist: default_strategist(),
            leader: default_leader(),
            amplifier: default_amplifier(),
        }
    }
}

impl TranscriptPolicy {
    pub fn limits(&self, role: Role) -> RoleLimits {
        match role {
            Role::Analyst => self.analyst,
            Role::Strategist => self.strategist,
            Role::Leader => self.leader,
            Role::Amplifier => self.amplifier,
        }
    }
}

/// Which render pacer discipline to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PacerMode {
    /// Deliver every line as soon as it is available.
    Off,
    #[default]
    Fixed,
    Smoothed,
}

impl std::str::FromStr for PacerMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "off" | "none" => Ok(Self::Off),
            "fixed" => Ok(Self::Fixed),
            "smoothed" | "smooth" => Ok(Self::Smoothed),
            other => Err(ConfigError::Invalid {
                field: "pacer.mode".to_string(),
                reason: format!("unknown mode '{other}', expected off, fixed or smoothed"),
            }),
        }
    }
}

/// Render pacer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PacerConfig {
    #[serde(default)]
    pub mode: PacerMode,

    #[serde(default)]
    pub fixed: FixedRateOptions,

    #[serde(default)]
    pub smoothed: SmoothedOptions,
}

impl PacerConfig {
    fn customized(&self) -> bool {
        self.fixed != FixedRateOptions::default() || self.smoothed != SmoothedOptions::default()
    }
}

/// Configuration warnings emitted during validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    /// Field is accepted but cannot have any effect.
    IneffectiveValue { field: String, message: String },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::IneffectiveValue { field, message } => {
                write!(f, "Warning [{}]: {}", field, message)
            }
        }
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: String, reason: String },

    #[error("Invalid pacer option: {0}")]
    Pacer(#[from] PacerError),
}
