//! Builder for backend-shaped log text.

use chrono::DateTime;

/// 2025-03-14 09:00:00 UTC.
const DEFAULT_BASE_MS: i64 = 1_741_942_800_000;

/// Writes lines in the backend's `YYYY-MM-DD HH:MM:SS,mmm - LEVEL - ` shape
/// on a controllable clock.
#[derive(Debug, Clone)]
pub struct LogBuilder {
    clock_ms: i64,
    lines: Vec<String>,
}

impl Default for LogBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LogBuilder {
    pub fn new() -> Self {
        Self::starting_at(DEFAULT_BASE_MS)
    }

    pub fn starting_at(epoch_ms: i64) -> Self {
        Self {
            clock_ms: epoch_ms,
            lines: Vec::new(),
        }
    }

    /// Moves the clock forward.
    pub fn advance(mut self, ms: i64) -> Self {
        self.clock_ms += ms;
        self
    }

    pub fn info(self, message: &str) -> Self {
        self.level("INFO", message)
    }

    pub fn warn(self, message: &str) -> Self {
        self.level("WARNING", message)
    }

    pub fn error(self, message: &str) -> Self {
        self.level("ERROR", message)
    }

    /// A prefixed line with an explicit level.
    pub fn level(mut self, level: &str, message: &str) -> Self {
        let line = format!("{} - {level} - {message}", self.timestamp());
        self.lines.push(line);
        self
    }

    /// An unprefixed line (continuation or transport status).
    pub fn raw(mut self, line: &str) -> Self {
        self.lines.push(line.to_string());
        self
    }

    /// Current clock rendered as `YYYY-MM-DD HH:MM:SS,mmm`.
    pub fn timestamp(&self) -> String {
        DateTime::from_timestamp_millis(self.clock_ms)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S,%3f").to_string())
            .unwrap_or_default()
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn build(self) -> Vec<String> {
        self.lines
    }

    /// Newline-terminated file contents.
    pub fn text(&self) -> String {
        let mut text = self.lines.join("\n");
        text.push('\n');
        text
    }
}
