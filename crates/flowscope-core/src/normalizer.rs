//! Line normalization.
//!
//! Backend lines look like:
//! ```text
//! 2025-03-14 09:26:53,589 - INFO - Sentiment score: -0.42
//! ```
//! The normalizer strips ANSI colors and the timestamp/level prefix, and
//! recognizes the synthetic status lines injected by the transport
//! (`INFO: stream connected`, `ERROR: stream disconnected`).

use chrono::NaiveDateTime;
use regex::Regex;
use std::sync::LazyLock;

use crate::patterns::regex;

static PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    regex(r"^(\d{4}-\d{2}-\d{2} \d{2}:\d{2}:\d{2},\d{3}) - ([A-Z]+) - ")
});

static STATUS: LazyLock<Regex> =
    LazyLock::new(|| regex(r"^(INFO|WARNING|WARN|ERROR|信息|警告|错误)\s*[:：]"));

/// Kind of a transport-injected status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportStatus {
    Info,
    Warn,
    Error,
}

/// A raw line split into its clean message and prefix metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedLine {
    /// Message with prefix and leading whitespace removed.
    pub message: String,
    /// `YYYY-MM-DD HH:MM:SS,mmm` text when the line had a prefix.
    pub timestamp: Option<String>,
    /// Log level when the line had a prefix.
    pub level: Option<String>,
    /// Set for unprefixed transport status lines.
    pub status: Option<TransportStatus>,
}

impl NormalizedLine {
    pub fn had_prefix(&self) -> bool {
        self.timestamp.is_some()
    }

    /// True if this line closes any open continuation session.
    pub fn ends_continuation(&self) -> bool {
        self.had_prefix() || self.status.is_some()
    }

    /// True for `ERROR`/`CRITICAL` log lines and transport error lines.
    pub fn is_error(&self) -> bool {
        matches!(self.level.as_deref(), Some("ERROR" | "CRITICAL"))
            || self.status == Some(TransportStatus::Error)
    }

    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

/// Normalizes one raw line.
pub fn normalize(raw: &str) -> NormalizedLine {
    let cleaned;
    let raw = if raw.contains('\x1b') {
        cleaned = strip_ansi_escapes::strip_str(raw);
        cleaned.as_str()
    } else {
        raw
    };
    let raw = raw.trim_end_matches(['\r', '\n']);

    if let Some(caps) = PREFIX.captures(raw) {
        let prefix_len = caps.get(0).map_or(0, |m| m.end());
        return NormalizedLine {
            message: raw[prefix_len..].trim_start().to_string(),
            timestamp: caps.get(1).map(|m| m.as_str().to_string()),
            level: caps.get(2).map(|m| m.as_str().to_string()),
            status: None,
        };
    }

    let message = raw.trim_start().to_string();
    let status = STATUS
        .captures(&message)
        .and_then(|caps| caps.get(1))
        .map(|m| match m.as_str() {
            "ERROR" | "错误" => TransportStatus::Error,
            "WARN" | "WARNING" | "警告" => TransportStatus::Warn,
            _ => TransportStatus::Info,
        });

    NormalizedLine {
        message,
        timestamp: None,
        level: None,
        status,
    }
}

/// Milliseconds since the Unix epoch of a line's leading timestamp.
///
/// Only the `YYYY-MM-DD HH:MM:SS,mmm` prefix shape is recognized; anything
/// else yields `None`.
pub fn leading_timestamp_ms(raw: &str) -> Option<i64> {
    let caps = PREFIX.captures(raw.trim_start())?;
    let text = caps.get(1)?.as_str().replace(',', ".");
    let parsed = NaiveDateTime::parse_from_str(&text, "%Y-%m-%d %H:%M:%S%.f").ok()?;
    Some(parsed.and_utc().timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PREFIX_TEXT: &str = "2025-03-14 09:26:53,589 - INFO - ";

    #[test]
    fn strips_prefix_and_leading_whitespace() {
        let line = normalize(&format!("{PREFIX_TEXT}    Sentiment score: -0.42"));
        assert_eq!(line.message, "Sentiment score: -0.42");
        assert_eq!(line.timestamp.as_deref(), Some("2025-03-14 09:26:53,589"));
        assert_eq!(line.level.as_deref(), Some("INFO"));
        assert!(line.had_prefix());
        assert!(line.ends_continuation());
    }

    #[test]
    fn prefix_round_trip_keeps_message_body() {
        for message in [
            "plain",
            "  indented with trailing space ",
            "Leader comment 1 on post p-1: hi",
            "",
        ] {
            let line = normalize(&format!("{PREFIX_TEXT}{message}"));
            assert_eq!(line.message, message.trim_start());
        }
    }

    #[test]
    fn unprefixed_line_is_continuation_candidate() {
        let line = normalize("   and that is why we disagree");
        assert!(!line.had_prefix());
        assert!(!line.ends_continuation());
        assert_eq!(line.message, "and that is why we disagree");
    }

    #[test]
    fn recognizes_transport_status_lines() {
        let info = normalize("INFO: stream connected");
        assert_eq!(info.status, Some(TransportStatus::Info));
        assert!(info.ends_continuation());
        assert!(!info.is_error());

        let error = normalize("ERROR: stream disconnected");
        assert_eq!(error.status, Some(TransportStatus::Error));
        assert!(error.is_error());

        let localized = normalize("错误：连接中断");
        assert_eq!(localized.status, Some(TransportStatus::Error));
    }

    #[test]
    fn error_level_lines_are_errors() {
        let line = normalize("2025-03-14 09:26:53,589 - ERROR - LLM call failed");
        assert!(line.is_error());
        assert_eq!(line.status, None);
    }

    #[test]
    fn strips_ansi_colors_before_matching() {
        let line = normalize("\x1b[32m2025-03-14 09:26:53,589 - INFO - \x1b[0mTotal likes: 12");
        assert_eq!(line.message, "Total likes: 12");
        assert!(line.had_prefix());
    }

    #[test]
    fn trailing_newline_is_dropped() {
        assert_eq!(normalize("hello\r\n").message, "hello");
        assert!(normalize("   \n").is_empty());
    }

    #[test]
    fn parses_leading_timestamp() {
        let a = leading_timestamp_ms("2025-03-14 09:26:53,589 - INFO - a").unwrap();
        let b = leading_timestamp_ms("2025-03-14 09:26:55,589 - INFO - b").unwrap();
        assert_eq!(b - a, 2000);
        assert_eq!(leading_timestamp_ms("no timestamp here"), None);
        assert_eq!(leading_timestamp_ms("2025-13-40 99:00:00,000 - INFO - bad"), None);
    }
}
