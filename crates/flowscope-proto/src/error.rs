//! Error types shared across flowscope crates.

/// Result alias using the shared [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by shared types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unknown role: {0}")]
    UnknownRole(String),

    #[error("Invalid pacer configuration: {0}")]
    Pacer(#[from] PacerError),
}

/// Invalid render pacer option.
///
/// Raised eagerly by the pacer option validators; these are programmer
/// errors and are never swallowed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PacerError {
    #[error("{option} must be a finite number, got {value}")]
    NotFinite { option: &'static str, value: f64 },

    #[error("{option} must not be negative, got {value}")]
    Negative { option: &'static str, value: f64 },

    #[error("{option} must be greater than zero, got {value}")]
    NotPositive { option: &'static str, value: f64 },

    #[error("{option} must be within [{min}, {max}], got {value}")]
    OutOfRange {
        option: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("max_delay_ms ({max}) must not be below min_delay_ms ({min})")]
    BoundsOutOfOrder { min: f64, max: f64 },
}
