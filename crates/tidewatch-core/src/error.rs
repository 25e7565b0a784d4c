use thiserror::Error;

/// Validation errors for feed identifiers and domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error(
        "invalid feed '{value}', expected one of seismic-normal, seismic-small-area, tsunami, \
         station-observation-by-id, station-observation-by-region, transit-status-by-system"
    )]
    InvalidFeed { value: String },
    #[error("feed '{feed}' requires a {selector} selector")]
    MissingSelector {
        feed: &'static str,
        selector: &'static str,
    },
    #[error("feed '{feed}' does not accept a selector")]
    UnexpectedSelector { feed: &'static str },
    #[error("selector contains invalid character '{ch}' at index {index}")]
    SelectorInvalidChar { ch: char, index: usize },

    #[error("invalid provider '{value}', expected one of cwa, tdx")]
    InvalidProvider { value: String },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
}

/// Configuration errors raised while assembling [`crate::Settings`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {name} has invalid value '{value}': {reason}")]
    InvalidValue {
        name: String,
        value: String,
        reason: &'static str,
    },
    #[error("environment variable {name} must not be empty")]
    Empty { name: String },
}
