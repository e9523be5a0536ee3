//! Error types for notion-pager
//!
//! Every fallible operation returns [`Result`]. A fetch cycle never lets an
//! error escape; it reduces it to an [`ErrorCategory`] and a message instead.

use thiserror::Error;

/// The main error type for notion-pager
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // Configuration
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Cannot read config: {0}")]
    ConfigSyntax(#[from] serde_yaml::Error),

    #[error("Invalid base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Config file not found: {path}")]
    FileNotFound { path: String },

    // ============================================================================
    // Transport
    // ============================================================================
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    HttpStatus { status: u16, body: String },

    #[error("Rate limited, retry after {retry_after_seconds}s")]
    RateLimited { retry_after_seconds: u64 },

    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    // ============================================================================
    // Response Parsing
    // ============================================================================
    #[error("Malformed response: {message}")]
    Decode { message: String },

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parse buffer exhausted after {capacity} bytes")]
    BufferExhausted { capacity: usize },

    #[error("Cannot reserve {requested} bytes, largest free block is {available} bytes")]
    Allocation { requested: usize, available: usize },

    // ============================================================================
    // Other
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse error classes reported by a failed fetch cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Missing token or database id, malformed query template
    Config,
    /// Connect failure, non-2xx status, timeout
    Network,
    /// Malformed JSON, buffer exhaustion
    Parse,
    /// Anything else
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Network => "network",
            ErrorCategory::Parse => "parse",
            ErrorCategory::Internal => "internal",
        })
    }
}

impl Error {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn http_status(status: u16, body: impl Into<String>) -> Self {
        Self::HttpStatus {
            status,
            body: body.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    /// Classify this error for status reporting
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config { .. }
            | Error::MissingConfigField { .. }
            | Error::InvalidConfigValue { .. }
            | Error::ConfigSyntax(_)
            | Error::InvalidUrl(_)
            | Error::FileNotFound { .. } => ErrorCategory::Config,
            Error::Http(_)
            | Error::HttpStatus { .. }
            | Error::RateLimited { .. }
            | Error::Timeout { .. } => ErrorCategory::Network,
            Error::Decode { .. }
            | Error::Json(_)
            | Error::BufferExhausted { .. }
            | Error::Allocation { .. } => ErrorCategory::Parse,
            Error::Io(_) | Error::Other(_) => ErrorCategory::Internal,
        }
    }

    /// Whether repeating the request could succeed
    ///
    /// Rate limiting, timeouts, transport failures and 5xx statuses are.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Http(_) | Error::RateLimited { .. } | Error::Timeout { .. } => true,
            Error::HttpStatus { status, .. } => *status == 429 || (500..600).contains(status),
            _ => false,
        }
    }
}

/// Result type alias for notion-pager
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Prefix the error message with a description of the failed step
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| Error::Other(format!("{}: {}", f(), e.into())))
    }
}
