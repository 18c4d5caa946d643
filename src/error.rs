// src/error.rs
//! Application error types with structured error handling.
//!
//! Error types form the vocabulary for failure modes in the system.
//! Each variant tells what went wrong and where, so the crawler can decide
//! whether a failure is retried, isolated to one node, or fatal to the run.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Notion API error codes as a typed vocabulary.
///
/// Instead of matching against magic strings like `"rate_limited"`,
/// the domain vocabulary is encoded in the type system.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotionErrorCode {
    /// API rate limit exceeded; back off and retry
    RateLimited,
    /// The requested object does not exist or is inaccessible
    ObjectNotFound,
    /// API key is invalid or expired
    Unauthorized,
    /// API key lacks permission for this resource
    RestrictedResource,
    /// Request body contains invalid JSON
    InvalidJson,
    /// Request parameters failed Notion's validation
    ValidationFailed,
    /// Conflict with current state of the resource
    Conflict,
    /// Notion internal server error
    InternalError,
    /// Notion is temporarily unavailable
    ServiceUnavailable,
    /// Notion timed out serving the request
    GatewayTimeout,
    /// HTTP status code fallback when the error body is unparseable
    HttpStatus(u16),
    /// An error code this client doesn't recognize yet
    Unknown(String),
}

impl NotionErrorCode {
    /// Parse a Notion API error code string into the typed vocabulary.
    pub fn from_api_response(code: &str) -> Self {
        match code {
            "rate_limited" => Self::RateLimited,
            "object_not_found" => Self::ObjectNotFound,
            "unauthorized" => Self::Unauthorized,
            "restricted_resource" => Self::RestrictedResource,
            "invalid_json" => Self::InvalidJson,
            "validation_error" => Self::ValidationFailed,
            "conflict_error" => Self::Conflict,
            "internal_server_error" => Self::InternalError,
            "service_unavailable" => Self::ServiceUnavailable,
            "gateway_timeout" => Self::GatewayTimeout,
            other => Self::Unknown(other.to_string()),
        }
    }

    /// Create from an HTTP status code when the error body is unparseable.
    pub fn from_http_status(status: u16) -> Self {
        Self::HttpStatus(status)
    }

    /// Whether this error is transient and worth retrying.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited
            | Self::ServiceUnavailable
            | Self::InternalError
            | Self::GatewayTimeout
            | Self::Conflict => true,
            Self::HttpStatus(status) => matches!(status, 408 | 429 | 500..=599),
            _ => false,
        }
    }

    /// Whether the credential itself was rejected.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::Unauthorized | Self::HttpStatus(401))
    }
}

impl fmt::Display for NotionErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RateLimited => write!(f, "rate_limited"),
            Self::ObjectNotFound => write!(f, "object_not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::RestrictedResource => write!(f, "restricted_resource"),
            Self::InvalidJson => write!(f, "invalid_json"),
            Self::ValidationFailed => write!(f, "validation_error"),
            Self::Conflict => write!(f, "conflict_error"),
            Self::InternalError => write!(f, "internal_server_error"),
            Self::ServiceUnavailable => write!(f, "service_unavailable"),
            Self::GatewayTimeout => write!(f, "gateway_timeout"),
            Self::HttpStatus(code) => write!(f, "http_{}", code),
            Self::Unknown(code) => write!(f, "{}", code),
        }
    }
}

/// Main application error type.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Missing configuration: {0}")]
    MissingConfiguration(String),

    #[error("Invalid configuration in {path}: {cause}")]
    InvalidConfiguration { path: PathBuf, cause: String },

    #[error("Network failure: {0}")]
    NetworkFailure(#[from] reqwest::Error),

    #[error("Notion API returned an error ({code}): {message}")]
    NotionService {
        code: NotionErrorCode,
        message: String,
        status: u16,
    },

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Cannot classify {kind} {id}: {reason}")]
    Classification {
        id: String,
        kind: String,
        reason: String,
    },

    /// Every filesystem or transfer failure while persisting crawl output.
    #[error("{cause} ({})", path.display())]
    Persistence { path: PathBuf, cause: String },

    #[error("Progress state could not be saved to {}: {cause}", path.display())]
    StateStore { path: PathBuf, cause: String },

    #[error("Root {id} could not be pulled: {cause}")]
    RootUnavailable { id: String, cause: String },

    #[error("Internal error: {message}")]
    InternalError {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error(transparent)]
    ValidationError(#[from] crate::types::ValidationError),
}

impl AppError {
    /// Short type name used as the `<cause-type>` prefix in failure records.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AppError::MissingConfiguration(_) => "MissingConfiguration",
            AppError::InvalidConfiguration { .. } => "InvalidConfiguration",
            AppError::NetworkFailure(_) => "NetworkFailure",
            AppError::NotionService { .. } => "NotionService",
            AppError::MalformedResponse(_) => "MalformedResponse",
            AppError::Classification { .. } => "Classification",
            AppError::Persistence { .. } => "Persistence",
            AppError::StateStore { .. } => "StateStore",
            AppError::RootUnavailable { .. } => "RootUnavailable",
            AppError::InternalError { .. } => "InternalError",
            AppError::ValidationError(_) => "ValidationError",
        }
    }

    /// `"<cause-type>: <cause-message>"`, the form recorded for failed nodes.
    pub fn describe(&self) -> String {
        format!("{}: {}", self.kind_name(), self)
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkFailure(e) => {
                e.is_timeout() || e.is_connect() || e.is_request() || e.is_body()
            }
            AppError::NotionService { code, .. } => code.is_retryable(),
            _ => false,
        }
    }

    /// Whether this error should abort the whole run rather than one node.
    pub fn is_fatal(&self) -> bool {
        match self {
            AppError::StateStore { .. }
            | AppError::MissingConfiguration(_)
            | AppError::InvalidConfiguration { .. }
            | AppError::RootUnavailable { .. } => true,
            AppError::NotionService { code, .. } => code.is_auth_failure(),
            _ => false,
        }
    }
}

// Allow converting from anyhow::Error, preserving error chain
impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::InternalError {
            message: err.to_string(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::MalformedResponse(err.to_string())
    }
}

/// Maps an OS error raised while writing `path` onto a persistence failure
/// with an operator-readable cause.
pub fn persistence_error(path: impl Into<PathBuf>, err: &std::io::Error) -> AppError {
    use std::io::ErrorKind;

    let path = path.into();
    let cause = match err.kind() {
        ErrorKind::PermissionDenied => "Permission denied writing file".to_string(),
        _ if err.raw_os_error() == Some(28) => "No space left on device".to_string(),
        _ if err.raw_os_error() == Some(36) => "File name too long".to_string(),
        _ => format!("Filesystem error: {}", err),
    };
    AppError::Persistence { path, cause }
}
