//! Deployment Gateway Error Hierarchy
//!
//! Errors are split by where they are resolved:
//! - [`Error`]: process-level failures (configuration, IO, startup, shutdown)
//! - [`GatewayError`]: failures reported by the resource store, already classified
//! - [`ApiError`]: the HTTP-facing taxonomy every handler maps into
//!
//! In-stream failures never become errors. They are rendered by the event
//! translator as error-bearing wire events so a watch session keeps running.

use config::ConfigError;
use warp::http::StatusCode;

#[doc(hidden)]
pub type Result<T> = std::result::Result<T, Error>;

pub type GatewayResult<T> = std::result::Result<T, GatewayError>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration loading or validation failures
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Resource store failures that escaped request handling
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    /// Disk or socket failures
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to send shutdown signal: {0}")]
    SignalSenderClosed(String),

    /// Unrecoverable failures requiring process termination
    #[error("Fatal error: {0}")]
    Fatal(String),
}

/// Classified resource store failure.
///
/// Handlers only look at the variant; the payload is for humans and logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GatewayError {
    #[error("{kind} {namespace}/{name} not found")]
    NotFound {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    #[error("{kind} {namespace}/{name} already exists")]
    AlreadyExists {
        kind: &'static str,
        namespace: String,
        name: String,
    },

    /// Optimistic concurrency failure (stale resourceVersion)
    #[error("{kind} {namespace}/{name} was modified: expected resourceVersion {expected}, found {actual}")]
    Conflict {
        kind: &'static str,
        namespace: String,
        name: String,
        expected: String,
        actual: String,
    },

    #[error("invalid label selector: {0}")]
    InvalidSelector(String),

    /// Anything not otherwise classified (network, serialization, store internals)
    #[error("upstream failure: {0}")]
    Upstream(String),
}

impl GatewayError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, GatewayError::AlreadyExists { .. })
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, GatewayError::Conflict { .. })
    }
}

/// HTTP-facing error taxonomy.
///
/// Validation variants are produced before any collaborator is called.
/// The remaining variants are produced by classifying a [`GatewayError`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid namespace format")]
    InvalidNamespace,

    #[error("invalid deployment name format")]
    InvalidName,

    /// Malformed request body or query
    #[error("{0}")]
    InvalidBody(String),

    #[error("unsupported Content-Type, use application/json or application/yaml")]
    UnsupportedMediaType,

    #[error("{0}")]
    NotFound(String),

    /// Already-exists on create, version conflict on update
    #[error("{0}")]
    Conflict(String),

    /// Gateway, network or serialization failures not otherwise classified
    #[error("{0}")]
    Upstream(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::InvalidNamespace | ApiError::InvalidName | ApiError::InvalidBody(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Upstream(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
