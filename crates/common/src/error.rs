//! Error types for Dockhand

use thiserror::Error;

/// Result type alias using Dockhand Error
pub type Result<T> = std::result::Result<T, Error>;

/// Dockhand error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Container runtime unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Error accessing path: {0}")]
    Path(String),

    #[error("Archive format error: {0}")]
    ArchiveFormat(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Resource not found: {kind} with id {id}")]
    NotFound { kind: String, id: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Container runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Build a path error from remote stderr, falling back to "Unknown error".
    pub fn from_remote_stderr(stderr: &str) -> Self {
        let message = stderr.trim();
        if message.is_empty() {
            return Error::Path("Unknown error".to_string());
        }
        if message.contains("Permission denied") || message.contains("Operation not permitted") {
            Error::PermissionDenied(message.to_string())
        } else {
            Error::Path(message.to_string())
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Whether the user can keep working after this error.
    ///
    /// Only an unreachable runtime halts the request; everything else is
    /// reported inline and leaves the session usable.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Error::RemoteUnavailable(_))
    }

    /// Short machine-readable tag used in API responses.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::RemoteUnavailable(_) => "remote_unavailable",
            Error::Path(_) => "path",
            Error::ArchiveFormat(_) => "archive_format",
            Error::PermissionDenied(_) => "permission_denied",
            Error::NotFound { .. } => "not_found",
            Error::InvalidRequest(_) => "invalid_request",
            Error::Runtime(_) => "runtime",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::InvalidConfig(_) => "invalid_config",
            Error::Internal(_) => "internal",
        }
    }
}

impl From<bollard::errors::Error> for Error {
    fn from(e: bollard::errors::Error) -> Self {
        match e {
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => match status_code {
                404 if message.starts_with("No such container") => {
                    let id = message
                        .trim_start_matches("No such container:")
                        .trim()
                        .to_string();
                    Error::NotFound {
                        kind: "container".to_string(),
                        id,
                    }
                }
                404 => Error::Path(message),
                403 => Error::PermissionDenied(message),
                400 if message.contains("not a directory") => Error::Path(message),
                _ => Error::Runtime(format!("{} (status {})", message, status_code)),
            },
            bollard::errors::Error::JsonDataError { message, .. } => Error::Runtime(message),
            other => Error::RemoteUnavailable(other.to_string()),
        }
    }
}
