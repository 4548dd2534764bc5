//! HTTP rendering of core errors

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use dockhand_common::Error;
use serde::Serialize;
use tracing::{error, warn};

/// Error returned by API handlers
#[derive(Debug)]
pub struct ApiError {
    pub error: Error,
    /// Path the request was aimed at, when it differs from the session's
    pub path: Option<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl ApiError {
    pub fn at_path(error: Error, path: impl Into<String>) -> Self {
        Self {
            error,
            path: Some(path.into()),
        }
    }

    pub fn status(&self) -> StatusCode {
        status_for(&self.error)
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        Self { error, path: None }
    }
}

/// Status code for a core error
pub fn status_for(err: &Error) -> StatusCode {
    match err {
        Error::Path(_) | Error::NotFound { .. } => StatusCode::NOT_FOUND,
        Error::PermissionDenied(_) => StatusCode::FORBIDDEN,
        Error::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        Error::ArchiveFormat(_) | Error::Runtime(_) => StatusCode::BAD_GATEWAY,
        Error::RemoteUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(kind = self.error.kind(), "request failed: {}", self.error);
        } else {
            warn!(kind = self.error.kind(), "request rejected: {}", self.error);
        }

        let body = ErrorBody {
            error: self.error.to_string(),
            kind: self.error.kind(),
            path: self.path,
        };
        (status, Json(body)).into_response()
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(&Error::Path("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&Error::not_found("session", "1")), StatusCode::NOT_FOUND);
        assert_eq!(status_for(&Error::PermissionDenied("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_for(&Error::InvalidRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&Error::ArchiveFormat("x".into())), StatusCode::BAD_GATEWAY);
        assert_eq!(
            status_for(&Error::RemoteUnavailable("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(&Error::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_attempted_path_is_kept() {
        let err = ApiError::at_path(Error::Path("Unknown error".into()), "/nope");
        assert_eq!(err.path.as_deref(), Some("/nope"));
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }
}
