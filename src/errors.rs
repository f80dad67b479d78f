use crate::services::backend::BackendError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::fmt;
use thiserror::Error;

/// Failure of a filesystem operation, carrying the path it concerned.
#[derive(Debug, Error)]
pub enum FsError {
    #[error("`{0}`: no such file or directory")]
    NotFound(String),
    #[error("`{0}`: permission denied (read-only gateway)")]
    PermissionDenied(String),
    #[error("`{path}`: unsupported operation: {reason}")]
    Unsupported { path: String, reason: String },
    #[error("`{path}`: invalid argument: {reason}")]
    InvalidArgument { path: String, reason: String },
    #[error("`{0}`: not a regular file")]
    NotAFile(String),
    #[error("`{0}`: not a directory")]
    NotADirectory(String),
    #[error("`{0}`: already exists")]
    AlreadyExists(String),
    #[error("`{0}`: request cancelled")]
    Cancelled(String),
    #[error("`{path}`: backend timed out during {op}")]
    TimedOut { op: &'static str, path: String },
    #[error("`{path}`: staging failed: {source}")]
    Staging {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("`{path}`: backend {op} failed: {source}")]
    Backend {
        op: &'static str,
        path: String,
        #[source]
        source: BackendError,
    },
}

pub type FsResult<T> = Result<T, FsError>;

impl FsError {
    pub fn unsupported(path: impl Into<String>, reason: impl Into<String>) -> Self {
        FsError::Unsupported {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        FsError::InvalidArgument {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Attach operation and path context to a backend failure.
    pub fn backend(op: &'static str, path: impl Into<String>, err: BackendError) -> Self {
        let path = path.into();
        match err {
            BackendError::NotFound => FsError::NotFound(path),
            BackendError::Cancelled => FsError::Cancelled(path),
            BackendError::Timeout(_) => FsError::TimedOut { op, path },
            source => FsError::Backend { op, path, source },
        }
    }

    /// Status code the protocol layer should report for this failure.
    pub fn sftp_status(&self) -> SftpStatus {
        match self {
            FsError::NotFound(_) => SftpStatus::NoSuchFile,
            FsError::PermissionDenied(_) => SftpStatus::PermissionDenied,
            FsError::Unsupported { .. } => SftpStatus::OpUnsupported,
            FsError::InvalidArgument { .. } => SftpStatus::BadMessage,
            FsError::NotAFile(_)
            | FsError::NotADirectory(_)
            | FsError::AlreadyExists(_)
            | FsError::Cancelled(_)
            | FsError::TimedOut { .. }
            | FsError::Staging { .. }
            | FsError::Backend { .. } => SftpStatus::Failure,
        }
    }
}

/// SFTP status codes (draft-ietf-secsh-filexfer-02, section 7).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SftpStatus {
    Ok = 0,
    Eof = 1,
    NoSuchFile = 2,
    PermissionDenied = 3,
    Failure = 4,
    BadMessage = 5,
    OpUnsupported = 8,
}

impl SftpStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SftpStatus::Ok => "ok",
            SftpStatus::Eof => "eof",
            SftpStatus::NoSuchFile => "no_such_file",
            SftpStatus::PermissionDenied => "permission_denied",
            SftpStatus::Failure => "failure",
            SftpStatus::BadMessage => "bad_message",
            SftpStatus::OpUnsupported => "op_unsupported",
        }
    }
}

/// HTTP-facing error for the dev transport.
#[derive(Debug)]
pub struct AppError {
    pub status: StatusCode,
    pub code: SftpStatus,
    pub message: String,
}

impl AppError {
    pub fn new(status: StatusCode, msg: impl Into<String>) -> Self {
        Self {
            status,
            code: SftpStatus::Failure,
            message: msg.into(),
        }
    }

    /// Shortcut for a 400 Bad Request
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: SftpStatus::BadMessage,
            message: msg.into(),
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for AppError {}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "status": self.status.as_u16(),
            "code": self.code.as_str(),
        }));

        (self.status, body).into_response()
    }
}

impl From<FsError> for AppError {
    fn from(err: FsError) -> Self {
        let status = match &err {
            FsError::NotFound(_) => StatusCode::NOT_FOUND,
            FsError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            FsError::Unsupported { .. } => StatusCode::NOT_IMPLEMENTED,
            FsError::InvalidArgument { .. } | FsError::NotAFile(_) | FsError::NotADirectory(_) => {
                StatusCode::BAD_REQUEST
            }
            FsError::AlreadyExists(_) => StatusCode::CONFLICT,
            FsError::Cancelled(_) => StatusCode::REQUEST_TIMEOUT,
            FsError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
            FsError::Staging { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            FsError::Backend { .. } => StatusCode::BAD_GATEWAY,
        };
        Self {
            status,
            code: err.sftp_status(),
            message: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_not_found_becomes_fs_not_found() {
        let err = FsError::backend("head_object", "/b1/x", BackendError::NotFound);
        assert!(matches!(err, FsError::NotFound(ref p) if p == "/b1/x"));
        assert_eq!(err.sftp_status(), SftpStatus::NoSuchFile);
    }

    #[test]
    fn backend_failure_keeps_context() {
        let io = std::io::Error::other("connection reset");
        let err = FsError::backend("get_object_range", "/b1/x", BackendError::Io(io));
        let msg = err.to_string();
        assert!(msg.contains("/b1/x"));
        assert!(msg.contains("get_object_range"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn http_mapping() {
        let app: AppError = FsError::PermissionDenied("/b1".into()).into();
        assert_eq!(app.status, StatusCode::FORBIDDEN);
        assert_eq!(app.code, SftpStatus::PermissionDenied);

        let app: AppError = FsError::unsupported("/a/b/c", "too deep").into();
        assert_eq!(app.status, StatusCode::NOT_IMPLEMENTED);
    }
}
