//! Error types for Maestro runtime operations.
//!
//! This module defines the canonical error type used throughout the runtime
//! core. All subsystems return `Result<T, MaestroError>`. Every variant
//! maps to exactly one error kind (`spec.md` §7), which in turn maps to a
//! single HTTP status and a single CLI exit code — the tool surface and
//! the HTTP layer are thin wrappers over the same enum, never re-deriving
//! the mapping themselves.

use std::io;
use thiserror::Error;

/// Canonical error type for all Maestro runtime operations.
///
/// Uses `thiserror` for automatic `Display` and `Error` trait implementations.
#[derive(Error, Debug)]
pub enum MaestroError {
    /// Schema or enum violation in a tool/HTTP request.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Project/page/region/workspace/note/item could not be located.
    #[error("not found: {0}")]
    NotFound(String),

    /// Lock could not be acquired within the caller's deadline.
    #[error("conflict: {0}")]
    Conflict(String),

    /// On-disk JSON could not be parsed or normalized.
    #[error("corrupt store at {path}: {detail}")]
    Corrupt { path: String, detail: String },

    /// Chain-of-command or capability-token violation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Command-plane action name not in the closed set.
    #[error("unsupported action: {0}")]
    UnsupportedAction(String),

    /// I/O error (auto-converts from `std::io::Error`).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Anything else — never expected to surface to a well-behaved caller.
    #[error("internal error: {0}")]
    Internal(String),
}

impl MaestroError {
    /// The normative error kind name (`spec.md` §7), used verbatim in the
    /// `{error:{kind,...}}` HTTP envelope and in structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            MaestroError::InvalidArgument(_) => "InvalidArgument",
            MaestroError::NotFound(_) => "NotFound",
            MaestroError::Conflict(_) => "Conflict",
            MaestroError::Corrupt { .. } => "Corrupt",
            MaestroError::Forbidden(_) => "Forbidden",
            MaestroError::UnsupportedAction(_) => "UnsupportedAction",
            MaestroError::Io(_) => "Internal",
            MaestroError::Internal(_) => "Internal",
        }
    }

    /// HTTP status code aligned with the error kind (`spec.md` §6).
    pub fn http_status(&self) -> u16 {
        match self {
            MaestroError::InvalidArgument(_) | MaestroError::UnsupportedAction(_) => 400,
            MaestroError::Forbidden(_) => 403,
            MaestroError::NotFound(_) => 404,
            MaestroError::Conflict(_) => 409,
            MaestroError::Corrupt { .. } | MaestroError::Io(_) | MaestroError::Internal(_) => 500,
        }
    }

    /// CLI exit code aligned with the error kind (`spec.md` §6).
    pub fn exit_code(&self) -> i32 {
        match self {
            MaestroError::InvalidArgument(_) | MaestroError::UnsupportedAction(_) => 2,
            MaestroError::NotFound(_) => 3,
            MaestroError::Conflict(_) => 4,
            MaestroError::Corrupt { .. } => 5,
            MaestroError::Forbidden(_) => 1,
            MaestroError::Io(_) | MaestroError::Internal(_) => 1,
        }
    }

    pub fn corrupt(path: impl Into<String>, detail: impl std::fmt::Display) -> Self {
        MaestroError::Corrupt {
            path: path.into(),
            detail: detail.to_string(),
        }
    }
}

impl From<serde_json::Error> for MaestroError {
    fn from(e: serde_json::Error) -> Self {
        MaestroError::Corrupt {
            path: "<value>".to_string(),
            detail: e.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MaestroError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_argument_maps_to_400_and_exit_2() {
        let err = MaestroError::InvalidArgument("bad enum".to_string());
        assert_eq!(err.http_status(), 400);
        assert_eq!(err.exit_code(), 2);
        assert_eq!(err.kind(), "InvalidArgument");
    }

    #[test]
    fn not_found_maps_to_404_and_exit_3() {
        let err = MaestroError::NotFound("page A999".to_string());
        assert_eq!(err.http_status(), 404);
        assert_eq!(err.exit_code(), 3);
    }

    #[test]
    fn conflict_maps_to_409_and_exit_4() {
        let err = MaestroError::Conflict("lock timeout".to_string());
        assert_eq!(err.http_status(), 409);
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn corrupt_maps_to_500_and_exit_5() {
        let err = MaestroError::corrupt("index.json", "unexpected EOF");
        assert_eq!(err.http_status(), 500);
        assert_eq!(err.exit_code(), 5);
        assert_eq!(err.kind(), "Corrupt");
    }

    #[test]
    fn forbidden_maps_to_403() {
        let err = MaestroError::Forbidden("not commander".to_string());
        assert_eq!(err.http_status(), 403);
    }

    #[test]
    fn display_messages_are_stable() {
        let err = MaestroError::NotFound("x".to_string());
        assert_eq!(format!("{}", err), "not found: x");
    }
}
