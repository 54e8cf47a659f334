//! Crate-level errors and CLI exit codes.

use serde::Serialize;

use crate::scanner::{FingerprintError, HashError, IncompatibleSignature};

/// Errors raised while building or comparing image records.
///
/// Component errors are wrapped transparently so the original cause stays
/// reachable through [`std::error::Error::source`].
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Content hashing failed (unreadable or empty stream).
    #[error(transparent)]
    Hash(#[from] HashError),

    /// Perceptual fingerprinting failed (unreadable or undecodable image).
    #[error(transparent)]
    Fingerprint(#[from] FingerprintError),

    /// The records were fingerprinted with different configurations.
    #[error(transparent)]
    IncompatibleSignature(#[from] IncompatibleSignature),

    /// The similarity threshold is outside `[0, 1]`.
    #[error("Similarity threshold must be within [0, 1], got {0}")]
    InvalidThreshold(f64),
}

/// Convenience alias for results carrying [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Exit codes for the imgdupe binary.
///
/// - 0: Success (duplicates for `compare`, all records built for `fingerprint`)
/// - 1: General error
/// - 2: Not duplicates (`compare` completed, images differ)
/// - 3: Partial success (some files could not be fingerprinted)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    /// Completed normally.
    Success = 0,
    /// An unexpected error occurred.
    GeneralError = 1,
    /// Comparison completed and the images are not duplicates.
    NotDuplicate = 2,
    /// Completed, but some inputs failed.
    PartialSuccess = 3,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "ID000",
            Self::GeneralError => "ID001",
            Self::NotDuplicate => "ID002",
            Self::PartialSuccess => "ID003",
        }
    }
}

/// Structured error information for `--json-errors`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "ID001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message
    pub message: String,
    /// Messages of the underlying causes, outermost first
    pub causes: Vec<String>,
}

impl StructuredError {
    /// Create a new structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: err.to_string(),
            causes: err.chain().skip(1).map(ToString::to_string).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Success.as_i32(), 0);
        assert_eq!(ExitCode::GeneralError.as_i32(), 1);
        assert_eq!(ExitCode::NotDuplicate.as_i32(), 2);
        assert_eq!(ExitCode::PartialSuccess.as_i32(), 3);
        assert_eq!(ExitCode::NotDuplicate.code_prefix(), "ID002");
    }

    #[test]
    fn test_transparent_errors_keep_source() {
        let io = std::io::Error::other("boom");
        let err = Error::from(HashError::Read(io));
        assert_eq!(err.to_string(), "Failed to read stream: boom");
        assert_eq!(err.source().map(ToString::to_string).as_deref(), Some("boom"));
    }

    #[test]
    fn test_structured_error_lists_causes() {
        let err = anyhow::Error::new(Error::from(HashError::EmptyStream)).context("photo.jpg");
        let structured = StructuredError::new(&err, ExitCode::GeneralError);
        assert_eq!(structured.code, "ID001");
        assert_eq!(structured.message, "photo.jpg");
        assert_eq!(structured.causes, vec!["Stream is empty".to_string()]);
    }
}
