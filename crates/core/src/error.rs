//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Raised before anything leaves the process: malformed form input or an
/// identifier that cannot be used. Transport and authentication failures
/// belong to the client crate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. malformed email, unknown priority).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An identifier was invalid (e.g. blank tenant id).
    #[error("invalid identifier: {0}")]
    InvalidId(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_id(msg: impl Into<String>) -> Self {
        Self::InvalidId(msg.into())
    }

    /// Fail with a validation error unless `condition` holds.
    pub fn ensure(condition: bool, msg: impl Into<String>) -> DomainResult<()> {
        if condition {
            Ok(())
        } else {
            Err(Self::validation(msg))
        }
    }
}
