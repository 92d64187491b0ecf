//! Domain error model.

use thiserror::Error;

/// Result type used across the domain layer.
pub type DomainResult<T> = Result<T, DomainError>;

/// Domain-level error.
///
/// Keep this focused on deterministic, business/domain failures (validation,
/// dangling references, orphaning conflicts). Store and transport concerns
/// belong elsewhere.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A value failed validation (e.g. quantity below one).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A foreign key does not resolve to an existing row.
    #[error("dangling reference: {0}")]
    Reference(String),

    /// The mutation would orphan dependent rows.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A requested row was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// An order status change that the lifecycle graph does not allow.
    #[error("invalid status transition: {from} -> {to}")]
    InvalidTransition { from: String, to: String },

    /// A persisted row could not be decoded into a record.
    #[error("row decode failed: {0}")]
    Decode(String),
}

impl DomainError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn reference(msg: impl Into<String>) -> Self {
        Self::Reference(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn invalid_transition(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::InvalidTransition {
            from: from.into(),
            to: to.into(),
        }
    }
}
