//! Result taxonomy exposed by the lifecycle layer.

use std::fmt;

use thiserror::Error;

use pharmacy_core::DomainError;

use crate::entity_store::StoreError;

pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Step of a multi-write sequence that did not complete.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FailedStep {
    /// Writing the notification that follows a committed change.
    Notification,
    /// Removing the rows of an order that could not be placed completely.
    Compensation,
    /// Marking drained notifications as sent.
    Delivery,
}

impl FailedStep {
    pub fn as_str(self) -> &'static str {
        match self {
            FailedStep::Notification => "notification",
            FailedStep::Compensation => "compensation",
            FailedStep::Delivery => "delivery",
        }
    }
}

impl fmt::Display for FailedStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by guards, the order lifecycle manager, and the
/// notification emitter.
///
/// `Validation`, `Reference` and `Conflict` are always raised before any
/// write. `PartialFailure` means some writes committed; `step` names the one
/// that did not.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("dangling reference: {0}")]
    Reference(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    #[error("partial failure at {step}: {message}")]
    PartialFailure { step: FailedStep, message: String },

    #[error(transparent)]
    Store(StoreError),
}

impl LifecycleError {
    pub fn partial(step: FailedStep, message: impl Into<String>) -> Self {
        Self::PartialFailure {
            step,
            message: message.into(),
        }
    }

    pub fn is_partial_failure(&self) -> bool {
        matches!(self, LifecycleError::PartialFailure { .. })
    }
}

impl From<DomainError> for LifecycleError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(msg) => LifecycleError::Validation(msg),
            DomainError::Reference(msg) => LifecycleError::Reference(msg),
            DomainError::Conflict(msg) => LifecycleError::Conflict(msg),
            DomainError::NotFound(msg) => LifecycleError::NotFound(msg),
            e @ DomainError::InvalidTransition { .. } => LifecycleError::Validation(e.to_string()),
            e @ DomainError::Decode(_) => LifecycleError::Store(StoreError::Record(e)),
        }
    }
}

impl From<StoreError> for LifecycleError {
    fn from(err: StoreError) -> Self {
        match err {
            e @ StoreError::NotFound { .. } => LifecycleError::NotFound(e.to_string()),
            StoreError::Concurrency(msg) => LifecycleError::ConcurrencyConflict(msg),
            StoreError::DanglingReference(msg) => LifecycleError::Reference(msg),
            StoreError::Restricted(msg) => LifecycleError::Conflict(msg),
            StoreError::Record(domain) => domain.into(),
            other => LifecycleError::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pharmacy_core::EntityKind;

    #[test]
    fn store_errors_map_to_taxonomy() {
        let not_found: LifecycleError = StoreError::NotFound {
            kind: EntityKind::Order,
            id: 7,
        }
        .into();
        assert!(matches!(not_found, LifecycleError::NotFound(_)));

        let stale: LifecycleError = StoreError::Concurrency("v1".into()).into();
        assert_eq!(stale, LifecycleError::ConcurrencyConflict("v1".into()));

        let dangling: LifecycleError = StoreError::DanglingReference("x".into()).into();
        assert_eq!(dangling, LifecycleError::Reference("x".into()));

        let restricted: LifecycleError = StoreError::Restricted("x".into()).into();
        assert_eq!(restricted, LifecycleError::Conflict("x".into()));

        let down: LifecycleError = StoreError::Unavailable("timeout".into()).into();
        assert_eq!(down, LifecycleError::Store(StoreError::Unavailable("timeout".into())));
    }

    #[test]
    fn invalid_transition_is_a_validation_error() {
        let err: LifecycleError = DomainError::invalid_transition("Delivered", "Pending").into();
        assert!(matches!(err, LifecycleError::Validation(m) if m.contains("Delivered -> Pending")));
    }

    #[test]
    fn decode_failures_stay_store_errors() {
        let err: LifecycleError = StoreError::Record(DomainError::decode("bad status")).into();
        assert!(matches!(err, LifecycleError::Store(StoreError::Record(_))));
    }

    #[test]
    fn partial_failure_names_step() {
        let err = LifecycleError::partial(FailedStep::Notification, "store down");
        assert!(err.is_partial_failure());
        assert_eq!(err.to_string(), "partial failure at notification: store down");
    }
}
