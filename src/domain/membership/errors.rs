//! Membership-specific error types.

use thiserror::Error;

use crate::domain::foundation::{DomainError, ErrorCode, LevelId, MembershipId, UserId, ValidationError};

use super::MembershipStatus;

/// Errors returned by membership lifecycle operations.
///
/// Not-found and invalid-transition variants guarantee that nothing was
/// written. `Storage` carries whatever the backing store reported.
#[derive(Debug, Clone, Error)]
pub enum MembershipError {
    #[error("Membership {0} not found")]
    NotFound(MembershipId),

    #[error("No membership found for user {user_id} in level {level_id}")]
    NotFoundForPair { user_id: UserId, level_id: LevelId },

    #[error("Level {0} not found")]
    LevelNotFound(LevelId),

    #[error("Cannot move membership {membership_id} from {from} to {to}")]
    InvalidTransition {
        membership_id: MembershipId,
        from: MembershipStatus,
        to: MembershipStatus,
    },

    #[error("Validation failed for '{field}': {message}")]
    ValidationFailed { field: String, message: String },

    #[error(transparent)]
    Storage(#[from] DomainError),
}

impl MembershipError {
    pub fn not_found(id: MembershipId) -> Self {
        MembershipError::NotFound(id)
    }

    pub fn not_found_for_pair(user_id: UserId, level_id: LevelId) -> Self {
        MembershipError::NotFoundForPair { user_id, level_id }
    }

    pub fn invalid_transition(
        membership_id: MembershipId,
        from: MembershipStatus,
        to: MembershipStatus,
    ) -> Self {
        MembershipError::InvalidTransition {
            membership_id,
            from,
            to,
        }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        MembershipError::ValidationFailed {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            MembershipError::NotFound(_) | MembershipError::NotFoundForPair { .. } => {
                ErrorCode::MembershipNotFound
            }
            MembershipError::LevelNotFound(_) => ErrorCode::LevelNotFound,
            MembershipError::InvalidTransition { .. } => ErrorCode::InvalidStateTransition,
            MembershipError::ValidationFailed { .. } => ErrorCode::ValidationFailed,
            MembershipError::Storage(err) => err.code,
        }
    }

    /// True when the referenced membership or level does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            MembershipError::NotFound(_)
                | MembershipError::NotFoundForPair { .. }
                | MembershipError::LevelNotFound(_)
        )
    }

    /// True when the state machine rejected the operation.
    pub fn is_invalid_transition(&self) -> bool {
        matches!(self, MembershipError::InvalidTransition { .. })
    }
}

impl From<ValidationError> for MembershipError {
    fn from(err: ValidationError) -> Self {
        match err {
            ValidationError::EmptyField { field } => {
                MembershipError::validation(field, "cannot be empty")
            }
            ValidationError::OutOfRange {
                field,
                min,
                max,
                actual,
            } => MembershipError::validation(
                field,
                format!("must be between {} and {}, got {}", min, max, actual),
            ),
            ValidationError::InvalidFormat { field, reason } => {
                MembershipError::validation(field, reason)
            }
        }
    }
}

impl From<MembershipError> for DomainError {
    fn from(err: MembershipError) -> Self {
        match err {
            MembershipError::Storage(inner) => inner,
            other => DomainError::new(other.code(), other.to_string()),
        }
    }
}
