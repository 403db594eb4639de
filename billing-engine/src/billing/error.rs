//! Billing error taxonomy

use shared::error::{AppError, ErrorCode};
use shared::models::UnknownChannel;
use std::fmt;
use thiserror::Error;

use crate::db::repository::RepoError;

/// Entity a lookup failed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Owner,
    Member,
    Record,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Owner => write!(f, "Owner"),
            Entity::Member => write!(f, "Member"),
            Entity::Record => write!(f, "Record"),
        }
    }
}

/// Errors surfaced by every billing operation
///
/// Input errors are raised before any write. `ConflictAborted` means the
/// transaction was rolled back and the whole operation may be retried.
#[derive(Debug, Error)]
pub enum BillingError {
    #[error("{message}")]
    InvalidInput { code: ErrorCode, message: String },

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("{entity} not found: {key}")]
    NotFound { entity: Entity, key: String },

    #[error("Write conflict, transaction aborted: {0}")]
    ConflictAborted(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl BillingError {
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
        }
    }

    pub fn invalid_amount(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::PaymentInvalidAmount,
            message: message.into(),
        }
    }

    pub fn invalid_plan(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            code: ErrorCode::InvalidPlanDuration,
            message: message.into(),
        }
    }

    pub fn duplicate_name(name: &str) -> Self {
        Self::InvalidInput {
            code: ErrorCode::MemberNameExists,
            message: format!("A member named '{name}' already exists"),
        }
    }

    pub fn owner_not_found(owner_id: i64) -> Self {
        Self::NotFound {
            entity: Entity::Owner,
            key: owner_id.to_string(),
        }
    }

    pub fn member_not_found(member_id: i64) -> Self {
        Self::NotFound {
            entity: Entity::Member,
            key: member_id.to_string(),
        }
    }

    /// Only aborted transactions are safe to replay
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConflictAborted(_))
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidInput { code, .. } => *code,
            Self::InvalidDate(_) => ErrorCode::InvalidBillingDate,
            Self::NotFound { entity, .. } => match entity {
                Entity::Owner => ErrorCode::TenantNotFound,
                Entity::Member => ErrorCode::MemberNotFound,
                Entity::Record => ErrorCode::NotFound,
            },
            Self::ConflictAborted(_) => ErrorCode::LedgerWriteConflict,
            Self::StorageUnavailable(_) => ErrorCode::StorageUnavailable,
            Self::Storage(_) => ErrorCode::DatabaseError,
        }
    }
}

impl From<RepoError> for BillingError {
    fn from(err: RepoError) -> Self {
        match err {
            RepoError::NotFound(key) => Self::NotFound {
                entity: Entity::Record,
                key,
            },
            RepoError::Duplicate(msg) => Self::InvalidInput {
                code: ErrorCode::AlreadyExists,
                message: msg,
            },
            RepoError::Validation(msg) => Self::invalid(msg),
            RepoError::Conflict(msg) => Self::ConflictAborted(msg),
            RepoError::Unavailable(msg) => Self::StorageUnavailable(msg),
            RepoError::Database(msg) => Self::Storage(msg),
        }
    }
}

impl From<sqlx::Error> for BillingError {
    fn from(err: sqlx::Error) -> Self {
        RepoError::from(err).into()
    }
}

impl From<UnknownChannel> for BillingError {
    fn from(err: UnknownChannel) -> Self {
        Self::InvalidInput {
            code: ErrorCode::PaymentInvalidMethod,
            message: err.to_string(),
        }
    }
}

impl From<BillingError> for AppError {
    fn from(err: BillingError) -> Self {
        let code = err.code();
        if matches!(err, BillingError::Storage(_)) {
            tracing::error!(error = %err, "Billing storage error");
        }
        AppError::with_message(code, err.to_string())
    }
}

pub type BillingResult<T> = Result<T, BillingError>;
