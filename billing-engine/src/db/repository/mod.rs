//! Repository Module
//!
//! Free async functions over an explicit `&mut SqliteConnection`. Callers
//! pass `&mut *tx` for writes so that every statement of one logical
//! operation shares a transaction, or a pooled connection for plain reads.
//! Every query is scoped by `owner_id`.

pub mod ledger;
pub mod member;
pub mod owner;
pub mod rollup;

use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// SQLite busy/locked: the transaction lost a write race
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

// SQLite primary result codes (extended code & 0xff)
const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => RepoError::NotFound("row not found".into()),
            sqlx::Error::Database(db) => {
                if db.is_unique_violation() {
                    return RepoError::Duplicate(db.message().to_string());
                }
                if db.is_foreign_key_violation() || db.is_check_violation() {
                    return RepoError::Validation(db.message().to_string());
                }
                let primary = db
                    .code()
                    .and_then(|c| c.parse::<i32>().ok())
                    .map(|c| c & 0xff);
                match primary {
                    Some(SQLITE_BUSY) | Some(SQLITE_LOCKED) => {
                        RepoError::Conflict(db.message().to_string())
                    }
                    _ => RepoError::Database(db.message().to_string()),
                }
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                RepoError::Unavailable(err.to_string())
            }
            _ => RepoError::Database(err.to_string()),
        }
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;
