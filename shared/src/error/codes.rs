//! Unified error codes for the billing workspace
//!
//! Error codes are organized by category:
//! - 0xxx: General errors
//! - 3xxx: Tenant (owner) errors
//! - 4xxx: Member errors
//! - 5xxx: Payment / ledger errors
//! - 9xxx: System errors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unified error code enum
///
/// All error codes are represented as u16 values for efficient serialization
/// and cross-language compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
#[repr(u16)]
pub enum ErrorCode {
    // ==================== 0xxx: General ====================
    /// Operation completed successfully
    Success = 0,
    /// Unknown error
    Unknown = 1,
    /// Validation failed
    ValidationFailed = 2,
    /// Resource not found
    NotFound = 3,
    /// Resource already exists
    AlreadyExists = 4,

    // ==================== 3xxx: Tenant ====================
    /// Owner account not found
    TenantNotFound = 3002,

    // ==================== 4xxx: Member ====================
    /// Member not found (or not owned by the requesting owner)
    MemberNotFound = 4001,
    /// Member name already used by this owner
    MemberNameExists = 4002,
    /// Plan duration must be at least one month
    InvalidPlanDuration = 4003,

    // ==================== 5xxx: Payment ====================
    /// Amount is negative, too large or not a number
    PaymentInvalidAmount = 5002,
    /// Unknown payment channel
    PaymentInvalidMethod = 5003,
    /// Date is malformed or outside the supported range
    InvalidBillingDate = 5004,
    /// Concurrent write to the same ledger row aborted the transaction
    LedgerWriteConflict = 5005,

    // ==================== 9xxx: System ====================
    /// Internal server error
    InternalError = 9001,
    /// Database error
    DatabaseError = 9002,
    /// Configuration error
    ConfigError = 9005,

    // ==================== 94xx: Storage ====================
    /// Storage unreachable
    StorageUnavailable = 9401,
}

impl ErrorCode {
    /// Get the numeric code value
    #[inline]
    pub const fn code(&self) -> u16 {
        *self as u16
    }

    /// Check if this is a success code
    #[inline]
    pub const fn is_success(&self) -> bool {
        matches!(self, ErrorCode::Success)
    }

    /// Whether the caller may safely retry the whole operation
    #[inline]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ErrorCode::LedgerWriteConflict)
    }

    /// Get the developer-facing English message for this error code
    pub const fn message(&self) -> &'static str {
        match self {
            // General
            ErrorCode::Success => "Operation completed successfully",
            ErrorCode::Unknown => "An unknown error occurred",
            ErrorCode::ValidationFailed => "Validation failed",
            ErrorCode::NotFound => "Resource not found",
            ErrorCode::AlreadyExists => "Resource already exists",

            // Tenant
            ErrorCode::TenantNotFound => "Owner account not found",

            // Member
            ErrorCode::MemberNotFound => "Member not found",
            ErrorCode::MemberNameExists => "Member name already exists",
            ErrorCode::InvalidPlanDuration => "Plan duration must be at least one month",

            // Payment
            ErrorCode::PaymentInvalidAmount => "Invalid payment amount",
            ErrorCode::PaymentInvalidMethod => "Invalid payment channel",
            ErrorCode::InvalidBillingDate => "Invalid billing date",
            ErrorCode::LedgerWriteConflict => "Concurrent ledger write, please retry",

            // System
            ErrorCode::InternalError => "Internal server error",
            ErrorCode::DatabaseError => "Database error",
            ErrorCode::ConfigError => "Configuration error",

            // Storage
            ErrorCode::StorageUnavailable => "Storage unavailable",
        }
    }
}

impl From<ErrorCode> for u16 {
    #[inline]
    fn from(code: ErrorCode) -> Self {
        code.code()
    }
}

/// Error when converting from an invalid u16 to ErrorCode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidErrorCode(pub u16);

impl fmt::Display for InvalidErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid error code: {}", self.0)
    }
}

impl std::error::Error for InvalidErrorCode {}

impl TryFrom<u16> for ErrorCode {
    type Error = InvalidErrorCode;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        match value {
            // General
            0 => Ok(ErrorCode::Success),
            1 => Ok(ErrorCode::Unknown),
            2 => Ok(ErrorCode::ValidationFailed),
            3 => Ok(ErrorCode::NotFound),
            4 => Ok(ErrorCode::AlreadyExists),

            // Tenant
            3002 => Ok(ErrorCode::TenantNotFound),

            // Member
            4001 => Ok(ErrorCode::MemberNotFound),
            4002 => Ok(ErrorCode::MemberNameExists),
            4003 => Ok(ErrorCode::InvalidPlanDuration),

            // Payment
            5002 => Ok(ErrorCode::PaymentInvalidAmount),
            5003 => Ok(ErrorCode::PaymentInvalidMethod),
            5004 => Ok(ErrorCode::InvalidBillingDate),
            5005 => Ok(ErrorCode::LedgerWriteConflict),

            // System
            9001 => Ok(ErrorCode::InternalError),
            9002 => Ok(ErrorCode::DatabaseError),
            9005 => Ok(ErrorCode::ConfigError),

            // Storage
            9401 => Ok(ErrorCode::StorageUnavailable),

            _ => Err(InvalidErrorCode(value)),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_values() {
        assert_eq!(ErrorCode::Success.code(), 0);
        assert_eq!(ErrorCode::NotFound.code(), 3);
        assert_eq!(ErrorCode::TenantNotFound.code(), 3002);
        assert_eq!(ErrorCode::MemberNotFound.code(), 4001);
        assert_eq!(ErrorCode::MemberNameExists.code(), 4002);
        assert_eq!(ErrorCode::PaymentInvalidMethod.code(), 5003);
        assert_eq!(ErrorCode::LedgerWriteConflict.code(), 5005);
        assert_eq!(ErrorCode::DatabaseError.code(), 9002);
        assert_eq!(ErrorCode::StorageUnavailable.code(), 9401);
    }

    #[test]
    fn test_is_success() {
        assert!(ErrorCode::Success.is_success());
        assert!(!ErrorCode::Unknown.is_success());
        assert!(!ErrorCode::MemberNotFound.is_success());
    }

    #[test]
    fn test_is_retryable() {
        assert!(ErrorCode::LedgerWriteConflict.is_retryable());
        assert!(!ErrorCode::StorageUnavailable.is_retryable());
        assert!(!ErrorCode::ValidationFailed.is_retryable());
    }

    #[test]
    fn test_try_from_valid() {
        assert_eq!(ErrorCode::try_from(0), Ok(ErrorCode::Success));
        assert_eq!(ErrorCode::try_from(4001), Ok(ErrorCode::MemberNotFound));
        assert_eq!(ErrorCode::try_from(5005), Ok(ErrorCode::LedgerWriteConflict));
        assert_eq!(ErrorCode::try_from(9401), Ok(ErrorCode::StorageUnavailable));
    }

    #[test]
    fn test_try_from_invalid() {
        assert_eq!(ErrorCode::try_from(999), Err(InvalidErrorCode(999)));
        assert_eq!(ErrorCode::try_from(1001), Err(InvalidErrorCode(1001)));
        assert_eq!(ErrorCode::try_from(10000), Err(InvalidErrorCode(10000)));
        // codes outside the billing catalogue
        assert_eq!(ErrorCode::try_from(5001), Err(InvalidErrorCode(5001)));
        assert_eq!(ErrorCode::try_from(9404), Err(InvalidErrorCode(9404)));
    }

    #[test]
    fn test_serialize() {
        let json = serde_json::to_string(&ErrorCode::MemberNotFound).unwrap();
        assert_eq!(json, "4001");

        let json = serde_json::to_string(&ErrorCode::Success).unwrap();
        assert_eq!(json, "0");
    }

    #[test]
    fn test_deserialize() {
        let code: ErrorCode = serde_json::from_str("5003").unwrap();
        assert_eq!(code, ErrorCode::PaymentInvalidMethod);

        let result: Result<ErrorCode, _> = serde_json::from_str("10000");
        assert!(result.is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ErrorCode::Success), "0");
        assert_eq!(format!("{}", ErrorCode::InvalidBillingDate), "5004");
    }

    #[test]
    fn test_message() {
        assert_eq!(ErrorCode::MemberNotFound.message(), "Member not found");
        assert_eq!(ErrorCode::InternalError.message(), "Internal server error");
    }
}
