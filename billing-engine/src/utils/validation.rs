//! Input validation helpers
//!
//! Text length limits for member and owner fields.

use crate::billing::error::BillingError;

/// Member and business names
pub const MAX_NAME_LEN: usize = 200;

/// Short identifiers: mobile number, search terms
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), BillingError> {
    if value.trim().is_empty() {
        return Err(BillingError::invalid(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(BillingError::invalid(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), BillingError> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(BillingError::invalid(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        )));
    }
    Ok(())
}

/// Trim an optional field; blank becomes `None`
pub fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
