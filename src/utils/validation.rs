//! Validation utilities

use crate::types::*;

/// Validate that a minor-unit amount is non-negative
pub fn validate_non_negative_minor(amount: i64, field: &str) -> EngineResult<()> {
    if amount < 0 {
        return Err(EngineError::Validation(format!(
            "{} must be non-negative, got {}",
            field, amount
        )));
    }
    Ok(())
}

/// Validate a currency code: three ASCII uppercase letters
pub fn validate_currency_code(code: &str) -> EngineResult<()> {
    if code.len() != 3 || !code.chars().all(|c| c.is_ascii_uppercase()) {
        return Err(EngineError::Validation(format!(
            "Invalid currency code '{}'",
            code
        )));
    }
    Ok(())
}

/// Validate an entity identifier passed through to storage
pub fn validate_entity_id(id: &str, field: &str) -> EngineResult<()> {
    if id.trim().is_empty() {
        return Err(EngineError::Validation(format!(
            "{} cannot be empty",
            field
        )));
    }
    if id.len() > 140 {
        return Err(EngineError::Validation(format!(
            "{} cannot exceed 140 characters",
            field
        )));
    }
    Ok(())
}
