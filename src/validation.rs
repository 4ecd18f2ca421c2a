//! Boundary validators. Service entry points validate caller input here;
//! everything past the boundary works on already-validated data.

use uuid::Uuid;

use crate::errors::{AppError, AppResult};

/// Validates that a string is a well-formed UUID and returns it in
/// canonical (lowercase hyphenated) form.
pub fn ensure_id(value: &str, field: &str) -> AppResult<String> {
    Uuid::parse_str(value.trim())
        .map(|id| id.to_string())
        .map_err(|_| AppError::validation(field, "Invalid id"))
}

/// Validates an optional id; `None` passes through.
pub fn ensure_optional_id(value: Option<&str>, field: &str) -> AppResult<Option<String>> {
    match value {
        None => Ok(None),
        Some(v) => ensure_id(v, field).map(Some),
    }
}

/// Validates that a string is not blank. Returns the trimmed string.
pub fn non_blank(value: &str, field: &str) -> AppResult<String> {
    let trimmed = value.trim().to_string();
    if trimmed.is_empty() {
        Err(AppError::validation(field, "Must not be blank"))
    } else {
        Ok(trimmed)
    }
}
