//! Validation for the free-form strings that arrive on the command line:
//! subvolume names and the clean-label name.

use std::fmt;

/// A rejected name, carrying the field and the reason so the caller can
/// surface it as a configuration error with the offending input in the
/// message (spec §7, error kind 1).
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid {}: '{}' — {}",
            self.field, self.value, self.message
        )
    }
}

impl std::error::Error for ValidationError {}

pub type ValidationResult = Result<(), ValidationError>;

/// Validates a subvolume or label name: non-empty, no path separators,
/// no embedded NUL, not `.`/`..`, doesn't start with `-` (so it can't be
/// mistaken for a flag by an external tool) or `.` (hidden/relative).
pub fn validate_name(field: &'static str, value: &str) -> ValidationResult {
    let fail = |message: &str| ValidationError {
        field,
        value: value.to_string(),
        message: message.to_string(),
    };

    if value.is_empty() {
        return Err(fail("must not be empty"));
    }
    if value.len() > 255 {
        return Err(fail("must not exceed 255 characters"));
    }
    if value.contains('/') {
        return Err(fail("must not contain '/'"));
    }
    if value.contains('\0') {
        return Err(fail("must not contain a NUL byte"));
    }
    if value == "." || value == ".." {
        return Err(fail("must not be '.' or '..'"));
    }
    if value.starts_with('-') {
        return Err(fail("must not start with '-'"));
    }
    if value.starts_with('.') {
        return Err(fail("must not start with '.'"));
    }
    Ok(())
}
