// ============================
// crates/backend-lib/src/validation/mod.rs
// ============================
//! Structural validation of decoded request payloads.

use gateway_common::{NewUser, Updates};
use regex::Regex;
use std::sync::LazyLock;
use thiserror::Error;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321 SMTP limit
const MAX_PASSWORD_LENGTH: usize = 128;
const MAX_USER_NAME_LENGTH: usize = 50;
const MAX_PERSON_NAME_LENGTH: usize = 100;

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("valid email regex")
});

/// Possible validation errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("invalid email: {0}")]
    Email(String),

    #[error("invalid password: {0}")]
    Password(String),

    #[error("invalid user name: {0}")]
    UserName(String),

    #[error("invalid name: {0}")]
    PersonName(String),

    #[error("invalid user id: {0}")]
    UserId(String),

    #[error("no updates supplied")]
    EmptyUpdates,
}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trim and lower-case an email so lookups and uniqueness agree
pub fn normalize_email(email: &str) -> String {
    email.trim().to_ascii_lowercase()
}

/// Validate an email address
pub fn validate_email(email: &str) -> ValidationResult<&str> {
    if email.is_empty() {
        return Err(ValidationError::Email("email must not be empty".to_string()));
    }

    if email.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::Email(format!(
            "email cannot exceed {MAX_EMAIL_LENGTH} characters"
        )));
    }

    if !EMAIL_REGEX.is_match(email) {
        return Err(ValidationError::Email("email is not well-formed".to_string()));
    }

    Ok(email)
}

/// Validate a password and its confirmation
pub fn validate_password<'a>(
    password: &'a str,
    confirm: &str,
    min_length: usize,
) -> ValidationResult<&'a str> {
    let chars = password.chars().count();
    if chars < min_length {
        return Err(ValidationError::Password(format!(
            "password must be at least {min_length} characters"
        )));
    }

    if chars > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::Password(format!(
            "password cannot exceed {MAX_PASSWORD_LENGTH} characters"
        )));
    }

    if password != confirm {
        return Err(ValidationError::Password(
            "password and confirmation do not match".to_string(),
        ));
    }

    Ok(password)
}

/// Validate a user name
pub fn validate_user_name(user_name: &str) -> ValidationResult<&str> {
    if user_name.is_empty() {
        return Err(ValidationError::UserName("user name must not be empty".to_string()));
    }

    if user_name.chars().count() > MAX_USER_NAME_LENGTH {
        return Err(ValidationError::UserName(format!(
            "user name cannot exceed {MAX_USER_NAME_LENGTH} characters"
        )));
    }

    if user_name.chars().any(char::is_whitespace) {
        return Err(ValidationError::UserName(
            "user name must not contain spaces".to_string(),
        ));
    }

    Ok(user_name)
}

/// Validate a first or last name. Empty is allowed.
pub fn validate_person_name(name: &str) -> ValidationResult<&str> {
    if name.chars().count() > MAX_PERSON_NAME_LENGTH {
        return Err(ValidationError::PersonName(format!(
            "names cannot exceed {MAX_PERSON_NAME_LENGTH} characters"
        )));
    }

    if name.chars().any(char::is_control) {
        return Err(ValidationError::PersonName(
            "names must not contain control characters".to_string(),
        ));
    }

    Ok(name)
}

/// Validate a registration payload. Expects the email already normalized.
pub fn validate_new_user(new_user: &NewUser, min_password_length: usize) -> ValidationResult<()> {
    validate_email(&new_user.email)?;
    validate_password(&new_user.password, &new_user.password_confirm, min_password_length)?;
    validate_user_name(&new_user.user_name)?;
    validate_person_name(&new_user.first_name)?;
    validate_person_name(&new_user.last_name)?;
    Ok(())
}

/// Validate a profile update
pub fn validate_updates(updates: &Updates) -> ValidationResult<()> {
    if updates.is_empty() {
        return Err(ValidationError::EmptyUpdates);
    }
    if let Some(first) = &updates.first_name {
        validate_person_name(first)?;
    }
    if let Some(last) = &updates.last_name {
        validate_person_name(last)?;
    }
    Ok(())
}
