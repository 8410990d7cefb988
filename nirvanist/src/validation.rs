//! Shape checks applied to request input before it reaches business logic.

use crate::config::PasswordConfig;
use crate::errors::{Error, Result};
use crate::types::normalize_email;

pub const MAX_EMAIL_LENGTH: usize = 254;
pub const MAX_NAME_LENGTH: usize = 100;
pub const MAX_SUBJECT_LENGTH: usize = 200;
pub const MAX_CONTACT_MESSAGE_LENGTH: usize = 5000;

/// Normalize an email and check it looks deliverable.
///
/// Returns the normalized form. The message is used verbatim by every endpoint that takes an
/// email, so the client sees the same wording everywhere.
pub fn validate_email(email: &str) -> Result<String> {
    let email = normalize_email(email);
    if is_plausible_email(&email) {
        Ok(email)
    } else {
        Err(Error::validation("Valid email is required"))
    }
}

fn is_plausible_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH || email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty() && !domain.starts_with('.') && !domain.contains(".."),
        None => false,
    }
}

pub fn validate_password(password: &str, config: &PasswordConfig) -> Result<()> {
    let length = password.chars().count();
    if length < config.min_length {
        return Err(Error::validation(format!(
            "Password must be at least {} characters",
            config.min_length
        )));
    }
    if length > config.max_length {
        return Err(Error::validation(format!(
            "Password must be no more than {} characters",
            config.max_length
        )));
    }
    Ok(())
}

/// Trim a required free-text field and enforce its length cap.
pub fn required_text(field: &str, value: &str, max_length: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(format!("{field} is required")));
    }
    if value.chars().count() > max_length {
        return Err(Error::validation(format!(
            "{field} must be at most {max_length} characters"
        )));
    }
    Ok(value.to_string())
}

/// Required, non-empty opaque token from a link.
pub fn required_token(token: Option<&str>) -> Result<&str> {
    token
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::validation("Token is required"))
}
