//! Client-side checks run before any network call.

use crate::defaults::PASSWORD_MIN_LEN;
use crate::error::{Error, Result};

/// Password policy enforced at signup.
///
/// Returns the first rule the password breaks.
pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < PASSWORD_MIN_LEN {
        return Err(Error::Validation(format!(
            "Password must be at least {} characters long",
            PASSWORD_MIN_LEN
        )));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(Error::Validation(
            "Password must contain at least one uppercase letter".to_string(),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(Error::Validation(
            "Password must contain at least one number".to_string(),
        ));
    }
    Ok(())
}

/// Full signup form check: required fields, matching confirmation, policy.
pub fn validate_signup(
    username: &str,
    email: &str,
    password: &str,
    confirmation: &str,
) -> Result<()> {
    if username.trim().is_empty() {
        return Err(Error::Validation("Username is required".to_string()));
    }
    if email.trim().is_empty() {
        return Err(Error::Validation("Email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(Error::Validation(format!("Invalid email address: {}", email)));
    }
    if password != confirmation {
        return Err(Error::Validation("Passwords do not match".to_string()));
    }
    validate_password(password)
}

/// Login needs both fields; the server decides the rest.
pub fn validate_login(identifier: &str, password: &str) -> Result<()> {
    if identifier.trim().is_empty() || password.is_empty() {
        return Err(Error::Validation(
            "Username or email and password are required".to_string(),
        ));
    }
    Ok(())
}
