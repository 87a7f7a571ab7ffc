//! Input validation shared by the marketplace components.
//!
//! Each validator returns `Err(message)` describing the first problem found;
//! callers attach the field name.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Nepali mobile numbers: a leading 9 followed by nine digits
    static ref PHONE_REGEX: Regex = Regex::new(r"^9[0-9]{9}$").unwrap();

    /// Deliberately loose; delivery is the real check
    static ref EMAIL_REGEX: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

pub const MIN_PASSWORD_LEN: usize = 8;

/// Validate a phone number
pub fn validate_phone(phone: &str) -> Result<(), String> {
    if phone.is_empty() {
        return Err("Phone number is required".to_string());
    }
    if !PHONE_REGEX.is_match(phone) {
        return Err("Invalid phone number. Must be 10 digits starting with 9".to_string());
    }
    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }
    if email.len() > 254 {
        return Err("Email is too long (max 254 characters)".to_string());
    }
    if !EMAIL_REGEX.is_match(email) {
        return Err("Invalid email address".to_string());
    }
    Ok(())
}

/// Validate password complexity.
///
/// Requires at least eight characters with an uppercase letter, a lowercase
/// letter, a digit and a symbol.
pub fn validate_password_strength(password: &str) -> Result<(), String> {
    if password.is_empty() {
        return Err("Password is required".to_string());
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        ));
    }

    let has_uppercase = password.chars().any(|c| c.is_ascii_uppercase());
    let has_lowercase = password.chars().any(|c| c.is_ascii_lowercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_alphanumeric());

    if !has_uppercase {
        return Err("Password must contain at least one uppercase letter".to_string());
    }
    if !has_lowercase {
        return Err("Password must contain at least one lowercase letter".to_string());
    }
    if !has_digit {
        return Err("Password must contain at least one digit".to_string());
    }
    if !has_special {
        return Err("Password must contain at least one special character".to_string());
    }

    Ok(())
}

/// Validate a required free-text field
pub fn validate_required(value: &str, label: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} is required", label));
    }
    Ok(())
}

/// Parse a `YYYY-MM-DD` calendar date
pub fn parse_date(value: &str, label: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| format!("{} must be a date in YYYY-MM-DD format", label))
}

/// Validate a money amount
pub fn validate_amount(amount: f64, label: &str) -> Result<(), String> {
    if !amount.is_finite() || amount < 0.0 {
        return Err(format!("{} must be a non-negative number", label));
    }
    Ok(())
}
