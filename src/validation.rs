//! User Field Validation
//! Mission: Enforce username/password/email format rules

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::UserPatch;

lazy_static! {
    static ref EMAIL_REGEX: Regex =
        Regex::new(r"^[a-z]+[a-z0-9]*@[a-z]+\.[a-z]{2,5}$").expect("email regex");
}

/// Validation policy knobs resolved from configuration.
#[derive(Debug, Clone, Copy)]
pub struct ValidationPolicy {
    /// Restrict usernames to ASCII alphanumerics. When off, Unicode
    /// letters and digits are accepted as well.
    pub ascii_usernames: bool,
}

impl Default for ValidationPolicy {
    fn default() -> Self {
        Self {
            ascii_usernames: true,
        }
    }
}

/// A field that failed format validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    InvalidUsername,
    InvalidPassword,
    InvalidEmail,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::InvalidUsername => write!(f, "invalid username"),
            ValidationError::InvalidPassword => write!(f, "invalid password"),
            ValidationError::InvalidEmail => write!(f, "invalid email"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Validate the fields present in a patch document. Absent fields are not
/// checked.
pub fn validate_patch(patch: &UserPatch, policy: ValidationPolicy) -> Result<(), ValidationError> {
    if let Some(username) = &patch.username {
        if !valid_username(username, policy.ascii_usernames) {
            return Err(ValidationError::InvalidUsername);
        }
    }
    if let Some(password) = &patch.password {
        if !valid_password(password) {
            return Err(ValidationError::InvalidPassword);
        }
    }
    if let Some(email) = &patch.email {
        if !valid_email(email) {
            return Err(ValidationError::InvalidEmail);
        }
    }
    Ok(())
}

fn valid_username(username: &str, ascii_only: bool) -> bool {
    if username.chars().count() <= 8 {
        return false;
    }
    username.chars().all(|c| {
        if ascii_only {
            c.is_ascii_alphanumeric()
        } else {
            c.is_alphanumeric()
        }
    })
}

// Passwords stay ASCII regardless of the username policy: they must survive
// the Basic auth envelope unambiguously.
fn valid_password(password: &str) -> bool {
    if password.len() <= 8 {
        return false;
    }
    let (mut lower, mut upper, mut digit) = (false, false, false);
    for c in password.chars() {
        if c.is_ascii_lowercase() {
            lower = true;
        } else if c.is_ascii_uppercase() {
            upper = true;
        } else if c.is_ascii_digit() {
            digit = true;
        } else {
            return false;
        }
    }
    lower && upper && digit
}

fn valid_email(email: &str) -> bool {
    EMAIL_REGEX.is_match(&email.to_lowercase())
}
