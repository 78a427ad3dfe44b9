//! Email normalization, credential validation, and the confirmation state
//! machine.
//!
//! Normalization and validation are explicit functions invoked at the write
//! boundary (user creation, email change, password reset) -- never implicit
//! persistence hooks. The confirmation state is always computed from the
//! stored columns and never persisted as its own column.

use validator::ValidateEmail;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Minimum accepted password length, in bytes.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Normalize an email address for storage and lookup: trim surrounding
/// whitespace and lowercase.
///
/// Every email comparison in the system happens on normalized values, so
/// `Alice@Example.COM` and `alice@example.com` always refer to the same
/// account.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate that a (normalized) email address is non-empty and RFC-plausible.
pub fn validate_email(email: &str) -> Result<(), CoreError> {
    if email.is_empty() {
        return Err(CoreError::Validation("email must not be empty".into()));
    }
    if !email.validate_email() {
        return Err(CoreError::Validation(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(())
}

/// Validate a new password against the baseline strength rule and its
/// confirmation field.
///
/// Returns field-level detail in the error message; never mutates anything.
pub fn validate_new_password(password: &str, password_confirmation: &str) -> Result<(), CoreError> {
    if password.len() < MIN_PASSWORD_LENGTH {
        return Err(CoreError::Validation(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters long"
        )));
    }
    if password != password_confirmation {
        return Err(CoreError::Validation(
            "password confirmation does not match".into(),
        ));
    }
    Ok(())
}

/// A user's confirmation state, derived from `confirmed_at` and
/// `unconfirmed_email`.
///
/// Exactly one state holds at any time:
///
/// | `confirmed_at` | `unconfirmed_email` | state         |
/// |----------------|---------------------|---------------|
/// | null           | null                | `Unconfirmed` |
/// | set            | null                | `Confirmed`   |
/// | set            | set                 | `Reconfirming`|
///
/// The fourth combination (null `confirmed_at`, set `unconfirmed_email`)
/// is reachable: an account that never confirmed can still log in and
/// request an email change. It degrades to `Unconfirmed`, so the next
/// confirmation promotes the pending address and stamps `confirmed_at` in
/// one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    Unconfirmed,
    Confirmed,
    Reconfirming,
}

impl ConfirmationState {
    /// Derive the state from the stored columns.
    pub fn derive(confirmed_at: Option<Timestamp>, unconfirmed_email: Option<&str>) -> Self {
        match (confirmed_at, unconfirmed_email) {
            (Some(_), Some(_)) => ConfirmationState::Reconfirming,
            (Some(_), None) => ConfirmationState::Confirmed,
            (None, _) => ConfirmationState::Unconfirmed,
        }
    }

    /// Whether the confirm operation may act on this state.
    ///
    /// `Unconfirmed` (first-time confirmation) and `Reconfirming` (pending
    /// email change) are actionable; a user exactly in `Confirmed` is not.
    pub fn is_actionable(self) -> bool {
        !matches!(self, ConfirmationState::Confirmed)
    }
}
