//! User entity model and DTOs.

use gatehouse_core::identity::ConfirmationState;
use gatehouse_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// Full user row from the `users` table.
///
/// Contains the password hash -- NEVER serialize this to API responses
/// directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: DbId,
    /// Lowercase-normalized, unique.
    pub email: String,
    /// Pending email change, if any. Not unique across users; collisions
    /// are resolved at confirmation time.
    pub unconfirmed_email: Option<String>,
    pub password_hash: String,
    /// Null means the account has never been confirmed.
    pub confirmed_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// The derived confirmation state. Never stored.
    pub fn confirmation_state(&self) -> ConfirmationState {
        ConfirmationState::derive(self.confirmed_at, self.unconfirmed_email.as_deref())
    }
}

/// DTO for creating a new user. Email must already be normalized and the
/// password already hashed.
#[derive(Debug)]
pub struct CreateUser {
    pub email: String,
    pub password_hash: String,
}
