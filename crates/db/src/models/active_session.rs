//! Active session model and DTOs.

use gatehouse_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// One logged-in device: a row from the `active_sessions` table.
///
/// `id` is the value the signed session cookie points at; `remember_token`
/// is the secret the sealed remember-me cookie points at. Neither secret
/// leaves the server unprotected.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveSession {
    pub id: DbId,
    pub user_id: DbId,
    pub remember_token: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
}

/// DTO for creating a new active session.
#[derive(Debug)]
pub struct CreateActiveSession {
    pub user_id: DbId,
    pub remember_token: String,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}
