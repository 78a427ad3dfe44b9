//! Repository for the `active_sessions` table.
//!
//! All single-row lookups are non-raising (`fetch_optional`): a session may
//! be revoked by a concurrent request from another device at any moment,
//! and a missing row must resolve to "anonymous", never to an error.

use gatehouse_core::types::DbId;
use sqlx::PgPool;

use crate::models::active_session::{ActiveSession, CreateActiveSession};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, user_id, remember_token, user_agent, ip_address, created_at";

/// Provides CRUD operations for active sessions.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session, returning the created row.
    pub async fn create(
        pool: &PgPool,
        input: &CreateActiveSession,
    ) -> Result<ActiveSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO active_sessions (user_id, remember_token, user_agent, ip_address)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, ActiveSession>(&query)
            .bind(input.user_id)
            .bind(&input.remember_token)
            .bind(&input.user_agent)
            .bind(&input.ip_address)
            .fetch_one(pool)
            .await
    }

    /// Find a session by its id (the session-cookie pointer).
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<ActiveSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM active_sessions WHERE id = $1");
        sqlx::query_as::<_, ActiveSession>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a session by its remember token (the remember-cookie pointer).
    pub async fn find_by_remember_token(
        pool: &PgPool,
        remember_token: &str,
    ) -> Result<Option<ActiveSession>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM active_sessions WHERE remember_token = $1");
        sqlx::query_as::<_, ActiveSession>(&query)
            .bind(remember_token)
            .fetch_optional(pool)
            .await
    }

    /// List a user's sessions, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<ActiveSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM active_sessions
             WHERE user_id = $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, ActiveSession>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Delete a single session. Returns `true` if the row was deleted.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM active_sessions WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete a single session scoped to its owner. Returns `false` when the
    /// row does not exist or belongs to someone else -- callers cannot
    /// revoke another user's device.
    pub async fn delete_for_user(
        pool: &PgPool,
        user_id: DbId,
        id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM active_sessions WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Delete every session a user owns ("sign out everywhere").
    /// Returns the count of deleted rows.
    pub async fn delete_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM active_sessions WHERE user_id = $1")
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected())
    }
}
