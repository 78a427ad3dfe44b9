//! Handlers for the `/sessions` resource (per-device session management).

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use gatehouse_core::error::CoreError;
use gatehouse_core::types::{DbId, Timestamp};
use gatehouse_db::models::active_session::ActiveSession;
use gatehouse_db::repositories::SessionRepo;
use serde::Serialize;

use crate::auth::session::Auth;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// One active session as shown to its owner. The remember token never
/// leaves the server.
#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: DbId,
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
    pub created_at: Timestamp,
    /// True for the session this request rides on.
    pub current: bool,
}

impl SessionResponse {
    fn from_session(session: ActiveSession, current_id: Option<DbId>) -> Self {
        SessionResponse {
            current: current_id == Some(session.id),
            id: session.id,
            user_agent: session.user_agent,
            ip_address: session.ip_address,
            created_at: session.created_at,
        }
    }
}

/// Response body for `DELETE /sessions`.
#[derive(Debug, Serialize)]
pub struct RevokeAllResponse {
    pub revoked: u64,
}

/// GET /api/v1/sessions
///
/// List the authenticated user's active sessions, newest first, with the
/// current one flagged.
pub async fn list_sessions(
    State(state): State<AppState>,
    auth: Auth,
) -> AppResult<Json<Vec<SessionResponse>>> {
    let user = auth.require_authenticated().await?;
    let current_id = auth.current_session().await?.map(|s| s.id);

    let sessions = SessionRepo::list_for_user(&state.pool, user.id).await?;
    Ok(Json(
        sessions
            .into_iter()
            .map(|s| SessionResponse::from_session(s, current_id))
            .collect(),
    ))
}

/// DELETE /api/v1/sessions/{id}
///
/// Revoke one session by id. The device holding it is logged out on its
/// next request; other sessions are untouched. Revoking the session this
/// request rides on also clears this request's cookies.
///
/// The delete is scoped to the authenticated user, so a foreign session id
/// is indistinguishable from a nonexistent one (404 either way).
pub async fn revoke_session(
    State(state): State<AppState>,
    auth: Auth,
    Path(session_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let user = auth.require_authenticated().await?;

    if !SessionRepo::delete_for_user(&state.pool, user.id, session_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "session",
            id: session_id,
        }));
    }

    auth.invalidate_if_current(session_id).await?;

    tracing::info!(user_id = user.id, session_id, "Session revoked");
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/v1/sessions
///
/// Sign out everywhere: revoke every session the authenticated user owns,
/// including this one.
pub async fn revoke_all_sessions(auth: Auth) -> AppResult<Json<RevokeAllResponse>> {
    let revoked = auth.revoke_all().await?;
    Ok(Json(RevokeAllResponse { revoked }))
}
