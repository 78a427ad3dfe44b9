//! Route definitions for the `/sessions` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

/// Routes mounted at `/sessions`.
///
/// ```text
/// GET    /     -> list_sessions
/// DELETE /     -> revoke_all_sessions
/// DELETE /{id} -> revoke_session
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(sessions::list_sessions))
        .route("/", delete(sessions::revoke_all_sessions))
        .route("/{id}", delete(sessions::revoke_session))
}
