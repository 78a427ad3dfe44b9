pub mod account;
pub mod auth;
pub mod confirmation;
pub mod health;
pub mod password_reset;
pub mod registration;
pub mod sessions;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /signup                POST   create an unconfirmed account (public)
///
/// /auth/login            POST   email+password login (public)
/// /auth/logout           DELETE end the current session
///
/// /sessions              GET    list own sessions (auth required)
/// /sessions              DELETE revoke all own sessions
/// /sessions/{id}         DELETE revoke one session
///
/// /confirmation          POST   request a confirmation link (public)
/// /confirmation          PUT    consume a confirmation token (public)
///
/// /password_reset        POST   request a reset link (public)
/// /password_reset        PUT    consume a reset token (public)
///
/// /account/email         PUT    start an email change (auth required)
/// /account               DELETE delete own account (auth required)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(registration::router())
        .nest("/auth", auth::router())
        .nest("/sessions", sessions::router())
        .nest("/confirmation", confirmation::router())
        .nest("/password_reset", password_reset::router())
        .nest("/account", account::router())
}
