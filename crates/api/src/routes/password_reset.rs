//! Route definitions for the `/password_reset` resource.

use axum::routing::{post, put};
use axum::Router;

use crate::handlers::password_reset;
use crate::state::AppState;

/// Routes mounted at `/password_reset`.
///
/// ```text
/// POST / -> request_reset (mint + mail a link)
/// PUT  / -> consume_reset (consume a token, set new password)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(password_reset::request_reset))
        .route("/", put(password_reset::consume_reset))
}
