//! Route definitions for the `/confirmation` resource.

use axum::routing::{post, put};
use axum::Router;

use crate::handlers::confirmation;
use crate::state::AppState;

/// Routes mounted at `/confirmation`.
///
/// ```text
/// POST / -> request_confirmation (mint + mail a link)
/// PUT  / -> confirm (consume a token)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(confirmation::request_confirmation))
        .route("/", put(confirmation::confirm))
}
