//! Route definitions for the `/account` resource.

use axum::routing::{delete, put};
use axum::Router;

use crate::handlers::account;
use crate::state::AppState;

/// Routes mounted at `/account`.
///
/// ```text
/// PUT    /email -> change_email
/// DELETE /      -> delete_account
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/email", put(account::change_email))
        .route("/", delete(account::delete_account))
}
