//! Route definition for the `/signup` resource.

use axum::routing::post;
use axum::Router;

use crate::handlers::registration;
use crate::state::AppState;

/// Routes mounted at the API root.
///
/// ```text
/// POST /signup -> signup
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route("/signup", post(registration::signup))
}
