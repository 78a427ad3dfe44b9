//! Handlers for the `/auth` resource (login, logout).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gatehouse_core::error::CoreError;
use gatehouse_core::types::DbId;
use serde::{Deserialize, Serialize};

use crate::auth::credentials::authenticate;
use crate::auth::session::{Auth, RequestMetadata};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `POST /auth/login`.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Opt in to persistent login across browser restarts.
    #[serde(default)]
    pub remember_me: bool,
}

/// Successful login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub user: UserInfo,
}

/// Public user info embedded in [`LoginResponse`].
#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: DbId,
    pub email: String,
    pub confirmed: bool,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/auth/login
///
/// Authenticate with email + password. On success, creates a fresh session
/// for this device and binds it to the session cookie; with `remember_me`
/// the session's remember token is additionally stored in a long-lived
/// cookie.
///
/// The failure response never distinguishes "no such email" from "wrong
/// password", in content or in timing.
pub async fn login(
    State(state): State<AppState>,
    auth: Auth,
    meta: RequestMetadata,
    Json(input): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let user = authenticate(&state.pool, &input.email, &input.password)
        .await?
        .ok_or(AppError::Core(CoreError::IncorrectCredentials))?;

    let session = auth.login(&user, &meta).await?;

    if input.remember_me {
        auth.remember(&session)?;
    } else {
        auth.forget();
    }

    Ok(Json(LoginResponse {
        user: UserInfo {
            id: user.id,
            confirmed: user.confirmed_at.is_some(),
            email: user.email,
        },
    }))
}

/// DELETE /api/v1/auth/logout
///
/// End the current session: destroy its row and clear both cookies.
/// Idempotent; an anonymous request still gets 204 with cleared cookies.
pub async fn logout(auth: Auth) -> AppResult<StatusCode> {
    auth.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}
