//! Handler for the `/signup` resource.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gatehouse_core::identity::{normalize_email, validate_email, validate_new_password};
use gatehouse_core::types::DbId;
use gatehouse_db::models::user::CreateUser;
use gatehouse_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::password::hash_password;
use crate::auth::token::{issue_token, TokenPurpose};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `POST /signup`.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Response body for a successful signup.
#[derive(Debug, Serialize)]
pub struct SignupResponse {
    pub id: DbId,
    pub email: String,
    /// Always false at signup; confirmation happens out of band.
    pub confirmed: bool,
}

/// POST /api/v1/signup
///
/// Create an unconfirmed account and send a confirmation link to its email
/// address. The account can log in immediately; confirmation gates only
/// the flows that declare they need it (password reset).
///
/// Mail delivery failure is logged but does not fail the signup: the user
/// can request a fresh link from `/confirmation` at any time.
pub async fn signup(
    State(state): State<AppState>,
    Json(input): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<SignupResponse>)> {
    let email = normalize_email(&input.email);
    validate_email(&email)?;
    validate_new_password(&input.password, &input.password_confirmation)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    // A duplicate email surfaces as a unique violation on `uq_users_email`
    // and maps to 409 in the error layer.
    let user = UserRepo::create(
        &state.pool,
        &CreateUser {
            email,
            password_hash,
        },
    )
    .await?;

    let token = issue_token(user.id, TokenPurpose::ConfirmEmail, &state.config.auth)
        .map_err(|e| AppError::InternalError(format!("Token issuance error: {e}")))?;

    if let Err(e) = state.mailer.send_confirmation(&user.email, &token).await {
        tracing::error!(user_id = user.id, error = %e, "Confirmation email delivery failed");
    }

    tracing::info!(user_id = user.id, "User signed up");

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            id: user.id,
            email: user.email,
            confirmed: false,
        }),
    ))
}
