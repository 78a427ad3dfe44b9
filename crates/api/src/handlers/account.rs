//! Handlers for the `/account` resource (email change, account deletion).

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use gatehouse_core::error::CoreError;
use gatehouse_core::identity::{normalize_email, validate_email};
use gatehouse_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::session::Auth;
use crate::auth::token::{issue_token, TokenPurpose};
use crate::error::{AppError, AppResult};
use crate::state::AppState;

/// Request body for `PUT /account/email`.
#[derive(Debug, Deserialize)]
pub struct ChangeEmailRequest {
    pub email: String,
}

/// Response body for a requested email change.
#[derive(Debug, Serialize)]
pub struct ChangeEmailResponse {
    /// The address the account currently authenticates with. Unchanged
    /// until the new address is confirmed.
    pub email: String,
    /// The address awaiting confirmation.
    pub unconfirmed_email: String,
}

/// PUT /api/v1/account/email
///
/// Start an email change for the authenticated user. The new address is
/// parked in `unconfirmed_email` and a confirmation link is mailed *to the
/// new address*; the account keeps authenticating with the old one until
/// that link is used. Repeating the request replaces the pending address.
pub async fn change_email(
    State(state): State<AppState>,
    auth: Auth,
    Json(input): Json<ChangeEmailRequest>,
) -> AppResult<Json<ChangeEmailResponse>> {
    let user = auth.require_authenticated().await?;

    let email = normalize_email(&input.email);
    validate_email(&email)?;

    if email == user.email {
        return Err(AppError::Core(CoreError::Validation(
            "new email is the same as the current one".into(),
        )));
    }

    let updated = UserRepo::set_unconfirmed_email(&state.pool, user.id, &email)
        .await?
        .ok_or(CoreError::NotFound {
            entity: "user",
            id: user.id,
        })?;

    let token = issue_token(updated.id, TokenPurpose::ConfirmEmail, &state.config.auth)
        .map_err(|e| AppError::InternalError(format!("Token issuance error: {e}")))?;

    if let Err(e) = state.mailer.send_confirmation(&email, &token).await {
        tracing::error!(user_id = updated.id, error = %e, "Confirmation email delivery failed");
    }

    tracing::info!(user_id = updated.id, "Email change requested");

    Ok(Json(ChangeEmailResponse {
        email: updated.email,
        unconfirmed_email: email,
    }))
}

/// DELETE /api/v1/account
///
/// Delete the authenticated user's account. Every active session goes with
/// it by cascade; this request's own cookies are cleared first.
pub async fn delete_account(State(state): State<AppState>, auth: Auth) -> AppResult<StatusCode> {
    let user = auth.require_authenticated().await?;

    auth.logout().await?;
    UserRepo::delete(&state.pool, user.id).await?;

    tracing::info!(user_id = user.id, "Account deleted");
    Ok(StatusCode::NO_CONTENT)
}
