//! Handlers for the `/password_reset` resource.

use axum::extract::State;
use axum::Json;
use gatehouse_core::error::CoreError;
use gatehouse_core::identity::{normalize_email, validate_new_password, ConfirmationState};
use gatehouse_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::password::hash_password;
use crate::auth::token::{issue_token, verify_token, TokenPurpose};
use crate::error::{AppError, AppResult};
use crate::handlers::confirmation::LinkRequestedResponse;
use crate::state::AppState;

/// Request body for `POST /password_reset`.
#[derive(Debug, Deserialize)]
pub struct RequestResetRequest {
    pub email: String,
}

/// Request body for `PUT /password_reset`.
#[derive(Debug, Deserialize)]
pub struct ConsumeResetRequest {
    pub token: String,
    pub password: String,
    pub password_confirmation: String,
}

/// Response body for a completed reset.
#[derive(Debug, Serialize)]
pub struct ResetCompletedResponse {
    pub message: &'static str,
}

/// POST /api/v1/password_reset
///
/// Request a password-reset link. The response is identical whether the
/// email names a confirmed account, an unconfirmed one, or no account at
/// all; only a confirmed account gets mail. The unconfirmed case is
/// distinguishable in the logs, never to the caller.
pub async fn request_reset(
    State(state): State<AppState>,
    Json(input): Json<RequestResetRequest>,
) -> AppResult<Json<LinkRequestedResponse>> {
    let email = normalize_email(&input.email);

    match UserRepo::find_by_email(&state.pool, &email).await? {
        Some(user) if user.confirmed_at.is_some() => {
            let token = issue_token(user.id, TokenPurpose::ResetPassword, &state.config.auth)
                .map_err(|e| AppError::InternalError(format!("Token issuance error: {e}")))?;

            if let Err(e) = state.mailer.send_password_reset(&user.email, &token).await {
                tracing::error!(user_id = user.id, error = %e, "Reset email delivery failed");
            }
        }
        Some(user) => {
            tracing::debug!(user_id = user.id, "Password reset requested for unconfirmed account");
        }
        None => {
            tracing::debug!("Password reset requested for unknown email");
        }
    }

    Ok(Json(LinkRequestedResponse {
        message: "If that email address exists, a password reset link has been sent",
    }))
}

/// PUT /api/v1/password_reset
///
/// Consume a reset token and set a new password. Does not log the user in;
/// they authenticate with the new password themselves.
///
/// Tokens are stateless, so consuming one does not invalidate its
/// siblings: every outstanding reset token stays usable until its own
/// expiry.
pub async fn consume_reset(
    State(state): State<AppState>,
    Json(input): Json<ConsumeResetRequest>,
) -> AppResult<Json<ResetCompletedResponse>> {
    let user_id = verify_token(&input.token, TokenPurpose::ResetPassword, &state.config.auth)
        .map_err(|e| {
            tracing::debug!(error = %e, "Reset token rejected");
            AppError::Core(CoreError::InvalidOrExpiredToken)
        })?;

    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::InvalidOrExpiredToken))?;

    // A reset link can only have been minted for a confirmed account, but
    // state may have changed since; re-check at consumption time.
    if user.confirmation_state() == ConfirmationState::Unconfirmed {
        return Err(AppError::Core(CoreError::AccountUnconfirmed));
    }

    validate_new_password(&input.password, &input.password_confirmation)?;

    let password_hash = hash_password(&input.password)
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    if !UserRepo::update_password(&state.pool, user.id, &password_hash).await? {
        return Err(AppError::Core(CoreError::InvalidOrExpiredToken));
    }

    tracing::info!(user_id = user.id, "Password reset completed");

    Ok(Json(ResetCompletedResponse {
        message: "Password has been reset; log in with your new password",
    }))
}
