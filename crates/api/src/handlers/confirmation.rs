//! Handlers for the `/confirmation` resource.
//!
//! `request` mints and mails a confirmation link; `confirm` consumes one.
//! Both first-time confirmation and email-change reconfirmation run through
//! the same pair.

use axum::extract::State;
use axum::Json;
use gatehouse_core::error::CoreError;
use gatehouse_core::types::DbId;
use gatehouse_db::repositories::UserRepo;
use serde::{Deserialize, Serialize};

use crate::auth::session::{Auth, RequestMetadata};
use crate::auth::token::{issue_token, verify_token, TokenPurpose};
use crate::error::{is_unique_violation, AppError, AppResult};
use crate::handlers::auth::UserInfo;
use crate::state::AppState;

/// Request body for `POST /confirmation`.
#[derive(Debug, Deserialize)]
pub struct RequestConfirmationRequest {
    pub email: String,
}

/// Request body for `PUT /confirmation`.
#[derive(Debug, Deserialize)]
pub struct ConfirmRequest {
    pub token: String,
}

/// Uniform acknowledgement for link-request endpoints.
#[derive(Debug, Serialize)]
pub struct LinkRequestedResponse {
    pub message: &'static str,
}

/// Response body for a successful confirmation.
#[derive(Debug, Serialize)]
pub struct ConfirmResponse {
    pub user: UserInfo,
}

/// POST /api/v1/confirmation
///
/// Request a (fresh) confirmation link. The response is identical whether
/// the email names an actionable account, an already-confirmed one, or no
/// account at all, so this endpoint cannot be used to probe for accounts.
/// Mail is sent only in the actionable case; when the account is in a
/// pending email change, the link goes to the *pending* address.
pub async fn request_confirmation(
    State(state): State<AppState>,
    Json(input): Json<RequestConfirmationRequest>,
) -> AppResult<Json<LinkRequestedResponse>> {
    let email = gatehouse_core::identity::normalize_email(&input.email);

    match UserRepo::find_by_email(&state.pool, &email).await? {
        Some(user) if user.confirmation_state().is_actionable() => {
            let token = issue_token(user.id, TokenPurpose::ConfirmEmail, &state.config.auth)
                .map_err(|e| AppError::InternalError(format!("Token issuance error: {e}")))?;

            let to = user.unconfirmed_email.as_deref().unwrap_or(&user.email);
            if let Err(e) = state.mailer.send_confirmation(to, &token).await {
                tracing::error!(user_id = user.id, error = %e, "Confirmation email delivery failed");
            }
        }
        Some(user) => {
            tracing::debug!(user_id = user.id, "Confirmation requested for confirmed account");
        }
        None => {
            tracing::debug!("Confirmation requested for unknown email");
        }
    }

    Ok(Json(LinkRequestedResponse {
        message: "If that email address exists, a confirmation link has been sent",
    }))
}

/// PUT /api/v1/confirmation
///
/// Consume a confirmation token. For a first-time confirmation this stamps
/// `confirmed_at`; for a pending email change it additionally promotes the
/// pending address into `email`. Either way the confirmed user ends up
/// logged in on this device.
///
/// Tampered, expired, wrong-purpose, subject-less, and already-confirmed
/// tokens all collapse into one generic 401.
pub async fn confirm(
    State(state): State<AppState>,
    auth: Auth,
    meta: RequestMetadata,
    Json(input): Json<ConfirmRequest>,
) -> AppResult<Json<ConfirmResponse>> {
    let user_id = verify_token(&input.token, TokenPurpose::ConfirmEmail, &state.config.auth)
        .map_err(|e| {
            tracing::debug!(error = %e, "Confirmation token rejected");
            AppError::Core(CoreError::InvalidOrExpiredToken)
        })?;

    let user = UserRepo::find_by_id(&state.pool, user_id)
        .await?
        .ok_or(AppError::Core(CoreError::InvalidOrExpiredToken))?;

    if !user.confirmation_state().is_actionable() {
        return Err(AppError::Core(CoreError::InvalidOrExpiredToken));
    }

    // One atomic write. Losing the email race surfaces as a unique
    // violation here and leaves the row untouched.
    let confirmed = match UserRepo::confirm(&state.pool, user.id).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(AppError::Core(CoreError::InvalidOrExpiredToken)),
        Err(e) if is_unique_violation(&e, "uq_users_email") => {
            return Err(AppError::Core(CoreError::EmailNoLongerAvailable));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = confirmed.id, "Email confirmed");

    ensure_logged_in(&auth, &meta, &confirmed).await?;

    Ok(Json(ConfirmResponse {
        user: UserInfo {
            id: confirmed.id,
            confirmed: confirmed.confirmed_at.is_some(),
            email: confirmed.email,
        },
    }))
}

/// Log the confirmed user in unless this device is already their session.
/// An email-change confirmation from the account's own browser keeps its
/// existing session; a first-time confirmation from a fresh browser gets a
/// new one.
async fn ensure_logged_in(
    auth: &Auth,
    meta: &RequestMetadata,
    user: &gatehouse_db::models::user::User,
) -> AppResult<()> {
    let current: Option<DbId> = auth.current_user().await?.map(|u| u.id);
    if current != Some(user.id) {
        auth.login(user, meta).await?;
    }
    Ok(())
}
