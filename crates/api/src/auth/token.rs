//! Signed, purpose-bound, time-limited tokens.
//!
//! Confirmation and reset links carry an HS256 JWT binding `(subject id,
//! purpose, expiry)`. Binding the purpose into the signed payload prevents
//! a confirmation link from being replayed as a reset link; binding the
//! expiry means no persistence or rotation is needed to invalidate old
//! tokens -- time passing does it. Issuing a fresh token does not revoke
//! outstanding ones; each stays valid until its own expiry.

use gatehouse_core::types::DbId;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;

/// Token lifetime: both purposes expire 10 minutes after issuance.
pub const TOKEN_TTL_SECS: i64 = 600;

/// The action a token was minted for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenPurpose {
    ConfirmEmail,
    ResetPassword,
}

/// Why a token failed verification.
///
/// Callers collapse all three into one user-visible "invalid or expired"
/// signal; the split exists for logging and tests.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token is malformed or its signature does not verify")]
    TamperedOrMalformed,

    #[error("token was issued for a different purpose")]
    WrongPurpose,

    #[error("token has expired")]
    Expired,
}

/// Claims embedded in every purpose-bound token.
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// Subject -- the user's internal database id.
    sub: DbId,
    /// The action this token authorizes.
    purpose: TokenPurpose,
    /// Issued-at time (UTC Unix timestamp).
    iat: i64,
    /// Expiration time (UTC Unix timestamp).
    exp: i64,
}

/// Issue a token identifying `user_id` for the given purpose, expiring
/// [`TOKEN_TTL_SECS`] from now. Pure: no side effects, nothing persisted.
pub fn issue_token(
    user_id: DbId,
    purpose: TokenPurpose,
    config: &AuthConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = Claims {
        sub: user_id,
        purpose,
        iat: now,
        exp: now + TOKEN_TTL_SECS,
    };

    encode(
        &Header::default(), // HS256
        &claims,
        &EncodingKey::from_secret(config.secret.as_bytes()),
    )
}

/// Verify a token and return the subject id it identifies.
///
/// Accepts the token only if the signature verifies, the embedded purpose
/// matches `expected_purpose`, and the expiry has not passed. Zero leeway:
/// the token still verifies at exactly `now == exp` (the lifetime is
/// inclusive of its last second) and is rejected for any `now > exp`.
pub fn verify_token(
    token: &str,
    expected_purpose: TokenPurpose,
    config: &AuthConfig,
) -> Result<DbId, TokenError> {
    let mut validation = Validation::default(); // HS256, validates exp
    validation.leeway = 0;

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(config.secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => TokenError::Expired,
        _ => TokenError::TamperedOrMalformed,
    })?;

    if token_data.claims.purpose != expected_purpose {
        return Err(TokenError::WrongPurpose);
    }

    Ok(token_data.claims.sub)
}
