use crate::types::DbId;

/// Domain error taxonomy.
///
/// Token failures (tampered, expired, wrong purpose) all collapse into the
/// single [`CoreError::InvalidOrExpiredToken`] variant so callers cannot
/// distinguish the sub-cases. Credential failures are likewise a single
/// generic variant regardless of whether the email existed.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: DbId },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Incorrect email or password")]
    IncorrectCredentials,

    #[error("Account has not been confirmed")]
    AccountUnconfirmed,

    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("That email address is no longer available")]
    EmailNoLongerAvailable,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
