//! Timing-safe email+password authentication.

use gatehouse_core::identity::normalize_email;
use gatehouse_db::models::user::User;
use gatehouse_db::repositories::UserRepo;
use gatehouse_db::DbPool;

use crate::auth::password::{verify_password, DUMMY_HASH};
use crate::error::{AppError, AppResult};

/// Verify an email+password pair against the credential store.
///
/// Returns `Some(user)` only when the normalized email names a user and the
/// password matches their hash. The unknown-email path still runs one full
/// Argon2 verification against [`DUMMY_HASH`], so the wall-clock cost of
/// "no such email" and "wrong password" is statistically indistinguishable
/// and response timing cannot be used to enumerate accounts.
///
/// Never distinguishes the two failure cases in its return value.
pub async fn authenticate(pool: &DbPool, email: &str, password: &str) -> AppResult<Option<User>> {
    let normalized = normalize_email(email);

    match UserRepo::find_by_email(pool, &normalized).await? {
        Some(user) => {
            let matches = verify_password(password, &user.password_hash)
                .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
            Ok(matches.then_some(user))
        }
        None => {
            // Equal-cost comparison against a throwaway hash. The result is
            // discarded; only the elapsed time matters.
            let _ = verify_password(password, DUMMY_HASH);
            Ok(None)
        }
    }
}
