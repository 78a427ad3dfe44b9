//! Per-request session lifecycle service.
//!
//! [`Auth`] mediates between the request's cookies and the currently
//! authenticated user. It is an explicit, request-scoped value built by an
//! Axum extractor -- never a process-wide singleton -- so concurrent
//! requests cannot cross-contaminate state.
//!
//! Two cookies are involved:
//!
//! - the **session cookie** (browser-session lifetime) holds the active
//!   session's row id, MAC-signed so it is tamper-proof but not secret;
//! - the **remember cookie** (20-year lifetime) holds the session's
//!   `remember_token`, sealed with AES-256-GCM so it is both tamper-proof
//!   and confidential.
//!
//! Resolution happens at most once per request and is memoized; `login`,
//! `logout`, and the revocation paths update the memo in place, so a
//! request that destroys its own session sees itself as anonymous from
//! that point on.

use std::sync::Arc;

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Key, Nonce};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use gatehouse_core::error::CoreError;
use gatehouse_core::types::DbId;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tokio::sync::Mutex;
use tower_cookies::cookie::time::Duration as CookieDuration;
use tower_cookies::cookie::SameSite;
use tower_cookies::{Cookie, Cookies};
use uuid::Uuid;

use gatehouse_db::models::active_session::{ActiveSession, CreateActiveSession};
use gatehouse_db::models::user::User;
use gatehouse_db::repositories::{SessionRepo, UserRepo};
use gatehouse_db::DbPool;

use crate::config::ServerConfig;
use crate::error::{AppError, AppResult};
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Name of the browser-session cookie holding the signed session id.
pub const SESSION_COOKIE: &str = "session_id";

/// Name of the long-lived cookie holding the sealed remember token.
pub const REMEMBER_COOKIE: &str = "remember_me";

/// Remember-cookie lifetime. Effectively unlimited.
const REMEMBER_COOKIE_DAYS: i64 = 20 * 365;

// ---------------------------------------------------------------------------
// Cookie codecs
// ---------------------------------------------------------------------------

fn mac_tag(value: &str, secret: &str) -> Vec<u8> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(value.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

/// Sign a session id for the session cookie: `<id>.<base64 hmac-sha256>`.
pub fn sign_session_id(session_id: DbId, secret: &str) -> String {
    let id = session_id.to_string();
    let tag = URL_SAFE_NO_PAD.encode(mac_tag(&id, secret));
    format!("{id}.{tag}")
}

/// Verify a session cookie value and return the session id it points at.
///
/// The MAC comparison is constant-time (`verify_slice`). Any malformed or
/// forged value resolves to `None` -- never an error, since a garbage
/// cookie just means an anonymous request.
pub fn parse_session_cookie(value: &str, secret: &str) -> Option<DbId> {
    let (id, tag) = value.split_once('.')?;
    let tag_bytes = URL_SAFE_NO_PAD.decode(tag).ok()?;

    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret.as_bytes())
        .expect("HMAC accepts any key length");
    mac.update(id.as_bytes());
    mac.verify_slice(&tag_bytes).ok()?;

    id.parse().ok()
}

fn remember_key(secret: &str) -> Key<Aes256Gcm> {
    // 32-byte AEAD key derived from the shared auth secret.
    let digest = Sha256::digest(secret.as_bytes());
    Key::<Aes256Gcm>::clone_from_slice(&digest)
}

/// Seal a remember token for the long-lived cookie: AES-256-GCM with a
/// random nonce, encoded as `base64(nonce || ciphertext)`. Confidential and
/// tamper-evident.
pub fn seal_remember_token(remember_token: &str, secret: &str) -> AppResult<String> {
    let cipher = Aes256Gcm::new(&remember_key(secret));
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, remember_token.as_bytes())
        .map_err(|_| AppError::InternalError("Remember-cookie sealing failed".into()))?;

    let mut payload = nonce.to_vec();
    payload.extend_from_slice(&ciphertext);
    Ok(URL_SAFE_NO_PAD.encode(payload))
}

/// Open a sealed remember-cookie value. Any tampering, truncation, or
/// wrong-key payload resolves to `None`.
pub fn open_remember_token(value: &str, secret: &str) -> Option<String> {
    let payload = URL_SAFE_NO_PAD.decode(value).ok()?;
    if payload.len() <= 12 {
        return None;
    }
    let (nonce, ciphertext) = payload.split_at(12);

    let cipher = Aes256Gcm::new(&remember_key(secret));
    let plaintext = cipher.decrypt(Nonce::from_slice(nonce), ciphertext).ok()?;
    String::from_utf8(plaintext).ok()
}

// ---------------------------------------------------------------------------
// Request metadata
// ---------------------------------------------------------------------------

/// Descriptive metadata captured when a session is created. Display-only.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl<S: Send + Sync> FromRequestParts<S> for RequestMetadata {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        // First hop of X-Forwarded-For when behind a proxy.
        let ip_address = parts
            .headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(|s| s.trim().to_string());

        Ok(RequestMetadata {
            user_agent,
            ip_address,
        })
    }
}

// ---------------------------------------------------------------------------
// Auth service
// ---------------------------------------------------------------------------

/// A resolved (user, session) pair for the current request.
#[derive(Debug, Clone)]
struct ResolvedSession {
    user: User,
    session: ActiveSession,
}

/// The request-scoped authentication service.
///
/// Extract it in any handler that needs to know or change who is logged in:
///
/// ```ignore
/// async fn my_handler(auth: Auth) -> AppResult<Json<()>> {
///     let user = auth.require_authenticated().await?;
///     tracing::info!(user_id = user.id, "handling request");
///     Ok(Json(()))
/// }
/// ```
pub struct Auth {
    pool: DbPool,
    config: Arc<ServerConfig>,
    cookies: Cookies,
    /// Outer `None`: not resolved yet. Inner `None`: resolved as anonymous.
    resolved: Mutex<Option<Option<ResolvedSession>>>,
}

impl FromRequestParts<AppState> for Auth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookies = parts.extensions.get::<Cookies>().cloned().ok_or_else(|| {
            AppError::InternalError("CookieManagerLayer is not installed".into())
        })?;

        Ok(Auth {
            pool: state.pool.clone(),
            config: Arc::clone(&state.config),
            cookies,
            resolved: Mutex::new(None),
        })
    }
}

impl Auth {
    fn secret(&self) -> &str {
        &self.config.auth.secret
    }

    fn removal_cookie(name: &'static str) -> Cookie<'static> {
        let mut cookie = Cookie::from(name);
        cookie.set_path("/");
        cookie
    }

    fn clear_cookies(&self) {
        self.cookies.remove(Self::removal_cookie(SESSION_COOKIE));
        self.cookies.remove(Self::removal_cookie(REMEMBER_COOKIE));
    }

    /// Resolve the current user+session, at most once per request.
    async fn resolve(&self) -> AppResult<Option<ResolvedSession>> {
        let mut guard = self.resolved.lock().await;
        if let Some(cached) = guard.as_ref() {
            return Ok(cached.clone());
        }
        let resolved = self.lookup().await?;
        *guard = Some(resolved.clone());
        Ok(resolved)
    }

    /// One pass over the two cookie paths: session id first, remember
    /// token second. Every lookup is non-raising; a session deleted by a
    /// concurrent request resolves to anonymous.
    async fn lookup(&self) -> AppResult<Option<ResolvedSession>> {
        if let Some(cookie) = self.cookies.get(SESSION_COOKIE) {
            if let Some(id) = parse_session_cookie(cookie.value(), self.secret()) {
                if let Some(found) = self.load_session(id).await? {
                    return Ok(Some(found));
                }
            }
        }

        if let Some(cookie) = self.cookies.get(REMEMBER_COOKIE) {
            if let Some(token) = open_remember_token(cookie.value(), self.secret()) {
                if let Some(session) =
                    SessionRepo::find_by_remember_token(&self.pool, &token).await?
                {
                    if let Some(user) = UserRepo::find_by_id(&self.pool, session.user_id).await? {
                        return Ok(Some(ResolvedSession { user, session }));
                    }
                }
            }
        }

        Ok(None)
    }

    async fn load_session(&self, id: DbId) -> AppResult<Option<ResolvedSession>> {
        if let Some(session) = SessionRepo::find_by_id(&self.pool, id).await? {
            if let Some(user) = UserRepo::find_by_id(&self.pool, session.user_id).await? {
                return Ok(Some(ResolvedSession { user, session }));
            }
        }
        Ok(None)
    }

    /// The currently authenticated user, if any.
    pub async fn current_user(&self) -> AppResult<Option<User>> {
        Ok(self.resolve().await?.map(|r| r.user))
    }

    /// The active session the current request rides on, if any.
    pub async fn current_session(&self) -> AppResult<Option<ActiveSession>> {
        Ok(self.resolve().await?.map(|r| r.session))
    }

    /// The current user, or 401.
    pub async fn require_authenticated(&self) -> AppResult<User> {
        self.current_user().await?.ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized("Authentication required".into()))
        })
    }

    /// Log `user` in: create one new active session and bind it to a fresh
    /// session cookie.
    ///
    /// All pre-existing request-scoped state is invalidated first, so the
    /// session identifier always rotates across a privilege change -- even
    /// for the same user logging in twice in a row (fixation
    /// countermeasure). The returned session carries the `remember_token`
    /// callers pass to [`Auth::remember`] when persistent login was
    /// requested.
    pub async fn login(&self, user: &User, meta: &RequestMetadata) -> AppResult<ActiveSession> {
        self.clear_cookies();

        let input = CreateActiveSession {
            user_id: user.id,
            remember_token: Uuid::new_v4().to_string(),
            user_agent: meta.user_agent.clone(),
            ip_address: meta.ip_address.clone(),
        };
        let session = SessionRepo::create(&self.pool, &input).await?;

        let mut cookie = Cookie::new(SESSION_COOKIE, sign_session_id(session.id, self.secret()));
        cookie.set_http_only(true);
        cookie.set_path("/");
        cookie.set_same_site(SameSite::Lax);
        self.cookies.add(cookie);

        *self.resolved.lock().await = Some(Some(ResolvedSession {
            user: user.clone(),
            session: session.clone(),
        }));

        tracing::info!(user_id = user.id, session_id = session.id, "User logged in");
        Ok(session)
    }

    /// End the current session: destroy its row and clear all
    /// request-scoped state.
    ///
    /// The session is resolved from the cookie *before* the cookie is
    /// cleared; a request with no resolvable session just clears cookies.
    pub async fn logout(&self) -> AppResult<()> {
        let current = self.resolve().await?;

        self.clear_cookies();
        if let Some(resolved) = current {
            SessionRepo::delete(&self.pool, resolved.session.id).await?;
            tracing::info!(
                user_id = resolved.user.id,
                session_id = resolved.session.id,
                "User logged out"
            );
        }

        *self.resolved.lock().await = Some(None);
        Ok(())
    }

    /// Store the session's remember token in the long-lived cookie.
    ///
    /// Reuses the session `login` just created; no new row.
    pub fn remember(&self, session: &ActiveSession) -> AppResult<()> {
        let sealed = seal_remember_token(&session.remember_token, self.secret())?;

        let mut cookie = Cookie::new(REMEMBER_COOKIE, sealed);
        cookie.set_http_only(true);
        cookie.set_path("/");
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(CookieDuration::days(REMEMBER_COOKIE_DAYS));
        self.cookies.add(cookie);
        Ok(())
    }

    /// Delete the remember cookie only. The session row is untouched: the
    /// device stays logged in for the rest of its browser session.
    pub fn forget(&self) {
        self.cookies.remove(Self::removal_cookie(REMEMBER_COOKIE));
    }

    /// If the given session is the one the current request rides on, make
    /// the rest of this request anonymous (cookies and memo cleared).
    ///
    /// Called after a revocation so that destroying your own session takes
    /// effect immediately instead of on the next request.
    pub async fn invalidate_if_current(&self, session_id: DbId) -> AppResult<()> {
        let current = self.resolve().await?;
        if current.is_some_and(|r| r.session.id == session_id) {
            self.clear_cookies();
            *self.resolved.lock().await = Some(None);
        }
        Ok(())
    }

    /// Sign out everywhere: destroy every session the current user owns,
    /// then clear this request's own state. Returns the number of sessions
    /// destroyed. 401 when anonymous.
    pub async fn revoke_all(&self) -> AppResult<u64> {
        let user = self.require_authenticated().await?;
        let deleted = SessionRepo::delete_all_for_user(&self.pool, user.id).await?;

        self.clear_cookies();
        *self.resolved.lock().await = Some(None);

        tracing::info!(user_id = user.id, deleted, "All sessions revoked");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "unit-test-secret";

    #[test]
    fn session_cookie_round_trip() {
        let value = sign_session_id(12345, SECRET);
        assert_eq!(parse_session_cookie(&value, SECRET), Some(12345));
    }

    #[test]
    fn session_cookie_rejects_tampered_id() {
        let value = sign_session_id(12345, SECRET);
        let forged = value.replacen("12345", "12346", 1);
        assert_eq!(parse_session_cookie(&forged, SECRET), None);
    }

    #[test]
    fn session_cookie_rejects_wrong_secret_and_garbage() {
        let value = sign_session_id(1, SECRET);
        assert_eq!(parse_session_cookie(&value, "other-secret"), None);
        assert_eq!(parse_session_cookie("garbage", SECRET), None);
        assert_eq!(parse_session_cookie("1.not-base64!!", SECRET), None);
        assert_eq!(parse_session_cookie("", SECRET), None);
    }

    #[test]
    fn remember_cookie_round_trip() {
        let sealed = seal_remember_token("some-opaque-token", SECRET).expect("sealing succeeds");
        assert_eq!(
            open_remember_token(&sealed, SECRET).as_deref(),
            Some("some-opaque-token")
        );
    }

    #[test]
    fn remember_cookie_is_confidential_and_tamper_evident() {
        let sealed = seal_remember_token("secret-token", SECRET).expect("sealing succeeds");

        // The plaintext must not appear in the sealed value.
        assert!(!sealed.contains("secret-token"));

        // Wrong key fails.
        assert_eq!(open_remember_token(&sealed, "other-secret"), None);

        // Any flipped character fails.
        let mut chars: Vec<char> = sealed.chars().collect();
        let mid = chars.len() / 2;
        chars[mid] = if chars[mid] == 'A' { 'B' } else { 'A' };
        let tampered: String = chars.into_iter().collect();
        assert_eq!(open_remember_token(&tampered, SECRET), None);

        // Truncation fails.
        assert_eq!(open_remember_token(&sealed[..10], SECRET), None);
    }

    #[test]
    fn remember_cookie_nonce_randomizes_output() {
        let a = seal_remember_token("token", SECRET).expect("sealing succeeds");
        let b = seal_remember_token("token", SECRET).expect("sealing succeeds");
        assert_ne!(a, b, "fresh nonce per seal");
    }
}
