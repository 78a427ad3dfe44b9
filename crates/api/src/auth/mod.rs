//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`credentials`] -- timing-safe email+password authentication.
//! - [`token`] -- signed, purpose-bound, time-limited tokens for email
//!   confirmation and password reset.
//! - [`session`] -- the per-request session lifecycle service: login,
//!   logout, remember-me, current-user resolution, revocation.

pub mod credentials;
pub mod password;
pub mod session;
pub mod token;
