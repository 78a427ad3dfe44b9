//! Outbound mail collaborator.
//!
//! The auth flows hand this crate a recipient and a token string; it owns
//! message construction and SMTP transport. Delivery is fire-and-forget
//! from the flows' perspective: a failure is logged by the caller, never
//! retried here, and never changes an HTTP outcome.
//!
//! [`SmtpMailer`] wraps the `lettre` async SMTP transport. Configuration is
//! loaded from environment variables; if `SMTP_HOST` is not set,
//! [`MailConfig::from_env`] returns `None` and [`NullMailer`] should be used
//! instead.

use async_trait::async_trait;

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for mail delivery failures.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

// ---------------------------------------------------------------------------
// Mailer trait
// ---------------------------------------------------------------------------

/// The seam between the auth flows and mail transport.
///
/// Implementations receive the already-issued token string and embed it in
/// a link; the flows never construct bodies or subjects.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Deliver an email-confirmation link to `to_email`.
    async fn send_confirmation(&self, to_email: &str, token: &str) -> Result<(), MailError>;

    /// Deliver a password-reset link to `to_email`.
    async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<(), MailError>;
}

// ---------------------------------------------------------------------------
// MailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "noreply@gatehouse.local";

/// Default base URL embedded in links when `APP_BASE_URL` is not set.
const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Configuration for the SMTP mailer.
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SMTP server hostname.
    pub smtp_host: String,
    /// SMTP server port (defaults to 587).
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    /// Optional SMTP username.
    pub smtp_user: Option<String>,
    /// Optional SMTP password.
    pub smtp_password: Option<String>,
    /// Base URL used when building confirmation/reset links.
    pub base_url: String,
}

impl MailConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` if `SMTP_HOST` is not set, signalling that mail
    /// delivery is not configured.
    ///
    /// | Variable        | Required | Default                    |
    /// |-----------------|----------|----------------------------|
    /// | `SMTP_HOST`     | yes      | --                         |
    /// | `SMTP_PORT`     | no       | `587`                      |
    /// | `SMTP_FROM`     | no       | `noreply@gatehouse.local`  |
    /// | `SMTP_USER`     | no       | --                         |
    /// | `SMTP_PASSWORD` | no       | --                         |
    /// | `APP_BASE_URL`  | no       | `http://localhost:3000`    |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
            base_url: std::env::var("APP_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpMailer
// ---------------------------------------------------------------------------

/// Sends auth emails via SMTP.
pub struct SmtpMailer {
    config: MailConfig,
}

impl SmtpMailer {
    /// Create a new SMTP mailer with the given configuration.
    pub fn new(config: MailConfig) -> Self {
        Self { config }
    }

    async fn deliver(&self, to_email: &str, subject: &str, body: String) -> Result<(), MailError> {
        use lettre::{
            message::header::ContentType, transport::smtp::authentication::Credentials,
            AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
        };

        let email = Message::builder()
            .from(self.config.from_address.parse()?)
            .to(to_email.parse()?)
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| MailError::Build(e.to_string()))?;

        let mut transport_builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_host)?
                .port(self.config.smtp_port);

        if let (Some(user), Some(pass)) = (&self.config.smtp_user, &self.config.smtp_password) {
            transport_builder =
                transport_builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        let mailer = transport_builder.build();
        mailer.send(email).await?;

        tracing::info!(to = to_email, subject, "Auth email sent");
        Ok(())
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send_confirmation(&self, to_email: &str, token: &str) -> Result<(), MailError> {
        let link = format!("{}/confirmation/{token}", self.config.base_url);
        let body = format!(
            "Confirm your email address by visiting the link below within 10 minutes:\n\n{link}\n\n\
             If you did not request this, you can ignore this message."
        );
        self.deliver(to_email, "Confirm your email", body).await
    }

    async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<(), MailError> {
        let link = format!("{}/password_reset/{token}", self.config.base_url);
        let body = format!(
            "Reset your password by visiting the link below within 10 minutes:\n\n{link}\n\n\
             If you did not request this, you can ignore this message."
        );
        self.deliver(to_email, "Reset your password", body).await
    }
}

// ---------------------------------------------------------------------------
// NullMailer
// ---------------------------------------------------------------------------

/// Drops all mail on the floor, logging at debug level.
///
/// Used when SMTP is not configured (local development).
#[derive(Default)]
pub struct NullMailer;

#[async_trait]
impl Mailer for NullMailer {
    async fn send_confirmation(&self, to_email: &str, _token: &str) -> Result<(), MailError> {
        tracing::debug!(to = to_email, "SMTP not configured; dropping confirmation email");
        Ok(())
    }

    async fn send_password_reset(&self, to_email: &str, _token: &str) -> Result<(), MailError> {
        tracing::debug!(to = to_email, "SMTP not configured; dropping reset email");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_env_returns_none_without_smtp_host() {
        // Ensure SMTP_HOST is not set in the test environment.
        std::env::remove_var("SMTP_HOST");
        assert!(MailConfig::from_env().is_none());
    }

    #[test]
    fn mail_error_display_build() {
        let err = MailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }

    #[test]
    fn mail_error_display_address() {
        let addr_err: Result<lettre::Address, _> = "not-an-email".parse();
        let err = MailError::Address(addr_err.unwrap_err());
        assert!(err.to_string().contains("Email address parse error"));
    }

    #[tokio::test]
    async fn null_mailer_accepts_everything() {
        let mailer = NullMailer;
        assert!(mailer.send_confirmation("a@b.com", "tok").await.is_ok());
        assert!(mailer.send_password_reset("a@b.com", "tok").await.is_ok());
    }
}
