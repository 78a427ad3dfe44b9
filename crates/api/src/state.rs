use std::sync::Arc;

use gatehouse_mail::Mailer;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: gatehouse_db::DbPool,
    /// Server configuration (secrets, bind address, CORS).
    pub config: Arc<ServerConfig>,
    /// Outbound mail collaborator.
    pub mailer: Arc<dyn Mailer>,
}
