#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use axum::http::{HeaderName, Method, Request, Response, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;
use tower_cookies::CookieManagerLayer;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use gatehouse_api::config::{AuthConfig, ServerConfig};
use gatehouse_api::routes;
use gatehouse_api::state::AppState;
use gatehouse_mail::{MailError, Mailer};

/// The token/cookie secret every test app is built with. Tests that mint
/// their own tokens must sign with this.
pub const TEST_AUTH_SECRET: &str = "integration-test-secret";

/// Build a test `ServerConfig` with safe defaults and the shared test secret.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        auth: AuthConfig {
            secret: TEST_AUTH_SECRET.to_string(),
        },
    }
}

// ---------------------------------------------------------------------------
// Recording mailer
// ---------------------------------------------------------------------------

/// One captured outbound email.
#[derive(Debug, Clone)]
pub struct SentMail {
    /// "confirmation" or "password_reset".
    pub kind: &'static str,
    pub to: String,
    pub token: String,
}

/// A [`Mailer`] that records every send instead of delivering anything.
/// Tests read tokens out of it the way a user would read them out of an
/// inbox.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
}

impl RecordingMailer {
    /// All captured mail, in send order.
    pub fn sent(&self) -> Vec<SentMail> {
        self.sent.lock().unwrap().clone()
    }

    /// The most recently captured token of the given kind, with recipient.
    pub fn last_token(&self, kind: &str) -> Option<SentMail> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|m| m.kind == kind)
            .cloned()
    }

    fn record(&self, kind: &'static str, to: &str, token: &str) {
        self.sent.lock().unwrap().push(SentMail {
            kind,
            to: to.to_string(),
            token: token.to_string(),
        });
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send_confirmation(&self, to_email: &str, token: &str) -> Result<(), MailError> {
        self.record("confirmation", to_email, token);
        Ok(())
    }

    async fn send_password_reset(&self, to_email: &str, token: &str) -> Result<(), MailError> {
        self.record("password_reset", to_email, token);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// App construction
// ---------------------------------------------------------------------------

/// Build the full application router with all middleware layers, using the
/// given database pool and a [`RecordingMailer`].
///
/// This mirrors the router construction in `main.rs` so integration tests
/// exercise the same middleware stack (cookies, CORS, request ID, timeout,
/// tracing, panic recovery) that production uses.
pub fn build_test_app(pool: PgPool) -> (Router, Arc<RecordingMailer>) {
    let config = test_config();
    let mailer = Arc::new(RecordingMailer::default());

    let state = AppState {
        pool,
        config: Arc::new(config),
        mailer: Arc::clone(&mailer) as Arc<dyn Mailer>,
    };

    let cors = CorsLayer::new()
        .allow_origin(["http://localhost:5173".parse().unwrap()])
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([CONTENT_TYPE])
        .allow_credentials(true)
        .max_age(Duration::from_secs(3600));

    let request_id_header = HeaderName::from_static("x-request-id");

    let app = Router::new()
        .merge(routes::health::router())
        .nest("/api/v1", routes::api_routes())
        .layer(CatchPanicLayer::new())
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header.clone()))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(SetRequestIdLayer::new(request_id_header, MakeRequestUuid))
        .layer(CookieManagerLayer::new())
        .layer(cors)
        .with_state(state);

    (app, mailer)
}

// ---------------------------------------------------------------------------
// Cookie-carrying test client
// ---------------------------------------------------------------------------

/// A test client that behaves like one browser: it holds a cookie jar,
/// sends it with every request, and absorbs `Set-Cookie` headers (including
/// removals) from every response.
///
/// Clone-free by design: one client per simulated device.
pub struct TestClient {
    app: Router,
    jar: HashMap<String, String>,
}

impl TestClient {
    pub fn new(app: Router) -> Self {
        TestClient {
            app,
            jar: HashMap::new(),
        }
    }

    /// Direct jar access, for tests that simulate cookie loss or theft.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.jar.get(name).map(String::as_str)
    }

    pub fn set_cookie(&mut self, name: &str, value: &str) {
        self.jar.insert(name.to_string(), value.to_string());
    }

    pub fn remove_cookie(&mut self, name: &str) {
        self.jar.remove(name);
    }

    pub async fn get(&mut self, path: &str) -> Response<Body> {
        self.request(Method::GET, path, None).await
    }

    pub async fn post_json(&mut self, path: &str, body: serde_json::Value) -> Response<Body> {
        self.request(Method::POST, path, Some(body)).await
    }

    pub async fn put_json(&mut self, path: &str, body: serde_json::Value) -> Response<Body> {
        self.request(Method::PUT, path, Some(body)).await
    }

    pub async fn delete(&mut self, path: &str) -> Response<Body> {
        self.request(Method::DELETE, path, None).await
    }

    async fn request(
        &mut self,
        method: Method,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(path)
            .header("user-agent", "gatehouse-test-client/1.0");

        if !self.jar.is_empty() {
            let header = self
                .jar
                .iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join("; ");
            builder = builder.header(COOKIE, header);
        }

        let request = match body {
            Some(json) => builder
                .header(CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("request should not fail at the transport level");

        self.absorb_cookies(&response);
        response
    }

    /// Apply every `Set-Cookie` header to the jar. An empty value or a
    /// `Max-Age=0` attribute is a removal.
    fn absorb_cookies(&mut self, response: &Response<Body>) {
        for header in response.headers().get_all(SET_COOKIE) {
            let Ok(raw) = header.to_str() else { continue };
            let mut parts = raw.split(';');
            let Some(pair) = parts.next() else { continue };
            let Some((name, value)) = pair.split_once('=') else {
                continue;
            };

            let removed = value.is_empty()
                || parts.any(|attr| attr.trim().eq_ignore_ascii_case("max-age=0"));

            if removed {
                self.jar.remove(name.trim());
            } else {
                self.jar
                    .insert(name.trim().to_string(), value.to_string());
            }
        }
    }
}

/// Read a response body as JSON.
pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be valid JSON")
}

/// Read a response body as a raw string.
pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}
