//! HTTP-level integration tests for the password reset flow.

mod common;

use axum::http::StatusCode;
use common::{body_json, build_test_app, TestClient, TEST_AUTH_SECRET};
use gatehouse_api::auth::password::hash_password;
use gatehouse_api::auth::session::SESSION_COOKIE;
use gatehouse_db::models::user::{CreateUser, User};
use gatehouse_db::repositories::UserRepo;
use jsonwebtoken::{encode, EncodingKey, Header};
use sqlx::PgPool;

const PASSWORD: &str = "test_password_123!";
const NEW_PASSWORD: &str = "fresh_password_456!";

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn create_user(pool: &PgPool, email: &str, confirmed: bool) -> User {
    let input = CreateUser {
        email: email.to_string(),
        password_hash: hash_password(PASSWORD).expect("hashing should succeed"),
    };
    let user = UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed");
    if confirmed {
        UserRepo::confirm(pool, user.id)
            .await
            .expect("confirmation should succeed")
            .expect("user should exist")
    } else {
        user
    }
}

/// Request a reset link for `email`, asserting the uniform 200.
async fn request_reset(client: &mut TestClient, email: &str) -> serde_json::Value {
    let response = client
        .post_json("/api/v1/password_reset", serde_json::json!({ "email": email }))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

/// Consume a reset token, setting `password`.
async fn consume_reset(
    client: &mut TestClient,
    token: &str,
    password: &str,
) -> axum::http::Response<axum::body::Body> {
    client
        .put_json(
            "/api/v1/password_reset",
            serde_json::json!({
                "token": token,
                "password": password,
                "password_confirmation": password,
            }),
        )
        .await
}

fn forge_reset_token(sub: i64, iat: i64, exp: i64) -> String {
    let claims = serde_json::json!({
        "sub": sub,
        "purpose": "reset_password",
        "iat": iat,
        "exp": exp,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_AUTH_SECRET.as_bytes()),
    )
    .expect("encoding should succeed")
}

async fn assert_password_is(pool: &PgPool, email: &str, password: &str) {
    let (app, _mailer) = build_test_app(pool.clone());
    let mut client = TestClient::new(app);
    let response = client
        .post_json(
            "/api/v1/auth/login",
            serde_json::json!({ "email": email, "password": password }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK, "password should work");
}

// ---------------------------------------------------------------------------
// Requesting a link
// ---------------------------------------------------------------------------

/// Unknown and unconfirmed emails get the same 200 body as a confirmed
/// one, and neither triggers any mail; only the confirmed account does.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_request_reset_is_uniform(pool: PgPool) {
    create_user(&pool, "confirmed@test.com", true).await;
    create_user(&pool, "unconfirmed@test.com", false).await;
    let (app, mailer) = build_test_app(pool);
    let mut client = TestClient::new(app);

    let unknown = request_reset(&mut client, "nobody@test.com").await;
    let unconfirmed = request_reset(&mut client, "unconfirmed@test.com").await;
    assert_eq!(unknown, unconfirmed, "bodies must be identical");
    assert!(mailer.sent().is_empty(), "no mail for either case");

    let confirmed = request_reset(&mut client, "confirmed@test.com").await;
    assert_eq!(confirmed, unknown, "the success body is the same too");

    let mail = mailer
        .last_token("password_reset")
        .expect("confirmed account must get mail");
    assert_eq!(mail.to, "confirmed@test.com");
}

// ---------------------------------------------------------------------------
// Consuming a token
// ---------------------------------------------------------------------------

/// The full journey: request a link, set a new password, and log in with
/// it. Consuming the token does not log the user in by itself.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_reset_happy_path(pool: PgPool) {
    create_user(&pool, "reset@test.com", true).await;
    let (app, mailer) = build_test_app(pool.clone());
    let mut client = TestClient::new(app);

    request_reset(&mut client, "reset@test.com").await;
    let mail = mailer.last_token("password_reset").expect("mail must be sent");

    let response = consume_reset(&mut client, &mail.token, NEW_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        client.cookie(SESSION_COOKIE).is_none(),
        "reset must not log the user in"
    );

    // Old password is dead, new one works.
    let response = client
        .post_json(
            "/api/v1/auth/login",
            serde_json::json!({ "email": "reset@test.com", "password": PASSWORD }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_password_is(&pool, "reset@test.com", NEW_PASSWORD).await;
}

/// Tokens are stateless, so two outstanding reset links both work; the
/// last consumption wins.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_two_outstanding_tokens_both_consume(pool: PgPool) {
    create_user(&pool, "twice@test.com", true).await;
    let (app, mailer) = build_test_app(pool.clone());
    let mut client = TestClient::new(app);

    request_reset(&mut client, "twice@test.com").await;
    let first = mailer.last_token("password_reset").expect("mail must be sent");
    request_reset(&mut client, "twice@test.com").await;
    let second = mailer.last_token("password_reset").expect("mail must be sent");

    let response = consume_reset(&mut client, &first.token, "first_password_1!").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = consume_reset(&mut client, &second.token, "second_password_2!").await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_password_is(&pool, "twice@test.com", "second_password_2!").await;
}

/// Consuming a token does not retire it: the very same token string works
/// again after a successful reset, until its own expiry.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_same_token_consumes_twice(pool: PgPool) {
    create_user(&pool, "rewind@test.com", true).await;
    let (app, mailer) = build_test_app(pool.clone());
    let mut client = TestClient::new(app);

    request_reset(&mut client, "rewind@test.com").await;
    let mail = mailer.last_token("password_reset").expect("mail must be sent");

    let response = consume_reset(&mut client, &mail.token, "first_password_1!").await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = consume_reset(&mut client, &mail.token, "second_password_2!").await;
    assert_eq!(response.status(), StatusCode::OK);

    assert_password_is(&pool, "rewind@test.com", "second_password_2!").await;
}

/// An unconfirmed account cannot consume a reset token, even a
/// validly-signed one.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_unconfirmed_account_cannot_reset(pool: PgPool) {
    let user = create_user(&pool, "gated@test.com", false).await;
    let (app, _mailer) = build_test_app(pool.clone());
    let mut client = TestClient::new(app);

    let now = chrono::Utc::now().timestamp();
    let token = forge_reset_token(user.id, now, now + 600);

    let response = consume_reset(&mut client, &token, NEW_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let json = body_json(response).await;
    assert_eq!(json["code"], "ACCOUNT_UNCONFIRMED");

    assert_password_is(&pool, "gated@test.com", PASSWORD).await;
}

/// Expired and tampered reset tokens are rejected with the generic signal
/// and leave the password unchanged.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_bad_reset_tokens_rejected(pool: PgPool) {
    let user = create_user(&pool, "intact@test.com", true).await;
    let (app, _mailer) = build_test_app(pool.clone());
    let mut client = TestClient::new(app);

    let now = chrono::Utc::now().timestamp();
    let expired = forge_reset_token(user.id, now - 601, now - 1);

    for token in [expired.as_str(), "not-a-token"] {
        let response = consume_reset(&mut client, token, NEW_PASSWORD).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INVALID_OR_EXPIRED_TOKEN");
    }

    assert_password_is(&pool, "intact@test.com", PASSWORD).await;
}

/// A weak or mismatched replacement password is a 400 and the old
/// password keeps working; the token itself stays consumable.
#[sqlx::test(migrations = "../db/migrations")]
async fn test_reset_validates_new_password(pool: PgPool) {
    create_user(&pool, "strict@test.com", true).await;
    let (app, mailer) = build_test_app(pool.clone());
    let mut client = TestClient::new(app);

    request_reset(&mut client, "strict@test.com").await;
    let mail = mailer.last_token("password_reset").expect("mail must be sent");

    let response = consume_reset(&mut client, &mail.token, "short").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = client
        .put_json(
            "/api/v1/password_reset",
            serde_json::json!({
                "token": mail.token,
                "password": NEW_PASSWORD,
                "password_confirmation": "different_thing_9!",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_password_is(&pool, "strict@test.com", PASSWORD).await;

    // After the failed attempts, the same token still works.
    let response = consume_reset(&mut client, &mail.token, NEW_PASSWORD).await;
    assert_eq!(response.status(), StatusCode::OK);
}
