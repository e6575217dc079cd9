#![allow(dead_code)]

//! Shared setup for the database-backed tests.
//!
//! These tests need a running PostgreSQL reachable through `DATABASE_URL`
//! (a `.env` file works) and are `#[ignore]`d by default:
//! `cargo test -- --ignored`.

use actix_web::{body::MessageBody, dev::ServiceResponse, test, Error};
use serde_json::json;
use sqlx::PgPool;
use task_manager::auth::AuthResponse;

pub async fn test_pool() -> PgPool {
    dotenv::dotenv().ok();
    if std::env::var("JWT_SECRET").is_err() {
        std::env::set_var("JWT_SECRET", "integration-test-secret");
    }
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for tests");
    let pool = PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test DB");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to apply migrations");
    pool
}

pub async fn cleanup_user(pool: &PgPool, email: &str) {
    let _ = sqlx::query("DELETE FROM users WHERE email = $1")
        .bind(email)
        .execute(pool)
        .await;
}

/// Registers a fresh account and returns its token response.
pub async fn register<S, B>(app: &S, username: &str, email: &str, password: &str) -> AuthResponse
where
    S: actix_web::dev::Service<actix_http::Request, Response = ServiceResponse<B>, Error = Error>,
    B: MessageBody,
{
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": username,
            "email": email,
            "password": password
        }))
        .to_request();
    let resp = test::call_service(app, req).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    assert_eq!(
        status.as_u16(),
        201,
        "registration failed: {}",
        String::from_utf8_lossy(&body)
    );
    serde_json::from_slice(&body).expect("Failed to parse registration response")
}

pub fn bearer(token: &str) -> (actix_web::http::header::HeaderName, String) {
    (
        actix_web::http::header::AUTHORIZATION,
        format!("Bearer {}", token),
    )
}
