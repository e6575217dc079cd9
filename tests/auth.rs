mod common;

use actix_web::http::StatusCode;
use actix_web::test;
use common::{bearer, cleanup_user, register, test_pool};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use task_manager::auth::AuthResponse;
use task_manager::build_app;

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_register_and_login_flow() {
    let pool = test_pool().await;
    let email = "integration@example.com";
    cleanup_user(&pool, email).await;

    let app = test::init_service(build_app(pool.clone())).await;

    let registered = register(&app, "integration_user", email, "Password123!").await;
    assert_eq!(registered.token_type, "bearer");
    assert!(!registered.access_token.is_empty());

    // Same email again
    let req = test::TestRequest::post()
        .uri("/api/auth/register")
        .set_json(json!({
            "username": "integration_user2",
            "email": email,
            "password": "Password123!"
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["detail"], "Email already registered");

    let req = test::TestRequest::post()
        .uri("/api/auth/login")
        .set_json(json!({ "email": email, "password": "Password123!" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let login: AuthResponse = test::read_body_json(resp).await;
    assert_eq!(login.user_id, registered.user_id);

    let req = test::TestRequest::get()
        .uri("/api/auth/me")
        .insert_header(bearer(&login.access_token))
        .to_request();
    let me: Value = test::call_and_read_body_json(&app, req).await;
    assert_eq!(me["id"], registered.user_id);
    assert_eq!(me["email"], email);
    assert_eq!(me["username"], "integration_user");
    assert!(me.get("password_hash").is_none());

    // The token opens the task routes too.
    let req = test::TestRequest::post()
        .uri("/api/tasks")
        .insert_header(bearer(&login.access_token))
        .set_json(json!({ "title": "Task created by token test" }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let task: Value = test::read_body_json(resp).await;
    assert_eq!(task["status"], "PENDING");
    assert_eq!(task["priority"], "MEDIUM");
    assert_eq!(task["user_id"], registered.user_id);

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_invalid_registration_inputs() {
    let pool = test_pool().await;
    let app = test::init_service(build_app(pool)).await;

    let cases = vec![
        (
            json!({ "email": "test@example.com", "password": "Password123!" }),
            StatusCode::BAD_REQUEST,
            "missing username",
        ),
        (
            json!({ "username": "testuser", "password": "Password123!" }),
            StatusCode::BAD_REQUEST,
            "missing email",
        ),
        (
            json!({ "username": "testuser", "email": "invalid-email", "password": "Password123!" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid email format",
        ),
        (
            json!({ "username": "u", "email": "test@example.com", "password": "Password123!" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "username too short",
        ),
        (
            json!({ "username": "a".repeat(33), "email": "test@example.com", "password": "Password123!" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "username too long",
        ),
        (
            json!({ "username": "user name!", "email": "test@example.com", "password": "Password123!" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "username with invalid chars",
        ),
        (
            json!({ "username": "testuser", "email": "test@example.com", "password": "123" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "password too short",
        ),
    ];

    for (payload, expected, description) in cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected, "{}", description);
    }
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_invalid_login_inputs() {
    let pool = test_pool().await;
    let email = "login_test_user@example.com";
    cleanup_user(&pool, email).await;

    let app = test::init_service(build_app(pool.clone())).await;
    register(&app, "login_test_user", email, "Password123!").await;

    let cases = vec![
        (
            json!({ "password": "Password123!" }),
            StatusCode::BAD_REQUEST,
            "missing email",
        ),
        (
            json!({ "email": "invalid-email", "password": "Password123!" }),
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid email format",
        ),
        (
            json!({ "email": email, "password": "WrongPassword123!" }),
            StatusCode::UNAUTHORIZED,
            "incorrect password",
        ),
        (
            json!({ "email": "nonexistent@example.com", "password": "Password123!" }),
            StatusCode::UNAUTHORIZED,
            "unknown user",
        ),
    ];

    for (payload, expected, description) in cases {
        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .set_json(&payload)
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), expected, "{}", description);
        if expected == StatusCode::UNAUTHORIZED {
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body["detail"], "Invalid credentials", "{}", description);
        }
    }

    cleanup_user(&pool, email).await;
}

#[actix_rt::test]
#[ignore = "requires DATABASE_URL"]
async fn test_concurrent_duplicate_registration_is_a_bad_request() {
    let pool = test_pool().await;
    let email = "racing_user@example.com";
    cleanup_user(&pool, email).await;

    let app = test::init_service(build_app(pool.clone())).await;
    let request = |username: &str| {
        test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({
                "username": username,
                "email": email,
                "password": "Password123!"
            }))
            .to_request()
    };

    let (first, second) = futures::join!(
        test::call_service(&app, request("racing_user_a")),
        test::call_service(&app, request("racing_user_b"))
    );
    let mut statuses = [first.status(), second.status()];
    statuses.sort_by_key(|status| status.as_u16());
    assert_eq!(statuses, [StatusCode::CREATED, StatusCode::BAD_REQUEST]);

    let loser = if first.status() == StatusCode::BAD_REQUEST {
        first
    } else {
        second
    };
    let body: Value = test::read_body_json(loser).await;
    assert_eq!(body["detail"], "Email already registered");

    let (registered,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = $1")
        .bind(email)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(registered, 1);

    cleanup_user(&pool, email).await;
}
