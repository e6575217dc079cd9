use crate::{
    auth::{
        generate_token, hash_password, verify_password, AuthResponse, AuthenticatedUserId,
        LoginRequest, RegisterRequest,
    },
    error::AppError,
    models::{User, UserCredentials},
};
use actix_web::{get, post, web, HttpResponse, Responder};
use sqlx::PgPool;
use validator::Validate;

fn email_taken() -> AppError {
    AppError::BadRequest("Email already registered".into())
}

/// Register a new user
///
/// Creates an account and returns an access token for it.
///
/// ## Responses:
/// - `201 Created`: `AuthResponse`.
/// - `400 Bad Request`: malformed body, or the email is already registered.
/// - `422 Unprocessable Entity`: a field failed validation.
#[post("/register")]
pub async fn register(
    pool: web::Data<PgPool>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;

    let existing_user: Option<(i32,)> = sqlx::query_as("SELECT id FROM users WHERE email = $1")
        .bind(&register_data.email)
        .fetch_optional(&**pool)
        .await?;

    if existing_user.is_some() {
        return Err(email_taken());
    }

    let password_hash = hash_password(&register_data.password)?;

    let (user_id,): (i32,) = sqlx::query_as(
        "INSERT INTO users (username, email, password_hash) VALUES ($1, $2, $3) RETURNING id",
    )
    .bind(&register_data.username)
    .bind(&register_data.email)
    .bind(password_hash)
    .fetch_one(&**pool)
    .await
    .map_err(|e| match e {
        // lost a race with a concurrent registration of the same email
        sqlx::Error::Database(db) if db.is_unique_violation() => email_taken(),
        other => other.into(),
    })?;

    log::info!("registered user {}", user_id);
    let token = generate_token(user_id)?;

    Ok(HttpResponse::Created().json(AuthResponse::bearer(token, user_id)))
}

/// Login user
///
/// Exchanges email and password for an access token. Unknown emails and wrong
/// passwords are indistinguishable to the caller (`401`).
#[post("/login")]
pub async fn login(
    pool: web::Data<PgPool>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = sqlx::query_as::<_, UserCredentials>(
        "SELECT id, password_hash FROM users WHERE email = $1",
    )
    .bind(&login_data.email)
    .fetch_optional(&**pool)
    .await?;

    match user {
        Some(user) if verify_password(&login_data.password, &user.password_hash)? => {
            let token = generate_token(user.id)?;
            Ok(HttpResponse::Ok().json(AuthResponse::bearer(token, user.id)))
        }
        _ => Err(AppError::Unauthorized("Invalid credentials".into())),
    }
}

/// Profile of the token's owner.
#[get("/me")]
pub async fn me(
    pool: web::Data<PgPool>,
    user_id: AuthenticatedUserId,
) -> Result<impl Responder, AppError> {
    let user = sqlx::query_as::<_, User>(
        "SELECT id, username, email, created_at FROM users WHERE id = $1",
    )
    .bind(user_id.0)
    .fetch_optional(&**pool)
    .await?
    .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(HttpResponse::Ok().json(user))
}
