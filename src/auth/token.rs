use crate::error::AppError;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

const TOKEN_TTL_HOURS: i64 = 24;

/// Claims carried by an access token.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// User id.
    pub sub: i32,
    /// Expiration, seconds since the epoch.
    pub exp: usize,
    /// Issued at, seconds since the epoch.
    pub iat: usize,
}

fn jwt_secret() -> Result<String, AppError> {
    std::env::var("JWT_SECRET").map_err(|_| {
        log::error!("JWT_SECRET is not set; cannot issue or verify tokens");
        AppError::InternalServerError("JWT_SECRET not set".into())
    })
}

/// Issues an HS256 access token for `user_id`, valid for 24 hours.
///
/// Signed with the `JWT_SECRET` environment variable; a missing secret is an
/// `AppError::InternalServerError`.
pub fn generate_token(user_id: i32) -> Result<String, AppError> {
    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        exp: (now + chrono::Duration::hours(TOKEN_TTL_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };

    let secret = jwt_secret()?;
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::InternalServerError(format!("Failed to generate token: {}", e)))
}

/// Verifies signature and expiry and returns the decoded claims.
///
/// Malformed, tampered or expired tokens yield `AppError::Unauthorized`.
pub fn verify_token(token: &str) -> Result<Claims, AppError> {
    let secret = jwt_secret()?;
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| AppError::Unauthorized(format!("Invalid token: {}", e)))
}
