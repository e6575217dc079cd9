use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Public view of an account; the password hash never leaves the database layer.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: i32,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

/// Row used by login to check credentials.
#[derive(Debug, FromRow)]
pub struct UserCredentials {
    pub id: i32,
    pub password_hash: String,
}
