//! Password storage with bcrypt.

use bcrypt::{BcryptError, DEFAULT_COST};

use crate::error::AppError;

/// Hashes a plaintext password for storage in `users.password_hash`.
pub fn hash_password(plain: &str) -> Result<String, AppError> {
    bcrypt::hash(plain, DEFAULT_COST).map_err(AppError::from)
}

/// Checks `plain` against a stored hash.
///
/// A stored value that is not a bcrypt hash never matches; it is logged
/// instead of failing the login with a 500.
pub fn verify_password(plain: &str, stored_hash: &str) -> Result<bool, AppError> {
    match bcrypt::verify(plain, stored_hash) {
        Ok(matched) => Ok(matched),
        Err(BcryptError::InvalidHash(_) | BcryptError::InvalidPrefix(_)) => {
            log::warn!("stored password hash is not a bcrypt hash");
            Ok(false)
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_is_salted_and_verifiable() {
        let first = hash_password("correct horse").unwrap();
        let second = hash_password("correct horse").unwrap();

        assert_ne!(first, second);
        assert!(first.starts_with("$2"));
        assert!(verify_password("correct horse", &first).unwrap());
        assert!(verify_password("correct horse", &second).unwrap());
        assert!(!verify_password("battery staple", &first).unwrap());
    }

    #[test]
    fn test_malformed_stored_hash_never_matches() {
        for stored in ["invalidhashformat", "", "$2b$12$short"] {
            assert!(
                !verify_password("anything", stored).unwrap_or(false),
                "{:?}",
                stored
            );
        }
    }
}
