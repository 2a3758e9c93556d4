//! Salted one-way password hashing (Argon2, PHC string format).

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::{debug, error};

use crate::helpers::api_error::ApiError;

pub fn hash_password(password: &str) -> Result<String, ApiError> {
    if password.is_empty() {
        return Err(ApiError::Validation("password cannot be empty".to_string()));
    }

    let salt = SaltString::generate(&mut OsRng);
    match Argon2::default().hash_password(password.as_bytes(), &salt) {
        Ok(hash) => Ok(hash.to_string()),
        Err(e) => {
            error!("Argon2 password hashing failed: {}", e);
            Err(ApiError::Internal(format!("password hashing failed: {}", e)))
        }
    }
}

/// `Ok(false)` on mismatch; `Err` only when the stored hash is unreadable.
pub fn verify_password(stored_hash: &str, provided_password: &str) -> Result<bool, ApiError> {
    let parsed_hash = PasswordHash::new(stored_hash).map_err(|e| {
        error!("Stored password hash could not be parsed: {}", e);
        ApiError::Internal(format!("invalid stored password hash: {}", e))
    })?;

    match Argon2::default().verify_password(provided_password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => {
            debug!("Password verification failed: mismatch");
            Ok(false)
        }
        Err(e) => Err(ApiError::Internal(format!("password verification failed: {}", e))),
    }
}

/// Runs [`hash_password`] on the blocking pool.
pub async fn hash_password_blocking(password: String) -> Result<String, ApiError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hashing task failed: {}", e)))?
}

/// Runs [`verify_password`] on the blocking pool.
pub async fn verify_password_blocking(
    stored_hash: String,
    provided_password: String,
) -> Result<bool, ApiError> {
    tokio::task::spawn_blocking(move || verify_password(&stored_hash, &provided_password))
        .await
        .map_err(|e| ApiError::Internal(format!("verification task failed: {}", e)))?
}
