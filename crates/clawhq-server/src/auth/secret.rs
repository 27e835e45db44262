//! Token secret hashing and verification using argon2id.

use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};

#[derive(Debug, thiserror::Error)]
pub enum SecretError {
    #[error("secret hashing failed: {0}")]
    Hash(argon2::password_hash::Error),
}

/// Hash a token secret using argon2id with a random salt.
pub fn hash_secret(secret: &str) -> Result<String, SecretError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(secret.as_bytes(), &salt)
        .map_err(SecretError::Hash)?;
    Ok(hash.to_string())
}

/// Verify a token secret against a stored hash.
///
/// A missing or unparseable hash never verifies.
pub fn verify_secret(secret: &str, stored: Option<&str>) -> bool {
    let Some(stored) = stored else {
        return false;
    };
    let Ok(parsed_hash) = PasswordHash::new(stored) else {
        return false;
    };
    Argon2::default()
        .verify_password(secret.as_bytes(), &parsed_hash)
        .is_ok()
}
