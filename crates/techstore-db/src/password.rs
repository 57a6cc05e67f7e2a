//! Staff password hashing.
//!
//! Argon2id with a fresh random salt per hash, stored as a PHC string
//! (`$argon2id$v=19$m=...,t=...,p=...$salt$hash`). The salt and parameters
//! travel inside the string, so verification needs nothing else.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};

use crate::error::{DbError, DbResult};

/// Hashes a plaintext password.
pub fn hash_password(plain: &str) -> DbResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map_err(|e| DbError::PasswordHash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Checks a plaintext password against a stored PHC string.
///
/// A stored value that does not parse counts as a mismatch.
pub fn verify_password(plain: &str, stored: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(stored) else {
        return false;
    };

    Argon2::default()
        .verify_password(plain.as_bytes(), &parsed)
        .is_ok()
}
