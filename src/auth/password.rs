//! Password hashing
//!
//! Argon2id with a random salt per hash. Hashing and verification run on the
//! blocking pool since both are deliberately expensive.

use argon2::password_hash::rand_core::OsRng;
use argon2::{Argon2, password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString}};
use once_cell::sync::Lazy;

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("failed to hash password: {0}")]
    Hash(String),
    #[error("password hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Hash compared against when no account matches, so an unknown email costs
/// the same as a wrong password.
static DUMMY_HASH: Lazy<Option<String>> = Lazy::new(|| hash_blocking("not-a-real-password").ok());

fn hash_blocking(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

fn verify_blocking(candidate: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        tracing::warn!("Stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(candidate.as_bytes(), &parsed)
        .is_ok()
}

/// Produce a salted PHC hash string for `plaintext`
pub async fn hash(plaintext: &str) -> Result<String, PasswordError> {
    let plaintext = plaintext.to_owned();
    tokio::task::spawn_blocking(move || hash_blocking(&plaintext)).await?
}

/// Constant-time check of `candidate` against a stored PHC hash
pub async fn verify(candidate: &str, hash: &str) -> bool {
    let candidate = candidate.to_owned();
    let hash = hash.to_owned();
    match tokio::task::spawn_blocking(move || verify_blocking(&candidate, &hash)).await {
        Ok(matched) => matched,
        Err(e) => {
            tracing::error!("Password verification task failed: {}", e);
            false
        }
    }
}

/// Burn one verification so a miss on lookup is not distinguishable by timing
pub async fn verify_dummy(candidate: &str) {
    let candidate = candidate.to_owned();
    let result = tokio::task::spawn_blocking(move || {
        if let Some(hash) = DUMMY_HASH.as_deref() {
            verify_blocking(&candidate, hash);
        }
    })
    .await;
    if let Err(e) = result {
        tracing::error!("Dummy password verification task failed: {}", e);
    }
}
