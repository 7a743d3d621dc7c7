//! Password hashing as a swappable collaborator.
//!
//! `CreateAccount`/`Login` depend only on [`PasswordHasher`]; the algorithm
//! itself is an implementation detail this crate happens to fill with
//! Argon2id, not something the replication logic needs to know about.

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString};
use argon2::Argon2;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("failed to hash password")]
    HashFailed(String),

    #[error("stored password hash is malformed")]
    MalformedHash(String),
}

/// A password hashing/verification strategy.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, AuthError>;
    fn verify(&self, password: &str, phc: &str) -> Result<bool, AuthError>;
}

/// Argon2id-backed implementation, the default and only implementation
/// shipped here.
#[derive(Debug, Default)]
pub struct Argon2Hasher;

impl PasswordHasher for Argon2Hasher {
    fn hash(&self, password: &str) -> Result<String, AuthError> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        argon2
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|e| AuthError::HashFailed(e.to_string()))
    }

    fn verify(&self, password: &str, phc: &str) -> Result<bool, AuthError> {
        let parsed = PasswordHash::new(phc).map_err(|e| AuthError::MalformedHash(e.to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_round_trips() {
        let hasher = Argon2Hasher;
        let phc = hasher.hash("correct horse battery staple").unwrap();
        assert!(hasher.verify("correct horse battery staple", &phc).unwrap());
        assert!(!hasher.verify("wrong password", &phc).unwrap());
    }

    #[test]
    fn malformed_stored_hash_is_reported_rather_than_panicking() {
        let hasher = Argon2Hasher;
        let err = hasher.verify("anything", "not-a-phc-string").unwrap_err();
        assert!(matches!(err, AuthError::MalformedHash(_)));
    }
}
