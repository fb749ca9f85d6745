//! Password Hashing
//! Mission: Opaque digest capability, algorithm details stay behind the trait

use bcrypt::{hash, verify, DEFAULT_COST};

use super::error::AuthError;

/// Stateless hashing capability consumed by the auth service.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError>;
    fn check(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError>;
}

/// bcrypt-backed hasher at the library default cost.
pub struct BcryptHasher;

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        hash(plaintext, DEFAULT_COST).map_err(|_| AuthError::Hashing)
    }

    fn check(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError> {
        verify(plaintext, digest).map_err(|_| AuthError::Hashing)
    }
}
