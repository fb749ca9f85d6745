//! Auth Errors
//! Mission: Typed failure taxonomy for the identity core

use thiserror::Error;

use crate::store::StoreError;

/// Every identity operation fails with exactly one of these; nothing is
/// caught and suppressed on the way up.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Entity, role, or session absent.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// Password hash check failed.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Refresh session missing or past its expiry.
    #[error("refresh session expired")]
    SessionExpired,

    /// Access token signature or structure invalid.
    #[error("malformed credential")]
    MalformedCredential,

    /// Live-scope uniqueness violation.
    #[error("a user with this {0} already exists")]
    AlreadyExists(&'static str),

    /// Malformed input (bad id format, invalid email/phone under
    /// enforcement).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Password hashing backend failure.
    #[error("password hashing failed")]
    Hashing,

    /// Storage transport failure, propagated unchanged.
    #[error(transparent)]
    Store(#[from] StoreError),
}
