//! Store Errors
//! Mission: Typed failures for the persistence layer

use thiserror::Error;

/// Failures surfaced by collections and stores.
///
/// Lookups signal absence via `Option`, never via an error; `NotFound` is
/// reserved for writes that target a missing document.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying transport failure. Never swallowed, always propagated.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write targeted a document that does not exist.
    #[error("document not found")]
    NotFound,

    /// A document could not be encoded or decoded.
    #[error("document serialization failed: {0}")]
    Serialization(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Unavailable(e.to_string())
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serialization(e.to_string())
    }
}
