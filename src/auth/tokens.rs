//! Token Issuer
//! Mission: Mint access tokens and refresh values, recover claims from
//! expired tokens
//!
//! Access tokens are short-lived HS256 JWTs carrying [`AccessClaims`].
//! Refresh values are opaque high-entropy strings with no embedded expiry;
//! their lifetime lives on the stored session. `recover_claims` deliberately
//! accepts tokens past their expiry so a refresh exchange can reuse the
//! claim set without re-authentication, while still rejecting anything with
//! a bad signature or structure.

use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::debug;

use super::error::AuthError;
use super::models::AccessClaims;

/// Refresh values are 64 alphanumeric chars (~380 bits of entropy).
const REFRESH_VALUE_LEN: usize = 64;

pub struct TokenIssuer {
    secret: String,
    access_ttl_minutes: i64,
}

impl TokenIssuer {
    pub fn new(secret: String, access_ttl_minutes: i64) -> Self {
        Self {
            secret,
            access_ttl_minutes,
        }
    }

    /// Sign an access token from the claim set, stamping the expiry.
    pub fn issue_access(&self, mut claims: AccessClaims) -> Result<String, AuthError> {
        let expiry = Utc::now() + chrono::Duration::minutes(self.access_ttl_minutes);
        claims.exp = expiry.timestamp() as usize;

        debug!(sub = %claims.sub, "issuing access token");

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|_| AuthError::MalformedCredential)
    }

    /// Cryptographically random opaque refresh value.
    pub fn issue_refresh_value(&self) -> String {
        rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(REFRESH_VALUE_LEN)
            .map(char::from)
            .collect()
    }

    /// Strict validation for the request path: signature, structure, expiry.
    pub fn validate(&self, token: &str) -> Result<AccessClaims, AuthError> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::MalformedCredential)
    }

    /// Recover the claim set from an expired-but-intact access token.
    ///
    /// Signature and structure are still enforced; only the expiry check is
    /// relaxed. Tampered or unsigned tokens fail with `MalformedCredential`.
    pub fn recover_claims(&self, token: &str) -> Result<AccessClaims, AuthError> {
        let mut validation = Validation::default();
        validation.validate_exp = false;

        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )
        .map(|data| data.claims)
        .map_err(|_| AuthError::MalformedCredential)
    }
}
