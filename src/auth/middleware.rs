//! Authentication Middleware
//! Mission: Gate protected endpoints behind access-token validation
//!
//! The validated claims are inserted into request extensions, which is the
//! per-request carrier for caller identity. Nothing identity-related lives
//! in process-wide state.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;

use super::tokens::TokenIssuer;

/// Validates the bearer token and stashes the claims for handlers.
pub async fn auth_middleware(
    State(issuer): State<Arc<TokenIssuer>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthMiddlewareError> {
    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|t| t.to_string())
        .ok_or(AuthMiddlewareError::MissingToken)?;

    let claims = issuer
        .validate(&token)
        .map_err(|_| AuthMiddlewareError::InvalidToken)?;

    req.extensions_mut().insert(claims);
    Ok(next.run(req).await)
}

#[derive(Debug)]
pub enum AuthMiddlewareError {
    MissingToken,
    InvalidToken,
}

impl IntoResponse for AuthMiddlewareError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AuthMiddlewareError::MissingToken => {
                (StatusCode::UNAUTHORIZED, "Missing authorization token")
            }
            AuthMiddlewareError::InvalidToken => {
                (StatusCode::UNAUTHORIZED, "Invalid or expired token")
            }
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_middleware_error_responses() {
        let missing = AuthMiddlewareError::MissingToken.into_response();
        assert_eq!(missing.status(), StatusCode::UNAUTHORIZED);

        let invalid = AuthMiddlewareError::InvalidToken.into_response();
        assert_eq!(invalid.status(), StatusCode::UNAUTHORIZED);
    }
}
