//! Identity API Endpoints
//! Mission: HTTP surface for authentication and user administration

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use crate::store::{PagedList, StoreError};

use super::error::AuthError;
use super::models::{
    AccessClaims, AuthResponse, CreateUserRequest, LoginRequest, RefreshRequest, TokenPair,
    UpdateUserRequest, UserResponse,
};
use super::service::AuthService;

/// Shared handler state.
#[derive(Clone)]
pub struct AuthState {
    pub service: Arc<AuthService>,
}

/// Signup - POST /api/auth/signup
pub async fn signup(
    State(state): State<AuthState>,
    Json(payload): Json<CreateUserRequest>,
) -> Result<Json<AuthResponse>, AuthApiError> {
    Ok(Json(state.service.signup(payload).await?))
}

/// Login - POST /api/auth/login
pub async fn login(
    State(state): State<AuthState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, AuthApiError> {
    Ok(Json(
        state.service.login(&payload.email, &payload.password).await?,
    ))
}

/// Token refresh - POST /api/auth/refresh
pub async fn refresh(
    State(state): State<AuthState>,
    Json(payload): Json<RefreshRequest>,
) -> Result<Json<TokenPair>, AuthApiError> {
    Ok(Json(
        state
            .service
            .refresh(&payload.access_token, &payload.refresh_token)
            .await?,
    ))
}

/// Current user - GET /api/auth/me
pub async fn me(
    State(state): State<AuthState>,
    Extension(claims): Extension<AccessClaims>,
) -> Result<Json<UserResponse>, AuthApiError> {
    Ok(Json(state.service.current_user(&claims).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub include_deleted: bool,
}

fn default_page() -> u64 {
    1
}

fn default_page_size() -> u64 {
    25
}

/// Paged user listing - GET /api/users (Admin only)
pub async fn list_users(
    State(state): State<AuthState>,
    Extension(claims): Extension<AccessClaims>,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<PagedList<UserResponse>>, AuthApiError> {
    require_admin(&claims)?;
    Ok(Json(
        state
            .service
            .list_users(query.page, query.page_size, query.include_deleted)
            .await?,
    ))
}

/// Fetch one user - GET /api/users/:id
pub async fn get_user(
    State(state): State<AuthState>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AuthApiError> {
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.service.get_user(id).await?))
}

/// Profile update - PATCH /api/users/:id (self or Admin)
pub async fn update_user(
    State(state): State<AuthState>,
    Extension(claims): Extension<AccessClaims>,
    Path(user_id): Path<String>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<AuthResponse>, AuthApiError> {
    let id = parse_user_id(&user_id)?;
    if id != claims.sub {
        require_admin(&claims)?;
    }
    Ok(Json(state.service.update_profile(id, payload).await?))
}

/// Ban - POST /api/users/:id/ban (Admin only)
pub async fn ban_user(
    State(state): State<AuthState>,
    Extension(claims): Extension<AccessClaims>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AuthApiError> {
    require_admin(&claims)?;
    let id = parse_user_id(&user_id)?;
    if id == claims.sub {
        return Err(AuthApiError::CannotBanSelf);
    }
    Ok(Json(state.service.ban(id, Some(claims.sub)).await?))
}

/// Unban - POST /api/users/:id/unban (Admin only)
pub async fn unban_user(
    State(state): State<AuthState>,
    Extension(claims): Extension<AccessClaims>,
    Path(user_id): Path<String>,
) -> Result<Json<UserResponse>, AuthApiError> {
    require_admin(&claims)?;
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.service.unban(id, Some(claims.sub)).await?))
}

/// Grant role - PUT /api/users/:id/roles/:name (Admin only)
pub async fn add_role(
    State(state): State<AuthState>,
    Extension(claims): Extension<AccessClaims>,
    Path((user_id, role_name)): Path<(String, String)>,
) -> Result<Json<UserResponse>, AuthApiError> {
    require_admin(&claims)?;
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.service.add_role(id, &role_name).await?))
}

/// Revoke role - DELETE /api/users/:id/roles/:name (Admin only)
pub async fn remove_role(
    State(state): State<AuthState>,
    Extension(claims): Extension<AccessClaims>,
    Path((user_id, role_name)): Path<(String, String)>,
) -> Result<Json<UserResponse>, AuthApiError> {
    require_admin(&claims)?;
    let id = parse_user_id(&user_id)?;
    Ok(Json(state.service.remove_role(id, &role_name).await?))
}

fn require_admin(claims: &AccessClaims) -> Result<(), AuthApiError> {
    if claims.is_admin() {
        Ok(())
    } else {
        Err(AuthApiError::Forbidden)
    }
}

fn parse_user_id(raw: &str) -> Result<Uuid, AuthApiError> {
    Uuid::parse_str(raw).map_err(|_| AuthApiError::InvalidUserId)
}

/// API-level failures: the service taxonomy plus HTTP-only concerns.
#[derive(Debug)]
pub enum AuthApiError {
    Service(AuthError),
    Forbidden,
    InvalidUserId,
    CannotBanSelf,
}

impl From<AuthError> for AuthApiError {
    fn from(e: AuthError) -> Self {
        AuthApiError::Service(e)
    }
}

impl IntoResponse for AuthApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AuthApiError::Service(e) => match e {
                AuthError::NotFound(what) => {
                    return (StatusCode::NOT_FOUND, format!("{what} not found"))
                        .into_response()
                }
                AuthError::InvalidCredentials => {
                    (StatusCode::UNAUTHORIZED, "Invalid email or password")
                }
                AuthError::SessionExpired => {
                    (StatusCode::UNAUTHORIZED, "Refresh session expired")
                }
                AuthError::MalformedCredential => {
                    (StatusCode::UNAUTHORIZED, "Malformed credential")
                }
                AuthError::AlreadyExists(_) => {
                    (StatusCode::CONFLICT, "A user with these details already exists")
                }
                AuthError::InvalidInput(reason) => {
                    return (StatusCode::BAD_REQUEST, reason.clone()).into_response()
                }
                AuthError::Hashing => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
                AuthError::Store(StoreError::Unavailable(reason)) => {
                    warn!(%reason, "storage unavailable");
                    (StatusCode::SERVICE_UNAVAILABLE, "Storage unavailable")
                }
                AuthError::Store(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
                }
            },
            AuthApiError::Forbidden => (StatusCode::FORBIDDEN, "Insufficient permissions"),
            AuthApiError::InvalidUserId => (StatusCode::BAD_REQUEST, "Invalid user ID format"),
            AuthApiError::CannotBanSelf => {
                (StatusCode::BAD_REQUEST, "Cannot ban your own account")
            }
        };

        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_mapping() {
        let cases: Vec<(AuthApiError, StatusCode)> = vec![
            (AuthError::NotFound("user").into(), StatusCode::NOT_FOUND),
            (AuthError::InvalidCredentials.into(), StatusCode::UNAUTHORIZED),
            (AuthError::SessionExpired.into(), StatusCode::UNAUTHORIZED),
            (
                AuthError::MalformedCredential.into(),
                StatusCode::UNAUTHORIZED,
            ),
            (AuthError::AlreadyExists("email").into(), StatusCode::CONFLICT),
            (
                AuthError::InvalidInput("bad".to_string()).into(),
                StatusCode::BAD_REQUEST,
            ),
            (
                AuthError::Store(StoreError::Unavailable("down".to_string())).into(),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (AuthApiError::Forbidden, StatusCode::FORBIDDEN),
            (AuthApiError::InvalidUserId, StatusCode::BAD_REQUEST),
            (AuthApiError::CannotBanSelf, StatusCode::BAD_REQUEST),
        ];

        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn test_parse_user_id() {
        assert!(parse_user_id(&Uuid::new_v4().to_string()).is_ok());
        assert!(matches!(
            parse_user_id("not-a-uuid"),
            Err(AuthApiError::InvalidUserId)
        ));
    }

    #[test]
    fn test_require_admin() {
        let mut claims = AccessClaims {
            sub: Uuid::new_v4(),
            email: String::new(),
            phone: String::new(),
            roles: vec!["User".to_string()],
            exp: 0,
        };
        assert!(matches!(
            require_admin(&claims),
            Err(AuthApiError::Forbidden)
        ));

        claims.roles.push("Admin".to_string());
        assert!(require_admin(&claims).is_ok());
    }
}
