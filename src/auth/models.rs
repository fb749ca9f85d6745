//! Identity Models
//! Mission: Entities, claims, and request/response shapes for the identity core

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::{Entity, EntityMeta};

/// Name of the role every new account starts with.
pub const DEFAULT_ROLE: &str = "User";

/// Name of the role that unlocks the administrative surface.
pub const ADMIN_ROLE: &str = "Admin";

/// Read-only reference data, addressed by name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Role {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub name: String,
}

impl Role {
    pub fn named(name: &str) -> Self {
        Self {
            meta: EntityMeta::new(),
            name: name.to_string(),
        }
    }
}

impl Entity for Role {
    const COLLECTION: &'static str = "roles";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

/// User account. Roles are value copies taken at assignment time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password_hash: String, // bcrypt digest, never the plaintext
    pub roles: Vec<Role>,
}

impl User {
    pub fn has_role(&self, name: &str) -> bool {
        self.roles.iter().any(|r| r.name == name)
    }
}

impl Entity for User {
    const COLLECTION: &'static str = "users";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

/// Long-lived rotating refresh credential. Tombstoned when rotated out or
/// revoked, never removed (audit trail).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshSession {
    #[serde(flatten)]
    pub meta: EntityMeta,
    pub token: String,
    pub owner_user_id: Uuid,
    pub expiry_date_utc: DateTime<Utc>,
}

impl Entity for RefreshSession {
    const COLLECTION: &'static str = "refresh_sessions";

    fn meta(&self) -> &EntityMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut EntityMeta {
        &mut self.meta
    }
}

/// Claim set carried by every access token: subject id, contact fields,
/// one entry per role name, and the embedded expiry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub phone: String,
    pub roles: Vec<String>,
    pub exp: usize,
}

impl AccessClaims {
    /// Build the claim set for a user. `exp` is stamped at issuance.
    pub fn for_user(user: &User) -> Self {
        Self {
            sub: user.id(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            roles: user.roles.iter().map(|r| r.name.clone()).collect(),
            exp: 0,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == ADMIN_ROLE)
    }
}

/// Access/refresh credential pair returned by login, signup, and refresh.
/// Transient; never persisted as an entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Signup request body.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token refresh request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

/// Profile patch. Absent fields are left untouched; an absent or empty
/// password leaves the hash as it is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub password: Option<String>,
}

/// Sanitized user view. The password hash never leaves the service.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub roles: Vec<String>,
    pub created_date_utc: DateTime<Utc>,
}

impl UserResponse {
    pub fn from_user(user: &User) -> Self {
        Self {
            id: user.id(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            roles: user.roles.iter().map(|r| r.name.clone()).collect(),
            created_date_utc: user.meta.created_date_utc,
        }
    }
}

/// Login/signup/update response: the user plus a fresh token pair.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub user: UserResponse,
    pub tokens: TokenPair,
}
