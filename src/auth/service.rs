//! Authentication Service
//! Mission: Orchestrate login, signup, token refresh, and user administration
//!
//! Composes the user directory, role catalog, refresh-session store, token
//! issuer, and password hasher. Caller identity is carried per request (the
//! middleware puts the validated claims in request extensions); there is no
//! process-wide ambient identity.

use chrono::Utc;
use lazy_static::lazy_static;
use regex::Regex;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::store::{Entity, EntityMeta, PagedList};

use super::directory::{RoleCatalog, UserDirectory};
use super::error::AuthError;
use super::models::{
    AccessClaims, AuthResponse, CreateUserRequest, TokenPair, UpdateUserRequest, User,
    UserResponse, DEFAULT_ROLE,
};
use super::password::PasswordHasher;
use super::sessions::RefreshSessionStore;
use super::tokens::TokenIssuer;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    static ref PHONE_RE: Regex = Regex::new(r"^\+[0-9]{1,15}$").unwrap();
}

/// Lifecycle policy knobs.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    /// When false, format and uniqueness violations are logged but not
    /// rejected. The soft-launch behavior of the system this replaces.
    pub enforce_validation: bool,
    /// Lifetime of a newly issued refresh session, in days.
    pub refresh_ttl_days: i64,
    /// Sessions with less remaining lifetime than this are rotated on use.
    pub rotation_threshold_days: i64,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            enforce_validation: false,
            refresh_ttl_days: 10,
            rotation_threshold_days: 7,
        }
    }
}

pub struct AuthService {
    users: UserDirectory,
    roles: RoleCatalog,
    sessions: RefreshSessionStore,
    tokens: Arc<TokenIssuer>,
    hasher: Arc<dyn PasswordHasher>,
    policy: AuthPolicy,
}

impl AuthService {
    pub fn new(
        users: UserDirectory,
        roles: RoleCatalog,
        sessions: RefreshSessionStore,
        tokens: Arc<TokenIssuer>,
        hasher: Arc<dyn PasswordHasher>,
        policy: AuthPolicy,
    ) -> Self {
        Self {
            users,
            roles,
            sessions,
            tokens,
            hasher,
            policy,
        }
    }

    pub fn users(&self) -> &UserDirectory {
        &self.users
    }

    pub fn roles(&self) -> &RoleCatalog {
        &self.roles
    }

    pub fn sessions(&self) -> &RefreshSessionStore {
        &self.sessions
    }

    /// Create an account with the default role and log it straight in.
    pub async fn signup(&self, req: CreateUserRequest) -> Result<AuthResponse, AuthError> {
        self.validate_contact(Some(&req.email), Some(&req.phone), None)
            .await?;

        let default_role = self
            .roles
            .find_by_name(DEFAULT_ROLE)
            .await?
            .ok_or(AuthError::NotFound("role"))?;

        let user = User {
            meta: EntityMeta::new(),
            first_name: req.first_name,
            last_name: req.last_name,
            email: req.email,
            phone: req.phone,
            password_hash: self.hasher.hash(&req.password)?,
            roles: vec![default_role],
        };
        let user = self.users.insert(user).await?;

        info!(user_id = %user.id(), "user signed up");
        let tokens = self.issue_token_pair(&user).await?;
        Ok(AuthResponse {
            user: UserResponse::from_user(&user),
            tokens,
        })
    }

    /// Authenticate by email and password. Prior sessions stay live
    /// (multi-device by design).
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthResponse, AuthError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AuthError::NotFound("user"))?;

        if !self.hasher.check(password, &user.password_hash)? {
            warn!(email, "failed login attempt");
            return Err(AuthError::InvalidCredentials);
        }

        info!(user_id = %user.id(), "login successful");
        let tokens = self.issue_token_pair(&user).await?;
        Ok(AuthResponse {
            user: UserResponse::from_user(&user),
            tokens,
        })
    }

    /// Exchange an expired access token plus a live refresh session for a
    /// fresh pair, rotating the session when it is close to expiry.
    ///
    /// Sliding window: a session used regularly self-extends; one unused
    /// for the full refresh TTL dies.
    pub async fn refresh(
        &self,
        access_token: &str,
        refresh_token: &str,
    ) -> Result<TokenPair, AuthError> {
        let claims = self.tokens.recover_claims(access_token)?;

        let session = self
            .sessions
            .find_live(refresh_token, claims.sub)
            .await?
            .ok_or(AuthError::SessionExpired)?;

        let now = Utc::now();
        if session.expiry_date_utc < now {
            return Err(AuthError::SessionExpired);
        }

        let threshold = chrono::Duration::days(self.policy.rotation_threshold_days);
        let refresh_token = if session.expiry_date_utc - now < threshold {
            let expiry = now + chrono::Duration::days(self.policy.refresh_ttl_days);
            let rotated = self
                .sessions
                .rotate(session, self.tokens.issue_refresh_value(), expiry)
                .await?;
            info!(user_id = %claims.sub, "refresh session rotated");
            rotated.token
        } else {
            refresh_token.to_string()
        };

        Ok(TokenPair {
            access_token: self.tokens.issue_access(claims)?,
            refresh_token,
        })
    }

    /// Apply a profile patch and re-issue credentials (claims such as the
    /// email may have changed).
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: UpdateUserRequest,
    ) -> Result<AuthResponse, AuthError> {
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("user"))?;

        self.validate_contact(patch.email.as_deref(), patch.phone.as_deref(), Some(user_id))
            .await?;

        if let Some(first_name) = patch.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = last_name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(phone) = patch.phone {
            user.phone = phone;
        }
        match patch.password.as_deref() {
            Some(password) if !password.is_empty() => {
                user.password_hash = self.hasher.hash(password)?;
            }
            _ => {} // absent or empty: hash untouched
        }
        user.meta.touch(Some(user_id));

        let user = self.users.update(user).await?;
        let tokens = self.issue_token_pair(&user).await?;
        Ok(AuthResponse {
            user: UserResponse::from_user(&user),
            tokens,
        })
    }

    /// Tombstone the account. Already-issued access tokens stay valid until
    /// natural expiry; only the login path is cut off immediately.
    pub async fn ban(&self, user_id: Uuid, by: Option<Uuid>) -> Result<UserResponse, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("user"))?;
        let banned = self.users.ban(user, by).await?;
        warn!(user_id = %user_id, "user banned");
        Ok(UserResponse::from_user(&banned))
    }

    pub async fn unban(&self, user_id: Uuid, by: Option<Uuid>) -> Result<UserResponse, AuthError> {
        let user = self
            .users
            .unban(user_id, by)
            .await?
            .ok_or(AuthError::NotFound("user"))?;
        info!(user_id = %user_id, "user unbanned");
        Ok(UserResponse::from_user(&user))
    }

    /// Attach a catalog role to the user, by value copy.
    pub async fn add_role(
        &self,
        user_id: Uuid,
        role_name: &str,
    ) -> Result<UserResponse, AuthError> {
        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or(AuthError::NotFound("role"))?;
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("user"))?;

        if !user.has_role(&role.name) {
            user.roles.push(role);
            user.meta.touch(None);
            user = self.users.update(user).await?;
        }
        Ok(UserResponse::from_user(&user))
    }

    /// Detach a role by name. Removing a role the user does not hold is a
    /// no-op, not an error.
    pub async fn remove_role(
        &self,
        user_id: Uuid,
        role_name: &str,
    ) -> Result<UserResponse, AuthError> {
        let role = self
            .roles
            .find_by_name(role_name)
            .await?
            .ok_or(AuthError::NotFound("role"))?;
        let mut user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("user"))?;

        if user.has_role(&role.name) {
            user.roles.retain(|r| r.name != role.name);
            user.meta.touch(None);
            user = self.users.update(user).await?;
        }
        Ok(UserResponse::from_user(&user))
    }

    /// The caller's own record, resolved from validated claims.
    pub async fn current_user(&self, claims: &AccessClaims) -> Result<UserResponse, AuthError> {
        self.get_user(claims.sub).await
    }

    pub async fn get_user(&self, user_id: Uuid) -> Result<UserResponse, AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::NotFound("user"))?;
        Ok(UserResponse::from_user(&user))
    }

    /// Administrative listing. `include_deleted` drives the page and the
    /// totals together.
    pub async fn list_users(
        &self,
        page_number: u64,
        page_size: u64,
        include_deleted: bool,
    ) -> Result<PagedList<UserResponse>, AuthError> {
        let page = self
            .users
            .paged_list(page_number, page_size, include_deleted)
            .await?;
        Ok(page.map(|u| UserResponse::from_user(&u)))
    }

    async fn issue_token_pair(&self, user: &User) -> Result<TokenPair, AuthError> {
        let expiry = Utc::now() + chrono::Duration::days(self.policy.refresh_ttl_days);
        let session = self
            .sessions
            .issue(user.id(), self.tokens.issue_refresh_value(), expiry)
            .await?;
        Ok(TokenPair {
            access_token: self.tokens.issue_access(AccessClaims::for_user(user))?,
            refresh_token: session.token,
        })
    }

    /// Format and live-scope uniqueness checks for email and phone.
    ///
    /// With `enforce_validation` off, violations are logged and allowed
    /// through; with it on, they become typed failures.
    async fn validate_contact(
        &self,
        email: Option<&str>,
        phone: Option<&str>,
        exclude: Option<Uuid>,
    ) -> Result<(), AuthError> {
        let enforce = self.policy.enforce_validation;

        if let Some(email) = email.filter(|e| !e.is_empty()) {
            if !EMAIL_RE.is_match(email) {
                warn!(email, "email fails format validation");
                if enforce {
                    return Err(AuthError::InvalidInput(format!(
                        "'{email}' is not a valid email address"
                    )));
                }
            }
            if self.users.email_in_use(email, exclude).await? {
                warn!(email, "email already in use by a live user");
                if enforce {
                    return Err(AuthError::AlreadyExists("email"));
                }
            }
        }

        if let Some(phone) = phone.filter(|p| !p.is_empty()) {
            if !PHONE_RE.is_match(phone) {
                warn!(phone, "phone fails format validation");
                if enforce {
                    return Err(AuthError::InvalidInput(format!(
                        "'{phone}' is not a valid phone number"
                    )));
                }
            }
            if self.users.phone_in_use(phone, exclude).await? {
                warn!(phone, "phone already in use by a live user");
                if enforce {
                    return Err(AuthError::AlreadyExists("phone"));
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::{ADMIN_ROLE, RefreshRequest};
    use crate::auth::password::BcryptHasher;
    use parking_lot::Mutex;
    use rusqlite::Connection;
    use tempfile::NamedTempFile;

    const SECRET: &str = "test-secret-key-12345";

    async fn setup(enforce_validation: bool) -> (AuthService, NamedTempFile) {
        let file = NamedTempFile::new().unwrap();
        let conn = Arc::new(Mutex::new(Connection::open(file.path()).unwrap()));

        let roles = RoleCatalog::open(conn.clone()).unwrap();
        roles.seed(&[DEFAULT_ROLE, ADMIN_ROLE]).await.unwrap();

        let service = AuthService::new(
            UserDirectory::open(conn.clone()).unwrap(),
            roles,
            RefreshSessionStore::open(conn).unwrap(),
            Arc::new(TokenIssuer::new(SECRET.to_string(), 60)),
            Arc::new(BcryptHasher),
            AuthPolicy {
                enforce_validation,
                ..AuthPolicy::default()
            },
        );
        (service, file)
    }

    fn signup_request(email: &str, phone: &str) -> CreateUserRequest {
        CreateUserRequest {
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: email.to_string(),
            phone: phone.to_string(),
            password: "Secret123".to_string(),
        }
    }

    #[tokio::test]
    async fn test_signup_then_login_roundtrip() {
        let (service, _file) = setup(false).await;

        let created = service
            .signup(signup_request("ada@x.com", "+15550100"))
            .await
            .unwrap();
        assert_eq!(created.user.roles, vec![DEFAULT_ROLE]);

        let session = service.login("ada@x.com", "Secret123").await.unwrap();
        let claims = TokenIssuer::new(SECRET.to_string(), 60)
            .recover_claims(&session.tokens.access_token)
            .unwrap();
        assert_eq!(claims.sub, created.user.id);
        assert_eq!(claims.email, "ada@x.com");
        assert_eq!(claims.roles, vec![DEFAULT_ROLE]);
    }

    #[tokio::test]
    async fn test_login_failures_are_typed() {
        let (service, _file) = setup(false).await;
        service
            .signup(signup_request("ada@x.com", "+15550100"))
            .await
            .unwrap();

        assert!(matches!(
            service.login("ghost@x.com", "Secret123").await,
            Err(AuthError::NotFound("user"))
        ));
        assert!(matches!(
            service.login("ada@x.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_email_uniqueness_live_scope() {
        let (service, _file) = setup(true).await;

        let first = service
            .signup(signup_request("a@x.com", "+15550100"))
            .await
            .unwrap();

        // Live user holds the email: second signup must fail.
        let err = service
            .signup(signup_request("a@x.com", "+15550199"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AlreadyExists("email")));

        // After the holder is banned the email is free again.
        service.ban(first.user.id, None).await.unwrap();
        service
            .signup(signup_request("a@x.com", "+15550199"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_advisory_mode_lets_duplicates_through() {
        let (service, _file) = setup(false).await;
        service
            .signup(signup_request("a@x.com", "+15550100"))
            .await
            .unwrap();
        // Same email, same phone: logged but not rejected.
        service
            .signup(signup_request("a@x.com", "+15550100"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_enforced_format_validation() {
        let (service, _file) = setup(true).await;

        assert!(matches!(
            service.signup(signup_request("not-an-email", "+15550100")).await,
            Err(AuthError::InvalidInput(_))
        ));
        assert!(matches!(
            service.signup(signup_request("ok@x.com", "12345")).await,
            Err(AuthError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_ban_blocks_login_unban_restores_it() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("b@x.com", "+15550101"))
            .await
            .unwrap();

        service.ban(created.user.id, None).await.unwrap();
        assert!(matches!(
            service.login("b@x.com", "Secret123").await,
            Err(AuthError::NotFound("user"))
        ));

        service.unban(created.user.id, None).await.unwrap();
        service.login("b@x.com", "Secret123").await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_rotates_only_near_expiry() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("c@x.com", "+15550102"))
            .await
            .unwrap();
        let user_id = created.user.id;
        let access = created.tokens.access_token;

        // 8 days left: no rotation, same value comes back.
        service
            .sessions
            .issue(
                user_id,
                "far-from-expiry".to_string(),
                Utc::now() + chrono::Duration::days(8),
            )
            .await
            .unwrap();
        let pair = service.refresh(&access, "far-from-expiry").await.unwrap();
        assert_eq!(pair.refresh_token, "far-from-expiry");

        // 5 days left: rotated, a fresh value comes back and the old one dies.
        service
            .sessions
            .issue(
                user_id,
                "near-expiry".to_string(),
                Utc::now() + chrono::Duration::days(5),
            )
            .await
            .unwrap();
        let pair = service.refresh(&access, "near-expiry").await.unwrap();
        assert_ne!(pair.refresh_token, "near-expiry");
        assert!(service
            .sessions
            .find_live("near-expiry", user_id)
            .await
            .unwrap()
            .is_none());

        // The rotated-in session works for the next exchange.
        service
            .refresh(&pair.access_token, &pair.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_refresh_past_expiry_fails() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("d@x.com", "+15550103"))
            .await
            .unwrap();

        service
            .sessions
            .issue(
                created.user.id,
                "already-dead".to_string(),
                Utc::now() - chrono::Duration::hours(1),
            )
            .await
            .unwrap();

        assert!(matches!(
            service
                .refresh(&created.tokens.access_token, "already-dead")
                .await,
            Err(AuthError::SessionExpired)
        ));
    }

    #[tokio::test]
    async fn test_refresh_rejects_unknown_session_and_bad_token() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("e@x.com", "+15550104"))
            .await
            .unwrap();

        // Session value that was never issued.
        assert!(matches!(
            service
                .refresh(&created.tokens.access_token, "never-issued")
                .await,
            Err(AuthError::SessionExpired)
        ));

        // Tampered access token never reaches the session lookup.
        let mut tampered = created.tokens.access_token.clone();
        tampered.pop();
        let req = RefreshRequest {
            access_token: tampered,
            refresh_token: created.tokens.refresh_token.clone(),
        };
        assert!(matches!(
            service.refresh(&req.access_token, &req.refresh_token).await,
            Err(AuthError::MalformedCredential)
        ));
    }

    #[tokio::test]
    async fn test_refresh_accepts_expired_access_token() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("f@x.com", "+15550105"))
            .await
            .unwrap();

        // Token already past its exp, signed with the same secret.
        let expired_access = TokenIssuer::new(SECRET.to_string(), -5)
            .issue_access(AccessClaims {
                sub: created.user.id,
                email: created.user.email.clone(),
                phone: created.user.phone.clone(),
                roles: created.user.roles.clone(),
                exp: 0,
            })
            .unwrap();

        service
            .refresh(&expired_access, &created.tokens.refresh_token)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_role_mutation_roundtrip() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("g@x.com", "+15550106"))
            .await
            .unwrap();
        let id = created.user.id;
        let before = created.user.roles.clone();

        let with_admin = service.add_role(id, ADMIN_ROLE).await.unwrap();
        assert!(with_admin.roles.contains(&ADMIN_ROLE.to_string()));

        let after = service.remove_role(id, ADMIN_ROLE).await.unwrap();
        assert_eq!(after.roles, before);

        // Removing an unheld role is a no-op.
        let again = service.remove_role(id, ADMIN_ROLE).await.unwrap();
        assert_eq!(again.roles, before);

        assert!(matches!(
            service.add_role(id, "Ghost").await,
            Err(AuthError::NotFound("role"))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_keeps_hash_without_password() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("h@x.com", "+15550107"))
            .await
            .unwrap();

        let updated = service
            .update_profile(
                created.user.id,
                UpdateUserRequest {
                    email: Some("h2@x.com".to_string()),
                    password: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.user.email, "h2@x.com");

        // Old password still valid, and the re-issued claims carry the new
        // email.
        service.login("h2@x.com", "Secret123").await.unwrap();
        let claims = TokenIssuer::new(SECRET.to_string(), 60)
            .recover_claims(&updated.tokens.access_token)
            .unwrap();
        assert_eq!(claims.email, "h2@x.com");
    }

    #[tokio::test]
    async fn test_update_profile_rehashes_new_password() {
        let (service, _file) = setup(false).await;
        let created = service
            .signup(signup_request("i@x.com", "+15550108"))
            .await
            .unwrap();

        service
            .update_profile(
                created.user.id,
                UpdateUserRequest {
                    password: Some("NewSecret456".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.login("i@x.com", "Secret123").await,
            Err(AuthError::InvalidCredentials)
        ));
        service.login("i@x.com", "NewSecret456").await.unwrap();
    }

    #[tokio::test]
    async fn test_update_profile_uniqueness_excludes_self() {
        let (service, _file) = setup(true).await;
        let created = service
            .signup(signup_request("j@x.com", "+15550109"))
            .await
            .unwrap();

        // Re-submitting your own email is not a conflict.
        service
            .update_profile(
                created.user.id,
                UpdateUserRequest {
                    email: Some("j@x.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Someone else's email is.
        service
            .signup(signup_request("k@x.com", "+15550110"))
            .await
            .unwrap();
        assert!(matches!(
            service
                .update_profile(
                    created.user.id,
                    UpdateUserRequest {
                        email: Some("k@x.com".to_string()),
                        ..Default::default()
                    },
                )
                .await,
            Err(AuthError::AlreadyExists("email"))
        ));
    }

    #[tokio::test]
    async fn test_list_users_paged_with_visibility() {
        let (service, _file) = setup(false).await;
        let mut first_id = None;
        for i in 0..5 {
            let created = service
                .signup(signup_request(
                    &format!("u{i}@x.com"),
                    &format!("+1555020{i}"),
                ))
                .await
                .unwrap();
            first_id.get_or_insert(created.user.id);
        }
        service.ban(first_id.unwrap(), None).await.unwrap();

        let live = service.list_users(1, 3, false).await.unwrap();
        assert_eq!(live.total_count, 4);
        assert_eq!(live.items.len(), 3);
        assert_eq!(live.total_pages, 2);

        let everything = service.list_users(1, 10, true).await.unwrap();
        assert_eq!(everything.total_count, 5);
    }
}
