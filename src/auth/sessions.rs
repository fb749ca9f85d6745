//! Refresh Sessions
//! Mission: Long-lived rotating credentials with tombstone revocation
//!
//! Multiple live sessions per user are allowed (multi-device). Rotation is
//! tombstone-old-then-insert-new; the tombstone is idempotent, so two
//! concurrent refreshes racing on the same soon-to-expire session collapse
//! into a benign duplicate rather than an error.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::store::{EntityMeta, SoftDeleteStore, SqliteCollection, StoreError};

use super::models::RefreshSession;

pub struct RefreshSessionStore {
    store: SoftDeleteStore<RefreshSession>,
}

impl RefreshSessionStore {
    pub fn open(conn: Arc<Mutex<Connection>>) -> Result<Self, StoreError> {
        Ok(Self {
            store: SoftDeleteStore::new(SqliteCollection::open(conn)?),
        })
    }

    /// The live session matching the presented token value and owner.
    ///
    /// Expiry is not checked here; the caller distinguishes "absent" from
    /// "present but past expiry" when mapping to `SessionExpired`.
    pub async fn find_live(
        &self,
        token: &str,
        owner: Uuid,
    ) -> Result<Option<RefreshSession>, StoreError> {
        self.store
            .find_one(&move |s: &RefreshSession| {
                s.token == token && s.owner_user_id == owner
            })
            .await
    }

    /// Persist a fresh session for `owner` with the given token value.
    pub async fn issue(
        &self,
        owner: Uuid,
        token: String,
        expiry: DateTime<Utc>,
    ) -> Result<RefreshSession, StoreError> {
        let session = RefreshSession {
            meta: EntityMeta::created_by(owner),
            token,
            owner_user_id: owner,
            expiry_date_utc: expiry,
        };
        debug!(owner = %owner, expiry = %expiry, "issuing refresh session");
        self.store.insert(session).await
    }

    /// Tombstone the outgoing session and persist its replacement.
    pub async fn rotate(
        &self,
        old: RefreshSession,
        token: String,
        expiry: DateTime<Utc>,
    ) -> Result<RefreshSession, StoreError> {
        let owner = old.owner_user_id;
        self.store.soft_delete(old, Some(owner)).await?;
        self.issue(owner, token, expiry).await
    }

    /// Explicit revocation (logout, admin action).
    pub async fn revoke(&self, session: RefreshSession) -> Result<RefreshSession, StoreError> {
        let owner = session.owner_user_id;
        self.store.soft_delete(session, Some(owner)).await
    }
}
