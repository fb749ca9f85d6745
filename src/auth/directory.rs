//! User Directory & Role Catalog
//! Mission: Soft-delete-backed user identity plus read-only role reference data

use parking_lot::Mutex;
use rusqlite::Connection;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::store::{Entity, PagedList, SoftDeleteStore, SqliteCollection, StoreError};

use super::models::{Role, User};

/// Exclusive owner of `User` records. Bans are tombstones: a banned user
/// disappears from every live lookup, including the login path.
pub struct UserDirectory {
    store: SoftDeleteStore<User>,
}

impl UserDirectory {
    pub fn open(conn: Arc<Mutex<Connection>>) -> Result<Self, StoreError> {
        Ok(Self {
            store: SoftDeleteStore::new(SqliteCollection::open(conn)?),
        })
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        self.store.find_by_id(id).await
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.store.find_one(&move |u: &User| u.email == email).await
    }

    /// Live-scope uniqueness check, optionally excluding one user's own
    /// record (profile updates).
    pub async fn email_in_use(
        &self,
        email: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        self.store
            .exists(&move |u: &User| u.email == email && Some(u.id()) != exclude)
            .await
    }

    pub async fn phone_in_use(
        &self,
        phone: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        self.store
            .exists(&move |u: &User| u.phone == phone && Some(u.id()) != exclude)
            .await
    }

    pub async fn insert(&self, user: User) -> Result<User, StoreError> {
        self.store.insert(user).await
    }

    pub async fn update(&self, user: User) -> Result<User, StoreError> {
        self.store.update(user).await
    }

    /// Tombstone the account. Idempotent.
    pub async fn ban(&self, user: User, by: Option<Uuid>) -> Result<User, StoreError> {
        self.store.soft_delete(user, by).await
    }

    /// Lift a ban. Looks past the live view to find the tombstoned record.
    pub async fn unban(&self, id: Uuid, by: Option<Uuid>) -> Result<Option<User>, StoreError> {
        match self.store.find_by_id_including_deleted(id).await? {
            Some(user) => Ok(Some(self.store.restore(user, by).await?)),
            None => Ok(None),
        }
    }

    pub async fn paged_list(
        &self,
        page_number: u64,
        page_size: u64,
        include_deleted: bool,
    ) -> Result<PagedList<User>, StoreError> {
        self.store
            .paged_list(page_number, page_size, include_deleted)
            .await
    }

    pub async fn count(&self) -> Result<u64, StoreError> {
        self.store.count(None, false).await
    }
}

/// Shared read-only role reference data, looked up by name.
pub struct RoleCatalog {
    store: SoftDeleteStore<Role>,
}

impl RoleCatalog {
    pub fn open(conn: Arc<Mutex<Connection>>) -> Result<Self, StoreError> {
        Ok(Self {
            store: SoftDeleteStore::new(SqliteCollection::open(conn)?),
        })
    }

    pub async fn find_by_name(&self, name: &str) -> Result<Option<Role>, StoreError> {
        self.store.find_one(&move |r: &Role| r.name == name).await
    }

    /// Insert any catalog entries that do not exist yet. Run at startup.
    pub async fn seed(&self, names: &[&str]) -> Result<(), StoreError> {
        for name in names {
            if self.find_by_name(name).await?.is_none() {
                self.store.insert(Role::named(name)).await?;
                info!(role = *name, "seeded role");
            }
        }
        Ok(())
    }
}
