//! Entity Base
//! Mission: Shared identity and audit fields for every stored document

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

/// Audit block shared by every persisted entity.
///
/// `is_deleted` is the tombstone flag: records are never physically removed,
/// they are marked deleted and filtered out of all normal reads.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityMeta {
    pub id: Uuid,
    #[serde(default)]
    pub is_deleted: bool,
    pub created_date_utc: DateTime<Utc>,
    pub created_by_id: Option<Uuid>,
    pub last_modified_date_utc: Option<DateTime<Utc>>,
    pub last_modified_by_id: Option<Uuid>,
}

impl EntityMeta {
    /// Fresh metadata with a random id, created now, live.
    pub fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            is_deleted: false,
            created_date_utc: Utc::now(),
            created_by_id: None,
            last_modified_date_utc: None,
            last_modified_by_id: None,
        }
    }

    /// Fresh metadata attributed to a creator.
    pub fn created_by(creator: Uuid) -> Self {
        Self {
            created_by_id: Some(creator),
            ..Self::new()
        }
    }

    /// Stamp the modification audit fields.
    pub fn touch(&mut self, modifier: Option<Uuid>) {
        self.last_modified_date_utc = Some(Utc::now());
        self.last_modified_by_id = modifier;
    }
}

impl Default for EntityMeta {
    fn default() -> Self {
        Self::new()
    }
}

/// A document type that can live in a [`Collection`](super::Collection).
///
/// Implementors embed an [`EntityMeta`] (flattened into the serialized
/// document) and name the collection that owns them.
pub trait Entity:
    Clone + Send + Sync + Serialize + DeserializeOwned + 'static
{
    /// Collection (table) name the entity kind is stored under.
    const COLLECTION: &'static str;

    fn meta(&self) -> &EntityMeta;
    fn meta_mut(&mut self) -> &mut EntityMeta;

    fn id(&self) -> Uuid {
        self.meta().id
    }

    fn is_deleted(&self) -> bool {
        self.meta().is_deleted
    }
}
