//! Soft-Delete Store
//! Mission: Present a consistent live view over tombstoned documents
//!
//! Every read composes the caller's predicate with `is_deleted == false`;
//! deletes are tombstones, never removals. The single escape hatch is the
//! `include_deleted` flag on `page`, `paged_list` and `count`, which feeds
//! both the page query and the count query so totals and content always
//! agree.

use uuid::Uuid;

use super::collection::{Collection, Filter};
use super::entity::Entity;
use super::error::StoreError;
use super::paging::PagedList;

/// Generic persistence primitive over one entity kind.
pub struct SoftDeleteStore<T: Entity> {
    collection: Box<dyn Collection<T>>,
}

impl<T: Entity> SoftDeleteStore<T> {
    pub fn new(collection: impl Collection<T> + 'static) -> Self {
        Self {
            collection: Box::new(collection),
        }
    }

    /// Live record with the given id, if any. Tombstones are invisible here.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<T>, StoreError> {
        self.collection
            .find_one(&move |t: &T| !t.is_deleted() && t.id() == id)
            .await
    }

    /// Record with the given id regardless of tombstone state.
    ///
    /// Only the restore path needs this; everything else goes through the
    /// live view.
    pub async fn find_by_id_including_deleted(
        &self,
        id: Uuid,
    ) -> Result<Option<T>, StoreError> {
        self.collection.find_one(&move |t: &T| t.id() == id).await
    }

    /// First live record satisfying `pred`, in store order.
    pub async fn find_one(&self, pred: Filter<'_, T>) -> Result<Option<T>, StoreError> {
        self.collection
            .find_one(&move |t: &T| !t.is_deleted() && pred(t))
            .await
    }

    /// All live records, filtered if a predicate is given.
    pub async fn find_all(&self, pred: Option<Filter<'_, T>>) -> Result<Vec<T>, StoreError> {
        self.collection
            .find_many(
                &move |t: &T| !t.is_deleted() && pred.map_or(true, |p| p(t)),
                None,
                None,
            )
            .await
    }

    /// 1-indexed page. Non-positive page arguments yield an empty page,
    /// never an error.
    pub async fn page(
        &self,
        page_number: u64,
        page_size: u64,
        pred: Option<Filter<'_, T>>,
        include_deleted: bool,
    ) -> Result<Vec<T>, StoreError> {
        if page_number < 1 || page_size < 1 {
            return Ok(Vec::new());
        }
        // Caller-supplied values; an absurd page must come back empty, not wrap.
        let skip = (page_number - 1).saturating_mul(page_size);
        self.collection
            .find_many(
                &move |t: &T| {
                    (include_deleted || !t.is_deleted()) && pred.map_or(true, |p| p(t))
                },
                Some(skip),
                Some(page_size),
            )
            .await
    }

    /// Count of records matching `pred` under the chosen visibility.
    pub async fn count(
        &self,
        pred: Option<Filter<'_, T>>,
        include_deleted: bool,
    ) -> Result<u64, StoreError> {
        self.collection
            .count(&move |t: &T| {
                (include_deleted || !t.is_deleted()) && pred.map_or(true, |p| p(t))
            })
            .await
    }

    /// Page plus totals, both computed under the same visibility flag.
    pub async fn paged_list(
        &self,
        page_number: u64,
        page_size: u64,
        include_deleted: bool,
    ) -> Result<PagedList<T>, StoreError> {
        let items = self
            .page(page_number, page_size, None, include_deleted)
            .await?;
        let total = self.count(None, include_deleted).await?;
        Ok(PagedList::new(items, page_number, page_size, total))
    }

    /// True iff at least one live record matches.
    pub async fn exists(&self, pred: Filter<'_, T>) -> Result<bool, StoreError> {
        Ok(self.find_one(pred).await?.is_some())
    }

    /// Insert; the record is live immediately.
    pub async fn insert(&self, entity: T) -> Result<T, StoreError> {
        self.collection.insert_one(&entity).await?;
        Ok(entity)
    }

    /// Full-document replace of the record sharing the entity's id.
    pub async fn update(&self, entity: T) -> Result<T, StoreError> {
        let replaced = self.collection.replace_one(entity.id(), &entity).await?;
        if !replaced {
            return Err(StoreError::NotFound);
        }
        Ok(entity)
    }

    /// Idempotent tombstone. Stamps the modification audit fields; calling
    /// twice leaves the same observable state as calling once.
    pub async fn soft_delete(
        &self,
        mut entity: T,
        modifier: Option<Uuid>,
    ) -> Result<T, StoreError> {
        entity.meta_mut().is_deleted = true;
        entity.meta_mut().touch(modifier);
        self.update(entity).await
    }

    /// Clear a tombstone, returning the record to the live view.
    pub async fn restore(
        &self,
        mut entity: T,
        modifier: Option<Uuid>,
    ) -> Result<T, StoreError> {
        entity.meta_mut().is_deleted = false;
        entity.meta_mut().touch(modifier);
        self.update(entity).await
    }
}
