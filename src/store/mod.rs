//! Persistence Core
//! Mission: Generic soft-delete document storage over a single SQLite file

pub mod collection;
pub mod entity;
pub mod error;
pub mod paging;
pub mod soft_delete;

pub use collection::{Collection, Filter, SqliteCollection};
pub use entity::{Entity, EntityMeta};
pub use error::StoreError;
pub use paging::PagedList;
pub use soft_delete::SoftDeleteStore;
