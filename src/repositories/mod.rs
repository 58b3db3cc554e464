//! Repositories module - Generic data access for every resource
//!
//! A single [`Repository`] holds the persistence semantics: identifier
//! decoding, not-found and duplicate translation, paging. Resources plug in
//! through the [`Entity`] trait; storage engines through the [`Store`] trait.
//!
//! Two storage bindings ship with the crate:
//! - [`MySqlStore`] builds parameterized statements with `sqlx::QueryBuilder`
//! - [`MemoryStore`] keeps records in process, used without a database and in tests

pub mod filter;
pub mod id;
pub mod memory;
pub mod mysql;
pub mod pagination;
pub mod query;
pub mod repository;
pub mod traits;

pub use filter::{Changes, Condition, FieldValue, Filter, Projection};
pub use id::{RecordId, ToRecordId, to_id};
pub use memory::MemoryStore;
pub use mysql::MySqlStore;
pub use pagination::{Listing, Page, Pagination, PaginationMeta};
pub use query::{FilterBy, FindOptions, QuerySpec, SortOrder, build_query};
pub use repository::Repository;
pub use traits::{Entity, Store, StoreError, UniqueViolation};
