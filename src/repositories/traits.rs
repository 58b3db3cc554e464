//! Common repository traits
//!
//! This module defines the two seams of the data-access layer:
//! [`Entity`], implemented by every persisted record type, and [`Store`],
//! implemented by every storage binding.

use super::filter::{Changes, FieldValue, Filter, Projection};
use super::id::RecordId;
use super::query::FindOptions;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::mysql::MySqlRow;

/// A persisted record type.
///
/// # Field names
/// All field names are the wire (camelCase) names. [`Entity::FIELDS`] maps each
/// persisted field to its column; minus [`Entity::PRIVATE`] it is the whitelist
/// checked before any query reaches storage.
pub trait Entity: Clone + Send + Sync + Unpin + 'static {
    /// Name used in messages, e.g. `"Product"`.
    const NAME: &'static str;

    /// Table backing the entity in SQL storage.
    const TABLE: &'static str;

    /// `(field, column)` pairs of every persisted field, `id` first.
    const FIELDS: &'static [(&'static str, &'static str)];

    /// Fields carrying a uniqueness constraint.
    const UNIQUE: &'static [&'static str];

    /// Persisted fields that may never be searched, sorted or filtered on.
    const PRIVATE: &'static [&'static str] = &[];

    /// Data required to build a new entity.
    type Create: Send + Sync;

    /// Builds a fresh entity with the storage identifier and timestamps assigned.
    fn build(id: RecordId, data: Self::Create, now: DateTime<Utc>) -> Self;

    fn id(&self) -> RecordId;

    /// Current value of every field, in [`Entity::FIELDS`] order.
    fn values(&self) -> Vec<(&'static str, FieldValue)>;

    /// Overwrites a single field. Fails with [`StoreError::FieldType`] when
    /// the value has the wrong shape for the field.
    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), StoreError>;

    /// Decodes a row selected with `SELECT *`.
    fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error>;

    /// Clears fields hidden by `projection`. Entities without hideable fields keep the default.
    fn project(&mut self, _projection: &Projection) {}

    fn value(&self, field: &str) -> Option<FieldValue> {
        self.values()
            .into_iter()
            .find(|(f, _)| *f == field)
            .map(|(_, v)| v)
    }

    fn column(field: &str) -> Option<&'static str> {
        Self::FIELDS
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, c)| *c)
    }

    /// Whether `field` may appear in a filter or sort.
    fn queryable(field: &str) -> bool {
        Self::column(field).is_some() && !Self::PRIVATE.contains(&field)
    }

    fn field_for_column(column: &str) -> Option<&'static str> {
        Self::FIELDS
            .iter()
            .find(|(_, c)| *c == column)
            .map(|(f, _)| *f)
    }
}

/// Uniqueness violation reported by a storage binding.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniqueViolation {
    pub field: Option<String>,
    pub value: Option<Value>,
}

/// Faults raised by storage bindings.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated on {:?}", .0.field)]
    UniqueViolation(UniqueViolation),

    #[error("unknown field `{0}`")]
    UnknownField(String),

    #[error("field `{field}` cannot hold {value:?}")]
    FieldType { field: String, value: FieldValue },

    #[error(transparent)]
    Backend(sqlx::Error),
}

/// Storage engine contract required by the generic repository.
///
/// Every call is an independent storage interaction; implementations keep no
/// per-request state.
#[async_trait]
pub trait Store<T: Entity>: Send + Sync {
    async fn insert(&self, entity: &T) -> Result<(), StoreError>;

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, StoreError>;

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<T>, StoreError>;

    /// Applies `changes` and returns the post-update entity, `None` if nothing matched.
    async fn update_by_id(&self, id: &RecordId, changes: &Changes)
    -> Result<Option<T>, StoreError>;

    /// Returns whether an entity was deleted.
    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError>;

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError>;

    async fn find_many(&self, filter: &Filter, options: &FindOptions)
    -> Result<Vec<T>, StoreError>;
}
