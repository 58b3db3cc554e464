//! In-memory storage binding
//!
//! Keeps entities in insertion order behind an async `RwLock`. Used when no
//! database is configured and by the test suite. Uniqueness is enforced on
//! every field listed in [`Entity::UNIQUE`].

use super::filter::{Changes, Filter};
use super::id::RecordId;
use super::query::{FindOptions, SortOrder};
use super::traits::{Entity, Store, StoreError, UniqueViolation};
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

pub struct MemoryStore<T: Entity> {
    records: RwLock<Vec<T>>,
}

impl<T: Entity> Default for MemoryStore<T> {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
        }
    }
}

impl<T: Entity> MemoryStore<T> {
    pub fn new() -> Self {
        Self::default()
    }
}

/// First unique field on which `candidate` collides with another record.
fn find_collision<T: Entity>(records: &[T], candidate: &T) -> Option<UniqueViolation> {
    let candidate_id = candidate.id();
    T::UNIQUE.iter().find_map(|field| {
        let value = candidate.value(field).filter(|v| !v.is_null())?;
        records
            .iter()
            .filter(|r| r.id() != candidate_id)
            .any(|r| r.value(field).is_some_and(|v| v.matches(&value)))
            .then(|| UniqueViolation {
                field: Some(field.to_string()),
                value: Some(value.to_json()),
            })
    })
}

fn matching<'a, T: Entity>(records: &'a [T], filter: &'a Filter) -> impl Iterator<Item = &'a T> {
    records
        .iter()
        .filter(move |record| filter.test(|field| record.value(field)))
}

fn check_fields<T: Entity>(filter: &Filter) -> Result<(), StoreError> {
    match filter
        .conditions()
        .iter()
        .flat_map(|c| c.fields())
        .find(|f| !T::queryable(f))
    {
        Some(field) => Err(StoreError::UnknownField(field.to_string())),
        None => Ok(()),
    }
}

#[async_trait]
impl<T: Entity> Store<T> for MemoryStore<T> {
    async fn insert(&self, entity: &T) -> Result<(), StoreError> {
        let mut records = self.records.write().await;
        if let Some(violation) = find_collision(&records, entity) {
            return Err(StoreError::UniqueViolation(violation));
        }
        records.push(entity.clone());
        debug!(table = T::TABLE, total = records.len(), "Record inserted");
        Ok(())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        check_fields::<T>(filter)?;
        let records = self.records.read().await;
        Ok(matching(&records, filter).next().cloned())
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<T>, StoreError> {
        let records = self.records.read().await;
        Ok(records.iter().find(|r| r.id() == *id).cloned())
    }

    async fn update_by_id(
        &self,
        id: &RecordId,
        changes: &Changes,
    ) -> Result<Option<T>, StoreError> {
        let mut records = self.records.write().await;
        let Some(position) = records.iter().position(|r| r.id() == *id) else {
            return Ok(None);
        };

        let mut updated = records[position].clone();
        for (field, value) in changes.iter() {
            updated.assign(field, value.clone())?;
        }
        if let Some(violation) = find_collision(&records, &updated) {
            return Err(StoreError::UniqueViolation(violation));
        }

        records[position] = updated.clone();
        Ok(Some(updated))
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError> {
        let mut records = self.records.write().await;
        let before = records.len();
        records.retain(|r| r.id() != *id);
        Ok(records.len() < before)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        check_fields::<T>(filter)?;
        let records = self.records.read().await;
        Ok(matching(&records, filter).count() as u64)
    }

    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<T>, StoreError> {
        check_fields::<T>(filter)?;
        let records = self.records.read().await;
        let mut found: Vec<T> = matching(&records, filter).cloned().collect();

        if let Some((field, order)) = &options.sort {
            if !T::queryable(field) {
                return Err(StoreError::UnknownField(field.clone()));
            }
            // Stable sort, so ties keep insertion order.
            found.sort_by(|a, b| {
                let ordering = match (a.value(field), b.value(field)) {
                    (Some(x), Some(y)) => x.compare(&y),
                    _ => std::cmp::Ordering::Equal,
                };
                match order {
                    SortOrder::Asc => ordering,
                    SortOrder::Desc => ordering.reverse(),
                }
            });
        }

        let limit = options.limit.map_or(usize::MAX, |l| l as usize);
        Ok(found
            .into_iter()
            .skip(usize::try_from(options.skip).unwrap_or(usize::MAX))
            .take(limit)
            .collect())
    }
}
