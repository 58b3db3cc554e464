//! Repository - Generic data access shared by every resource
//!
//! Persistence operations and their failure semantics live here once. A
//! resource only provides an [`Entity`] implementation and a [`Store`]
//! binding; storage faults are translated into [`AppError`]s in this file and
//! nowhere else.

use super::filter::{Changes, Filter, Projection};
use super::id::{RecordId, ToRecordId};
use super::pagination::{Listing, Page, Pagination};
use super::query::{FindOptions, QuerySpec, build_query, ensure_known_fields};
use super::traits::{Entity, Store, StoreError, UniqueViolation};
use crate::core::{AppError, ErrorDetails};
use chrono::Utc;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

pub struct Repository<T: Entity> {
    store: Arc<dyn Store<T>>,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _entity: PhantomData,
        }
    }
}

impl<T: Entity> Repository<T> {
    pub fn new(store: Arc<dyn Store<T>>) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    /// Inserts a new entity. Uniqueness violations become `DUPLICATE_<FIELD>` conflicts.
    #[instrument(skip(self, data), fields(entity = T::NAME))]
    pub async fn create(&self, data: T::Create) -> Result<T, AppError> {
        let entity = T::build(RecordId::new(), data, Utc::now());
        debug!(id = %entity.id(), "Creating entity");
        self.store
            .insert(&entity)
            .await
            .map_err(|e| translate::<T>(e))?;
        info!(id = %entity.id(), "Entity created");
        Ok(entity)
    }

    /// First match or `None`; absence is not an error here.
    #[instrument(skip(self, filter, projection), fields(entity = T::NAME))]
    pub async fn find_one(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<Option<T>, AppError> {
        ensure_known_fields::<T>(filter)?;
        let found = self
            .store
            .find_one(filter)
            .await
            .map_err(|e| translate::<T>(e))?;
        Ok(found.map(|entity| project(entity, projection)))
    }

    /// Like [`Repository::find_one`] but absence is `NOT_FOUND`.
    pub async fn find_one_or_fail(
        &self,
        filter: &Filter,
        projection: Option<&Projection>,
    ) -> Result<T, AppError> {
        self.find_one(filter, projection).await?.ok_or_else(|| {
            warn!(entity = T::NAME, "No entity matches filter");
            AppError::not_found(format!("{} not found", T::NAME))
                .with_details(ErrorDetails::resource(T::NAME))
        })
    }

    #[instrument(skip(self, id, projection), fields(entity = T::NAME, id = %id))]
    pub async fn find_by_id<I>(&self, id: &I, projection: Option<&Projection>) -> Result<T, AppError>
    where
        I: ToRecordId + ?Sized,
    {
        let record_id = id.to_record_id()?;
        let found = self
            .store
            .find_by_id(&record_id)
            .await
            .map_err(|e| translate::<T>(e))?;
        match found {
            Some(entity) => Ok(project(entity, projection)),
            None => {
                warn!("Entity not found");
                Err(not_found_by_id::<T>(id))
            }
        }
    }

    /// Without a spec, the raw matching set. With one, a page: the count and
    /// the bounded fetch run concurrently and both must succeed.
    #[instrument(skip(self, filter, projection, spec), fields(entity = T::NAME))]
    pub async fn list(
        &self,
        filter: Filter,
        projection: Option<&Projection>,
        spec: Option<&QuerySpec>,
    ) -> Result<Listing<T>, AppError> {
        let Some(spec) = spec else {
            ensure_known_fields::<T>(&filter)?;
            let items = self
                .store
                .find_many(&filter, &FindOptions::default())
                .await
                .map_err(|e| translate::<T>(e))?;
            debug!(count = items.len(), "Listed entities");
            return Ok(Listing::All(
                items.into_iter().map(|e| project(e, projection)).collect(),
            ));
        };

        let (query, options) = build_query::<T>(filter, spec)?;
        let (items, count) = futures::try_join!(
            self.store.find_many(&query, &options),
            self.store.count(&query)
        )
        .map_err(|e| translate::<T>(e))?;

        debug!(count, page = spec.page(), limit = spec.limit(), "Listed page");
        Ok(Listing::Page(Page {
            message: format!("{}s retrieved successfully", T::NAME),
            data: items.into_iter().map(|e| project(e, projection)).collect(),
            pagination: Pagination::new(count, spec.page(), spec.limit()),
        }))
    }

    pub async fn count(&self, filter: &Filter) -> Result<u64, AppError> {
        ensure_known_fields::<T>(filter)?;
        self.store.count(filter).await.map_err(|e| translate::<T>(e))
    }

    /// Applies a partial update and returns the post-update entity.
    #[instrument(skip(self, id, changes, projection), fields(entity = T::NAME, id = %id))]
    pub async fn update<I>(
        &self,
        id: &I,
        changes: Changes,
        projection: Option<&Projection>,
    ) -> Result<T, AppError>
    where
        I: ToRecordId + ?Sized,
    {
        let record_id = id.to_record_id()?;
        let changes = changes.set("updatedAt", Utc::now());
        for (field, _) in changes.iter() {
            if T::column(field).is_none() {
                return Err(translate::<T>(StoreError::UnknownField(field.to_string())));
            }
        }

        let updated = self
            .store
            .update_by_id(&record_id, &changes)
            .await
            .map_err(|e| translate::<T>(e))?;
        match updated {
            Some(entity) => {
                info!("Entity updated");
                Ok(project(entity, projection))
            }
            None => {
                warn!("Entity to update not found");
                Err(not_found_by_id::<T>(id))
            }
        }
    }

    /// Deletes by id. A second removal of the same id is `NOT_FOUND`.
    #[instrument(skip(self, id), fields(entity = T::NAME, id = %id))]
    pub async fn remove<I>(&self, id: &I) -> Result<bool, AppError>
    where
        I: ToRecordId + ?Sized,
    {
        let record_id = id.to_record_id()?;
        let deleted = self
            .store
            .delete_by_id(&record_id)
            .await
            .map_err(|e| translate::<T>(e))?;
        if !deleted {
            warn!("Entity to delete not found");
            return Err(not_found_by_id::<T>(id));
        }
        info!("Entity deleted");
        Ok(true)
    }
}

fn project<T: Entity>(mut entity: T, projection: Option<&Projection>) -> T {
    if let Some(projection) = projection {
        entity.project(projection);
    }
    entity
}

fn not_found_by_id<T: Entity>(id: &(impl ToRecordId + ?Sized)) -> AppError {
    AppError::not_found(format!("{} with this id not found", T::NAME))
        .with_details(ErrorDetails::resource_with_id(T::NAME, id.to_string()))
}

/// The single translation point from storage faults to typed errors.
fn translate<T: Entity>(err: StoreError) -> AppError {
    match err {
        StoreError::UniqueViolation(violation) => duplicate::<T>(violation),
        StoreError::UnknownField(field) => {
            AppError::bad_request(format!("Unknown field '{field}' for {}", T::NAME))
                .with_code("INVALID_QUERY_FIELD")
                .with_details(ErrorDetails::Field { field })
        }
        other => AppError::internal(other),
    }
}

/// Conflict for a uniqueness violation: `DUPLICATE_<FIELD>` when the field is
/// known, `DUPLICATE_RECORD` otherwise.
pub fn duplicate<T: Entity>(violation: UniqueViolation) -> AppError {
    let UniqueViolation { field, value } = violation;
    let (message, code) = match &field {
        Some(field) => (
            format!("{} with this {field} already exists", T::NAME),
            format!("DUPLICATE_{}", field.to_uppercase()),
        ),
        None => (
            format!("{} already exists", T::NAME),
            "DUPLICATE_RECORD".to_string(),
        ),
    };
    warn!(entity = T::NAME, code = %code, "Uniqueness violation");
    AppError::conflict(message)
        .with_code(code)
        .with_details(ErrorDetails::Duplicate { field, value })
}
