//! MySQL storage binding
//!
//! Statements are assembled with `sqlx::QueryBuilder`; every value is bound,
//! only whitelisted column names are ever spliced into SQL text.

use super::filter::{Changes, Condition, FieldValue, Filter};
use super::id::RecordId;
use super::query::{FindOptions, SortOrder};
use super::traits::{Entity, Store, StoreError, UniqueViolation};
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;
use sqlx::{MySql, MySqlPool, QueryBuilder};
use std::marker::PhantomData;
use tracing::{debug, error};

lazy_static! {
    /// `Duplicate entry 'value' for key 'table.uq_table_column'`
    static ref DUPLICATE_ENTRY: Regex =
        Regex::new(r"Duplicate entry '(.*)' for key '(?:\w+\.)?(\w+)'").unwrap();
}

pub struct MySqlStore<T: Entity> {
    connection_pool: MySqlPool,
    _entity: PhantomData<fn() -> T>,
}

impl<T: Entity> MySqlStore<T> {
    pub fn new(connection_pool: MySqlPool) -> Self {
        Self {
            connection_pool,
            _entity: PhantomData,
        }
    }
}

fn column<T: Entity>(field: &str) -> Result<&'static str, StoreError> {
    T::column(field).ok_or_else(|| StoreError::UnknownField(field.to_string()))
}

fn push_value(builder: &mut QueryBuilder<'_, MySql>, value: &FieldValue) {
    match value {
        FieldValue::Null => builder.push("NULL"),
        FieldValue::Bool(b) => builder.push_bind(*b),
        FieldValue::Int(i) => builder.push_bind(*i),
        FieldValue::Float(f) => builder.push_bind(*f),
        FieldValue::Text(s) => builder.push_bind(s.clone()),
        FieldValue::Id(id) => builder.push_bind(id.to_string()),
        FieldValue::Timestamp(ts) => builder.push_bind(*ts),
    };
}

/// Escapes `LIKE` metacharacters so the term matches literally.
pub(crate) fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends ` WHERE ...` for a non-empty filter.
fn push_filter<T: Entity>(
    builder: &mut QueryBuilder<'_, MySql>,
    filter: &Filter,
) -> Result<(), StoreError> {
    for (i, condition) in filter.conditions().iter().enumerate() {
        builder.push(if i == 0 { " WHERE " } else { " AND " });
        match condition {
            Condition::Eq { field, value } if value.is_null() => {
                builder.push(column::<T>(field)?).push(" IS NULL");
            }
            Condition::Eq { field, value } => {
                builder.push(column::<T>(field)?).push(" = ");
                push_value(builder, value);
            }
            Condition::Search { fields, term } => {
                let pattern = format!("%{}%", escape_like(&term.to_lowercase()));
                builder.push("(");
                for (j, field) in fields.iter().enumerate() {
                    if j > 0 {
                        builder.push(" OR ");
                    }
                    builder
                        .push("LOWER(")
                        .push(column::<T>(field)?)
                        .push(") LIKE ")
                        .push_bind(pattern.clone());
                }
                builder.push(")");
            }
            Condition::Range { field, min, max } => {
                let col = column::<T>(field)?;
                builder.push("(1 = 1");
                if let Some(min) = min {
                    builder.push(" AND ").push(col).push(" >= ").push_bind(*min);
                }
                if let Some(max) = max {
                    builder.push(" AND ").push(col).push(" <= ").push_bind(*max);
                }
                builder.push(")");
            }
        }
    }
    Ok(())
}

/// Extracts the offending field and value from a MySQL duplicate-key message.
pub(crate) fn parse_duplicate_entry<T: Entity>(message: &str) -> UniqueViolation {
    let Some(caps) = DUPLICATE_ENTRY.captures(message) else {
        return UniqueViolation::default();
    };
    let value = caps.get(1).map(|m| Value::String(m.as_str().to_string()));
    let key = caps.get(2).map_or("", |m| m.as_str());
    let prefix = format!("uq_{}_", T::TABLE);
    let field = key
        .strip_prefix(&prefix)
        .and_then(T::field_for_column)
        .or_else(|| T::field_for_column(key))
        .map(str::to_string);
    UniqueViolation { field, value }
}

fn store_error<T: Entity>(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return StoreError::UniqueViolation(parse_duplicate_entry::<T>(db.message()));
        }
    }
    error!(table = T::TABLE, "Database error: {}", err);
    StoreError::Backend(err)
}

impl<T: Entity> MySqlStore<T> {
    async fn fetch_optional(
        &self,
        mut builder: QueryBuilder<'_, MySql>,
    ) -> Result<Option<T>, StoreError> {
        let row = builder
            .build()
            .fetch_optional(&self.connection_pool)
            .await
            .map_err(store_error::<T>)?;
        row.as_ref()
            .map(T::from_row)
            .transpose()
            .map_err(StoreError::Backend)
    }
}

#[async_trait]
impl<T: Entity> Store<T> for MySqlStore<T> {
    async fn insert(&self, entity: &T) -> Result<(), StoreError> {
        let values = entity.values();
        let mut builder = QueryBuilder::<MySql>::new(format!("INSERT INTO {} (", T::TABLE));
        {
            let mut columns = builder.separated(", ");
            for (field, _) in &values {
                columns.push(column::<T>(field)?);
            }
        }
        builder.push(") VALUES (");
        for (i, (_, value)) in values.iter().enumerate() {
            if i > 0 {
                builder.push(", ");
            }
            push_value(&mut builder, value);
        }
        builder.push(")");

        builder
            .build()
            .execute(&self.connection_pool)
            .await
            .map_err(store_error::<T>)?;
        debug!(table = T::TABLE, id = %entity.id(), "Row inserted");
        Ok(())
    }

    async fn find_one(&self, filter: &Filter) -> Result<Option<T>, StoreError> {
        let mut builder = QueryBuilder::<MySql>::new(format!("SELECT * FROM {}", T::TABLE));
        push_filter::<T>(&mut builder, filter)?;
        builder.push(" LIMIT 1");
        self.fetch_optional(builder).await
    }

    async fn find_by_id(&self, id: &RecordId) -> Result<Option<T>, StoreError> {
        let mut builder =
            QueryBuilder::<MySql>::new(format!("SELECT * FROM {} WHERE id = ", T::TABLE));
        builder.push_bind(id.to_string());
        self.fetch_optional(builder).await
    }

    async fn update_by_id(
        &self,
        id: &RecordId,
        changes: &Changes,
    ) -> Result<Option<T>, StoreError> {
        if !changes.is_empty() {
            let mut builder = QueryBuilder::<MySql>::new(format!("UPDATE {} SET ", T::TABLE));
            for (i, (field, value)) in changes.iter().enumerate() {
                if i > 0 {
                    builder.push(", ");
                }
                builder.push(column::<T>(field)?).push(" = ");
                push_value(&mut builder, value);
            }
            builder.push(" WHERE id = ").push_bind(id.to_string());

            let result = builder
                .build()
                .execute(&self.connection_pool)
                .await
                .map_err(store_error::<T>)?;
            debug!(table = T::TABLE, rows = result.rows_affected(), "Row updated");
        }
        // rows_affected is 0 for a no-op update, so existence is decided by the re-read
        self.find_by_id(id).await
    }

    async fn delete_by_id(&self, id: &RecordId) -> Result<bool, StoreError> {
        let mut builder = QueryBuilder::<MySql>::new(format!("DELETE FROM {} WHERE id = ", T::TABLE));
        builder.push_bind(id.to_string());
        let result = builder
            .build()
            .execute(&self.connection_pool)
            .await
            .map_err(store_error::<T>)?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, filter: &Filter) -> Result<u64, StoreError> {
        let mut builder = QueryBuilder::<MySql>::new(format!("SELECT COUNT(*) FROM {}", T::TABLE));
        push_filter::<T>(&mut builder, filter)?;
        let count: i64 = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.connection_pool)
            .await
            .map_err(store_error::<T>)?;
        Ok(count.max(0) as u64)
    }

    async fn find_many(
        &self,
        filter: &Filter,
        options: &FindOptions,
    ) -> Result<Vec<T>, StoreError> {
        let mut builder = QueryBuilder::<MySql>::new(format!("SELECT * FROM {}", T::TABLE));
        push_filter::<T>(&mut builder, filter)?;

        if let Some((field, order)) = &options.sort {
            let direction = match order {
                SortOrder::Asc => " ASC",
                SortOrder::Desc => " DESC",
            };
            builder
                .push(" ORDER BY ")
                .push(column::<T>(field)?)
                .push(direction)
                .push(", id");
        }
        if let Some(limit) = options.limit {
            builder.push(" LIMIT ").push_bind(limit);
            builder.push(" OFFSET ").push_bind(options.skip);
        } else if options.skip > 0 {
            builder
                .push(" LIMIT 18446744073709551615 OFFSET ")
                .push_bind(options.skip);
        }

        let rows = builder
            .build()
            .fetch_all(&self.connection_pool)
            .await
            .map_err(store_error::<T>)?;
        rows.iter()
            .map(T::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(StoreError::Backend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{Product, User};
    use serde_json::json;

    #[test]
    fn duplicate_entry_names_field_and_value() {
        let violation = parse_duplicate_entry::<Product>(
            "Duplicate entry 'KB-001' for key 'products.uq_products_sku'",
        );
        assert_eq!(violation.field.as_deref(), Some("sku"));
        assert_eq!(violation.value, Some(json!("KB-001")));

        let violation = parse_duplicate_entry::<User>(
            "Duplicate entry 'a@b.io' for key 'uq_users_email'",
        );
        assert_eq!(violation.field.as_deref(), Some("email"));
    }

    #[test]
    fn unrecognised_messages_yield_an_anonymous_violation() {
        let violation = parse_duplicate_entry::<Product>("Duplicate entry 'x' for key 'PRIMARY'");
        assert_eq!(violation.field, None);
        assert_eq!(violation.value, Some(json!("x")));

        assert_eq!(
            parse_duplicate_entry::<Product>("something else"),
            UniqueViolation::default()
        );
    }

    #[test]
    fn like_metacharacters_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn filters_render_bound_placeholders() {
        let filter = Filter::new()
            .eq("type", "public")
            .eq("description", FieldValue::Null)
            .search(["name", "sku"], "kb")
            .range("price", Some(1.0), None);
        let mut builder = QueryBuilder::<MySql>::new("SELECT * FROM products");
        push_filter::<Product>(&mut builder, &filter).unwrap();
        assert_eq!(
            builder.sql(),
            "SELECT * FROM products WHERE type = ? AND description IS NULL \
             AND (LOWER(name) LIKE ? OR LOWER(sku) LIKE ?) AND (1 = 1 AND price >= ?)"
        );
    }

    #[test]
    fn unknown_filter_fields_never_reach_sql() {
        let mut builder = QueryBuilder::<MySql>::new("SELECT * FROM products");
        let err = push_filter::<Product>(&mut builder, &Filter::new().eq("password", "x")).unwrap_err();
        assert!(matches!(err, StoreError::UnknownField(f) if f == "password"));
    }
}
