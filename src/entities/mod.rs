//! Entities module - Domain records persisted by the repositories
//!
//! Each entity corresponds to a table and implements [`Entity`], which tells
//! the generic repository how to build, read and patch it.

pub mod enums;
pub mod product;
pub mod user;

pub use enums::{ProductType, Role};
pub use product::{NewProduct, Product};
pub use user::{NewUser, User};

use crate::repositories::{FieldValue, RecordId, StoreError};
use chrono::{DateTime, Utc};
use sqlx::Row;
use sqlx::mysql::MySqlRow;
use std::str::FromStr;

// Typed accessors shared by the `Entity::assign` implementations.

fn type_error(field: &str, value: FieldValue) -> StoreError {
    StoreError::FieldType {
        field: field.to_string(),
        value,
    }
}

pub(crate) fn expect_text(field: &str, value: FieldValue) -> Result<String, StoreError> {
    match value {
        FieldValue::Text(s) => Ok(s),
        other => Err(type_error(field, other)),
    }
}

pub(crate) fn expect_opt_text(field: &str, value: FieldValue) -> Result<Option<String>, StoreError> {
    match value {
        FieldValue::Null => Ok(None),
        other => expect_text(field, other).map(Some),
    }
}

pub(crate) fn expect_int(field: &str, value: FieldValue) -> Result<i64, StoreError> {
    match value {
        FieldValue::Int(i) => Ok(i),
        FieldValue::Float(f) if f.fract() == 0.0 => Ok(f as i64),
        other => Err(type_error(field, other)),
    }
}

pub(crate) fn expect_float(field: &str, value: FieldValue) -> Result<f64, StoreError> {
    match value.as_f64() {
        Some(f) => Ok(f),
        None => Err(type_error(field, value)),
    }
}

pub(crate) fn expect_opt_float(field: &str, value: FieldValue) -> Result<Option<f64>, StoreError> {
    match value {
        FieldValue::Null => Ok(None),
        other => expect_float(field, other).map(Some),
    }
}

pub(crate) fn expect_timestamp(field: &str, value: FieldValue) -> Result<DateTime<Utc>, StoreError> {
    match value {
        FieldValue::Timestamp(ts) => Ok(ts),
        other => Err(type_error(field, other)),
    }
}

pub(crate) fn expect_parsed<E: FromStr>(field: &str, value: FieldValue) -> Result<E, StoreError> {
    let text = expect_text(field, value)?;
    text.parse()
        .map_err(|_| type_error(field, FieldValue::Text(text)))
}

/// Decodes a text column through `FromStr`.
pub(crate) fn decode_parsed<E>(row: &MySqlRow, column: &str) -> Result<E, sqlx::Error>
where
    E: FromStr,
    E::Err: std::fmt::Display,
{
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|e: E::Err| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: e.to_string().into(),
    })
}

pub(crate) fn decode_id(row: &MySqlRow) -> Result<RecordId, sqlx::Error> {
    let raw: String = row.try_get("id")?;
    raw.parse().map_err(|e: uuid::Error| sqlx::Error::ColumnDecode {
        index: "id".to_string(),
        source: Box::new(e),
    })
}
