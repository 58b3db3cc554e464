//! RecordId - Native key type and identifier codec

use crate::core::{AppError, ErrorDetails};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Storage-assigned identifier of every entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(Uuid);

impl RecordId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// Anything an operation may receive as an identifier: raw text from the
/// outside world or an already decoded [`RecordId`].
pub trait ToRecordId: fmt::Display {
    fn to_record_id(&self) -> Result<RecordId, AppError>;
}

impl ToRecordId for RecordId {
    fn to_record_id(&self) -> Result<RecordId, AppError> {
        Ok(*self)
    }
}

impl ToRecordId for str {
    fn to_record_id(&self) -> Result<RecordId, AppError> {
        to_id(self)
    }
}

impl ToRecordId for String {
    fn to_record_id(&self) -> Result<RecordId, AppError> {
        to_id(self)
    }
}

/// Decodes an externally supplied identifier, failing with `INVALID_ID`.
pub fn to_id(raw: &str) -> Result<RecordId, AppError> {
    raw.parse().map_err(|_| {
        AppError::bad_request("Invalid id")
            .with_code("INVALID_ID")
            .with_details(ErrorDetails::text("Invalid id"))
    })
}
