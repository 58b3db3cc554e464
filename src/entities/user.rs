//! User entity - Account record with password hashing helpers

use super::{decode_id, decode_parsed, expect_int, expect_parsed, expect_text, expect_timestamp};
use crate::entities::Role;
use crate::repositories::{Entity, FieldValue, Projection, RecordId, StoreError};
use bcrypt::{hash, verify};
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::Row;
use sqlx::mysql::MySqlRow;

#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: RecordId,
    pub email: String,
    pub name: String,
    /// bcrypt hash; never leaves the process.
    #[serde(skip_serializing)]
    pub password: String,
    pub role: Role,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Data for a new user. `password` must already be hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub password: String,
    pub role: Role,
}

impl User {
    /// Verify if target_password matches the stored hashed password
    pub fn verify_password(&self, target_password: &str) -> bool {
        verify(target_password, &self.password).unwrap_or(false)
    }

    /// Hash a password using bcrypt with the given cost
    pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
        hash(password, cost)
    }

    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }
}

impl Entity for User {
    const NAME: &'static str = "User";
    const TABLE: &'static str = "users";
    const FIELDS: &'static [(&'static str, &'static str)] = &[
        ("id", "id"),
        ("email", "email"),
        ("name", "name"),
        ("password", "password"),
        ("role", "role"),
        ("credits", "credits"),
        ("createdAt", "created_at"),
        ("updatedAt", "updated_at"),
    ];
    const UNIQUE: &'static [&'static str] = &["email"];
    const PRIVATE: &'static [&'static str] = &["password"];

    type Create = NewUser;

    fn build(id: RecordId, data: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id,
            email: Self::normalize_email(&data.email),
            name: data.name.trim().to_string(),
            password: data.password,
            role: data.role,
            credits: 0,
            created_at: now,
            updated_at: now,
        }
    }

    fn id(&self) -> RecordId {
        self.id
    }

    fn values(&self) -> Vec<(&'static str, FieldValue)> {
        vec![
            ("id", self.id.into()),
            ("email", self.email.clone().into()),
            ("name", self.name.clone().into()),
            ("password", self.password.clone().into()),
            ("role", self.role.as_str().into()),
            ("credits", self.credits.into()),
            ("createdAt", self.created_at.into()),
            ("updatedAt", self.updated_at.into()),
        ]
    }

    fn assign(&mut self, field: &str, value: FieldValue) -> Result<(), StoreError> {
        match field {
            "email" => self.email = Self::normalize_email(&expect_text(field, value)?),
            "name" => self.name = expect_text(field, value)?.trim().to_string(),
            "password" => self.password = expect_text(field, value)?,
            "role" => self.role = expect_parsed(field, value)?,
            "credits" => self.credits = expect_int(field, value)?,
            "createdAt" => self.created_at = expect_timestamp(field, value)?,
            "updatedAt" => self.updated_at = expect_timestamp(field, value)?,
            other => return Err(StoreError::UnknownField(other.to_string())),
        }
        Ok(())
    }

    fn from_row(row: &MySqlRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: decode_id(row)?,
            email: row.try_get("email")?,
            name: row.try_get("name")?,
            password: row.try_get("password")?,
            role: decode_parsed(row, "role")?,
            credits: row.try_get("credits")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn project(&mut self, projection: &Projection) {
        if projection.hides("password") {
            self.password.clear();
        }
    }
}
