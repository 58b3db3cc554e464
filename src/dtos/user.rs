//! User DTOs - Data Transfer Objects for users and authentication

use crate::core::FieldOrder;
use crate::entities::{Role, User};
use crate::repositories::{Changes, RecordId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

// struct per gestire io col client
#[derive(Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDTO {
    pub id: RecordId,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub credits: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserDTO {
    fn from(value: User) -> Self {
        // la password non esce mai verso il client
        Self {
            id: value.id,
            email: value.email,
            name: value.name,
            role: value.role,
            credits: value.credits,
            created_at: value.created_at,
            updated_at: value.updated_at,
        }
    }
}

/// Public self-registration; the role is always `user`.
#[derive(Deserialize, Debug, Clone, Validate)]
pub struct RegisterDTO {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 2, max = 50, message = "name must be between 2 and 50 characters"))]
    pub name: String,

    #[validate(length(min = 8, max = 128, message = "password must be between 8 and 128 characters"))]
    pub password: String,
}

impl FieldOrder for RegisterDTO {
    const FIELD_ORDER: &'static [&'static str] = &["email", "name", "password"];
}

/// Admin-side creation with an explicit role.
#[derive(Deserialize, Debug, Clone, Validate)]
pub struct CreateUserDTO {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 2, max = 50, message = "name must be between 2 and 50 characters"))]
    pub name: String,

    #[validate(length(min = 8, max = 128, message = "password must be between 8 and 128 characters"))]
    pub password: String,

    #[serde(default)]
    pub role: Option<Role>,
}

impl FieldOrder for CreateUserDTO {
    const FIELD_ORDER: &'static [&'static str] = &["email", "name", "password", "role"];
}

#[derive(Deserialize, Debug, Clone, Validate)]
pub struct LoginDTO {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "password should not be empty"))]
    pub password: String,
}

impl FieldOrder for LoginDTO {
    const FIELD_ORDER: &'static [&'static str] = &["email", "password"];
}

/// Admin update; every field optional.
#[derive(Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateUserDTO {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 2, max = 50, message = "name must be between 2 and 50 characters"))]
    pub name: Option<String>,

    #[validate(length(min = 8, max = 128, message = "password must be between 8 and 128 characters"))]
    pub password: Option<String>,

    pub role: Option<Role>,

    #[validate(range(min = 0, message = "credits must be >= 0"))]
    pub credits: Option<i64>,
}

impl FieldOrder for UpdateUserDTO {
    const FIELD_ORDER: &'static [&'static str] = &["email", "name", "password", "role", "credits"];
}

impl UpdateUserDTO {
    /// Changeset for everything but the password, which needs hashing first.
    pub fn changes(&self) -> Changes {
        Changes::new()
            .set_some("email", self.email.clone())
            .set_some("name", self.name.clone())
            .set_some("role", self.role.map(|r| r.as_str()))
            .set_some("credits", self.credits)
    }
}

/// Self-service profile update.
#[derive(Deserialize, Debug, Clone, Default, Validate)]
pub struct UpdateProfileDTO {
    #[validate(email(message = "email must be a valid email address"))]
    pub email: Option<String>,

    #[validate(length(min = 2, max = 50, message = "name must be between 2 and 50 characters"))]
    pub name: Option<String>,
}

impl FieldOrder for UpdateProfileDTO {
    const FIELD_ORDER: &'static [&'static str] = &["email", "name"];
}

impl UpdateProfileDTO {
    pub fn changes(&self) -> Changes {
        Changes::new()
            .set_some("email", self.email.clone())
            .set_some("name", self.name.clone())
    }
}

#[derive(Deserialize, Debug, Clone, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordDTO {
    #[validate(length(min = 1, message = "oldPassword should not be empty"))]
    pub old_password: String,

    #[validate(length(min = 8, max = 128, message = "password must be between 8 and 128 characters"))]
    pub password: String,

    #[validate(length(min = 1, message = "confirmPassword should not be empty"))]
    pub confirm_password: String,
}

impl FieldOrder for UpdatePasswordDTO {
    const FIELD_ORDER: &'static [&'static str] = &["old_password", "password", "confirm_password"];
}

#[derive(Serialize, Debug)]
pub struct AuthResponseDTO {
    pub token: String,
    pub user: UserDTO,
}
