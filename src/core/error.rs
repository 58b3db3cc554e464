//! AppError - Typed error taxonomy shared by repositories, services and middleware
//!
//! Every failure raised on purpose inside the application is an [`AppError`]:
//! a closed [`ErrorKind`], a stable machine-readable code, a human message and
//! structured [`ErrorDetails`]. The kind alone decides the HTTP status.

use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;
use std::borrow::Cow;
use std::error::Error as StdError;

/// Closed set of failure categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    BadRequest,
    Unauthorized,
    Forbidden,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub const fn status(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Conflict => StatusCode::CONFLICT,
            Self::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Code used when the raiser does not name a more specific one.
    pub const fn default_code(self) -> &'static str {
        match self {
            Self::BadRequest => "BAD_REQUEST",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Forbidden => "FORBIDDEN",
            Self::NotFound => "NOT_FOUND",
            Self::Conflict => "CONFLICT",
            Self::Internal => "INTERNAL_SERVER_ERROR",
        }
    }
}

/// A single field-level validation message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub field: String,
    pub message: String,
}

/// Structured payload carried in `error.details` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ErrorDetails {
    Text(String),
    Resource {
        resource: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        id: Option<String>,
    },
    Field {
        field: String,
    },
    Duplicate {
        #[serde(skip_serializing_if = "Option::is_none")]
        field: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<Value>,
    },
    Fields(Vec<FieldIssue>),
}

impl ErrorDetails {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    pub fn resource(resource: impl Into<String>) -> Self {
        Self::Resource {
            resource: resource.into(),
            id: None,
        }
    }

    pub fn resource_with_id(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::Resource {
            resource: resource.into(),
            id: Some(id.into()),
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct AppError {
    kind: ErrorKind,
    message: String,
    code: Cow<'static, str>,
    details: ErrorDetails,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Builds an error whose code is the kind's default and whose details echo the message.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            kind,
            code: Cow::Borrowed(kind.default_code()),
            details: ErrorDetails::Text(message.clone()),
            message,
            source: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<Cow<'static, str>>) -> Self {
        self.code = code.into();
        self
    }

    pub fn with_details(mut self, details: ErrorDetails) -> Self {
        self.details = details;
        self
    }

    // Common error constructors
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::BadRequest, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Forbidden, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Wraps an unexpected fault. The caller only ever sees a generic message;
    /// the source is kept for the boundary log.
    pub fn internal<E>(source: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut err = Self::new(ErrorKind::Internal, "Internal server error")
            .with_details(ErrorDetails::text("An unexpected error occurred"));
        err.source = Some(Box::new(source));
        err
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.kind.status()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn details(&self) -> &ErrorDetails {
        &self.details
    }

    pub(crate) fn into_parts(
        self,
    ) -> (
        ErrorKind,
        String,
        Cow<'static, str>,
        ErrorDetails,
        Option<Box<dyn StdError + Send + Sync>>,
    ) {
        (self.kind, self.message, self.code, self.details, self.source)
    }
}

impl From<bcrypt::BcryptError> for AppError {
    fn from(err: bcrypt::BcryptError) -> Self {
        Self::internal(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kind_maps_to_status_deterministically() {
        assert_eq!(ErrorKind::BadRequest.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorKind::Unauthorized.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorKind::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(ErrorKind::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(ErrorKind::Conflict.status(), StatusCode::CONFLICT);
        assert_eq!(
            ErrorKind::Internal.status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn details_default_to_the_message() {
        let err = AppError::bad_request("Invalid id").with_code("INVALID_ID");
        assert_eq!(err.code(), "INVALID_ID");
        assert_eq!(err.details(), &ErrorDetails::text("Invalid id"));
    }

    #[test]
    fn internal_errors_hide_their_source() {
        let io = std::io::Error::other("disk on fire");
        let err = AppError::internal(io);
        assert_eq!(err.message(), "Internal server error");
        assert_eq!(err.code(), "INTERNAL_SERVER_ERROR");
        assert!(StdError::source(&err).is_some());
    }

    #[test]
    fn details_serialize_without_tags() {
        let resource = ErrorDetails::resource_with_id("Product", "abc");
        assert_eq!(
            serde_json::to_value(&resource).unwrap(),
            json!({ "resource": "Product", "id": "abc" })
        );

        let duplicate = ErrorDetails::Duplicate {
            field: None,
            value: None,
        };
        assert_eq!(serde_json::to_value(&duplicate).unwrap(), json!({}));
    }
}
