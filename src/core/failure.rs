//! Failure - Terminal error classifier
//!
//! Whatever goes wrong while serving a request ends up here as a [`Failure`]
//! and leaves as exactly one error envelope:
//!
//! ```json
//! { "success": false, "message": "...", "error": { "code": "...", "details": ... } }
//! ```

use super::error::{AppError, ErrorDetails, ErrorKind, FieldIssue};
use axum::{
    Json,
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::any::Any;
use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error::Error as StdError;
use tracing::{error, warn};
use validator::{ValidationErrors, ValidationErrorsKind};

lazy_static! {
    static ref FIELD_BEFORE_VERB: Regex =
        Regex::new(r"(?i)(?:property\s+)?(\w+)(?:\s+should|\s+must)").unwrap();
    static ref LEADING_WORD: Regex = Regex::new(r"^(\w+)\s").unwrap();
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: Cow<'static, str>,
    pub details: ErrorDetails,
}

#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub message: String,
    pub error: ErrorBody,
}

impl ErrorEnvelope {
    fn new(message: impl Into<String>, code: impl Into<Cow<'static, str>>, details: ErrorDetails) -> Self {
        Self {
            success: false,
            message: message.into(),
            error: ErrorBody {
                code: code.into(),
                details,
            },
        }
    }
}

/// Everything that can surface at the HTTP boundary.
#[derive(Debug)]
pub enum Failure {
    /// An [`AppError`] raised on purpose somewhere below.
    Typed(AppError),
    /// Field-level validation messages, in the order the fields were declared.
    Validation(Vec<String>),
    /// A rejection produced by the transport layer (bad JSON, bad query string, unknown route).
    Transport {
        status: StatusCode,
        message: String,
        code: Option<String>,
    },
    /// Anything else.
    Unexpected {
        error: Box<dyn StdError + Send + Sync>,
        backtrace: Backtrace,
    },
}

impl Failure {
    pub fn transport(status: StatusCode, message: impl Into<String>) -> Self {
        Self::Transport {
            status,
            message: message.into(),
            code: None,
        }
    }

    /// Transport failure that names its own code instead of `HTTP_EXCEPTION`.
    pub fn transport_with_code(
        status: StatusCode,
        message: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::Transport {
            status,
            message: message.into(),
            code: Some(code.into()),
        }
    }

    pub fn unexpected<E>(error: E) -> Self
    where
        E: Into<Box<dyn StdError + Send + Sync>>,
    {
        Self::Unexpected {
            error: error.into(),
            backtrace: Backtrace::force_capture(),
        }
    }

    /// Flattens validator output into one message per invalid field.
    ///
    /// `declared` is the field declaration order of the validated DTO; fields
    /// missing from it keep their relative order at the end.
    pub fn validation(errors: &ValidationErrors, declared: &[&str]) -> Self {
        let mut fields: Vec<(usize, String, String)> = errors
            .errors()
            .iter()
            .map(|(field, kind)| {
                let field = field.to_string();
                let message = match kind {
                    ValidationErrorsKind::Field(list) => list
                        .first()
                        .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                        .unwrap_or_else(|| format!("{field} is invalid")),
                    ValidationErrorsKind::Struct(_) | ValidationErrorsKind::List(_) => {
                        format!("{field} is invalid")
                    }
                };
                let rank = declared
                    .iter()
                    .position(|d| same_field(d, &field))
                    .unwrap_or(usize::MAX);
                (rank, field, message)
            })
            .collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));
        Self::Validation(fields.into_iter().map(|(_, _, message)| message).collect())
    }

    /// Decides the wire status and envelope. Total over every variant.
    pub fn classify(self) -> (StatusCode, ErrorEnvelope) {
        match self {
            Self::Typed(err) => {
                let (kind, message, code, details, source) = err.into_parts();
                if kind == ErrorKind::Internal {
                    match &source {
                        Some(source) => error!(
                            error = %source,
                            chain = ?source,
                            backtrace = %Backtrace::force_capture(),
                            "Internal error"
                        ),
                        None => error!(message = %message, "Internal error"),
                    }
                }
                (kind.status(), ErrorEnvelope::new(message, code, details))
            }
            Self::Validation(messages) => {
                warn!(count = messages.len(), "Validation failed");
                let details = ErrorDetails::Fields(format_validation_messages(&messages));
                (
                    StatusCode::BAD_REQUEST,
                    ErrorEnvelope::new("Validation failed", "VALIDATION_ERROR", details),
                )
            }
            Self::Transport {
                status,
                message,
                code,
            } => {
                warn!(status = %status, message = %message, "Request rejected");
                let code: Cow<'static, str> = match code {
                    Some(code) => Cow::Owned(code),
                    None => Cow::Borrowed("HTTP_EXCEPTION"),
                };
                let details = ErrorDetails::text(message.clone());
                (status, ErrorEnvelope::new(message, code, details))
            }
            Self::Unexpected { error, backtrace } => {
                error!(
                    error = %error,
                    chain = ?error,
                    backtrace = %backtrace,
                    "Unhandled exception"
                );
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorEnvelope::new(
                        "Internal server error",
                        "INTERNAL_SERVER_ERROR",
                        ErrorDetails::text("An unexpected error occurred"),
                    ),
                )
            }
        }
    }
}

/// `discount_price` and `discountPrice` name the same field.
fn same_field(declared: &str, reported: &str) -> bool {
    let squash = |s: &str| -> String {
        s.chars()
            .filter(|c| *c != '_')
            .flat_map(char::to_lowercase)
            .collect()
    };
    squash(declared) == squash(reported)
}

/// Pairs every message with the field it talks about, `"unknown"` when no field can be found.
pub fn format_validation_messages(messages: &[String]) -> Vec<FieldIssue> {
    messages
        .iter()
        .map(|message| {
            let field = FIELD_BEFORE_VERB
                .captures(message)
                .or_else(|| LEADING_WORD.captures(message))
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            FieldIssue {
                field,
                message: message.clone(),
            }
        })
        .collect()
}

impl From<AppError> for Failure {
    fn from(err: AppError) -> Self {
        Self::Typed(err)
    }
}

impl From<JsonRejection> for Failure {
    fn from(rejection: JsonRejection) -> Self {
        let status = rejection.status();
        if status == StatusCode::PAYLOAD_TOO_LARGE {
            return Self::transport_with_code(status, rejection.body_text(), "PAYLOAD_TOO_LARGE");
        }
        Self::transport(status, rejection.body_text())
    }
}

impl From<QueryRejection> for Failure {
    fn from(rejection: QueryRejection) -> Self {
        Self::transport(rejection.status(), rejection.body_text())
    }
}

impl From<PathRejection> for Failure {
    fn from(rejection: PathRejection) -> Self {
        Self::transport(rejection.status(), rejection.body_text())
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let (status, body) = self.classify();
        (status, Json(body)).into_response()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        Failure::Typed(self).into_response()
    }
}

/// Panic hook for `CatchPanicLayer`: a panicking handler still answers with an envelope.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    Failure::unexpected(message).into_response()
}
