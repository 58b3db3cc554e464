//! Response - Success envelope builder
//!
//! Every successful handler returns a [`Reply`], which renders as
//!
//! ```json
//! { "success": true, "message": "...", "data": ..., "pagination": { ... } }
//! ```
//!
//! `pagination` is only present for paged results; it is never `null`.

use crate::repositories::{Listing, Page, Pagination, PaginationMeta};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

pub const DEFAULT_MESSAGE: &str = "Request successful";

#[derive(Debug, Serialize)]
pub struct SuccessEnvelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,
}

#[derive(Debug)]
pub struct Reply<T> {
    status: StatusCode,
    message: Option<String>,
    data: T,
    pagination: Option<Pagination>,
}

impl<T: Serialize> Reply<T> {
    /// Bare data; the envelope gets the default message.
    pub fn data(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            message: None,
            data,
            pagination: None,
        }
    }

    pub fn message(message: impl Into<String>, data: T) -> Self {
        Self {
            message: Some(message.into()),
            ..Self::data(data)
        }
    }

    /// `201 Created` with a message.
    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            ..Self::message(message, data)
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Builds the wire envelope.
    pub fn envelope(self) -> SuccessEnvelope<T> {
        SuccessEnvelope {
            success: true,
            message: self
                .message
                .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()),
            data: self.data,
            pagination: self.pagination.map(|p| p.meta()),
        }
    }
}

impl<T: Serialize> From<Page<T>> for Reply<Vec<T>> {
    fn from(page: Page<T>) -> Self {
        Self {
            status: StatusCode::OK,
            message: Some(page.message),
            data: page.data,
            pagination: Some(page.pagination),
        }
    }
}

impl<T: Serialize> From<Listing<T>> for Reply<Vec<T>> {
    fn from(listing: Listing<T>) -> Self {
        match listing {
            Listing::All(items) => Self::data(items),
            Listing::Page(page) => page.into(),
        }
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self.envelope())).into_response()
    }
}
