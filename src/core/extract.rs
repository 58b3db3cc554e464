//! Extractors - Request extractors whose rejections are [`Failure`]s
//!
//! axum's stock extractors reject with plain-text bodies. These wrappers keep
//! the same parsing but hand every rejection to the error classifier, so a bad
//! body, query string or path segment still produces an error envelope.

use super::failure::Failure;
use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

/// Declaration order of a DTO's fields. Validation messages are reported in this order.
pub trait FieldOrder {
    const FIELD_ORDER: &'static [&'static str];
}

/// JSON body that has passed `validator` rules.
#[derive(Debug, Clone)]
pub struct ValidJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate + FieldOrder,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        value
            .validate()
            .map_err(|errors| Failure::validation(&errors, T::FIELD_ORDER))?;
        Ok(Self(value))
    }
}

/// Query string deserialized into `T`.
#[derive(Debug, Clone, Default)]
pub struct QueryParams<T>(pub T);

impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// The raw `{id}` path segment. Decoding is left to the repository so that a
/// malformed id surfaces as `INVALID_ID`.
#[derive(Debug, Clone)]
pub struct IdParam(pub String);

impl<S> FromRequestParts<S> for IdParam
where
    S: Send + Sync,
{
    type Rejection = Failure;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<String>::from_request_parts(parts, state).await?;
        Ok(Self(id))
    }
}
