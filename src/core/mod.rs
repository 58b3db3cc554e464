//! Core Module - Infrastructure components of the application
//!
//! - Authentication and JWT
//! - Configuration
//! - Typed errors and the boundary error classifier
//! - Success envelope and request extractors
//! - Application state

pub mod auth;
pub mod config;
pub mod error;
pub mod extract;
pub mod failure;
pub mod response;
pub mod state;

pub use auth::{Claims, authentication_middleware, decode_jwt, encode_jwt, require_role};
pub use config::{Config, ConfigError};
pub use error::{AppError, ErrorDetails, ErrorKind, FieldIssue};
pub use extract::{FieldOrder, IdParam, QueryParams, ValidJson};
pub use failure::{ErrorEnvelope, Failure, panic_response};
pub use response::{Reply, SuccessEnvelope};
pub use state::AppState;
