//! Services module - Coordinatore per tutti i service handler HTTP
//!
//! Ogni sotto-modulo gestisce gli endpoint HTTP di una risorsa.

pub mod admin;
pub mod auth;
pub mod product;
pub mod user;

pub use admin::ensure_admin;
pub use auth::{login_user, logout_user, register_user};
pub use product::{
    create_product, delete_product, get_product, list_products, product_stats, update_product,
};
pub use user::{
    change_password, create_user, delete_user, get_me, get_user, list_users, update_me,
    update_user,
};

use crate::core::{Failure, Reply};
use axum::http::{Method, StatusCode, Uri};
use serde::Serialize;

#[derive(Serialize, Debug)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// Root endpoint - health check
pub async fn root() -> Reply<Health> {
    Reply::message(
        "Server is running!",
        Health {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        },
    )
}

/// Fallback for paths no route matches.
pub async fn not_found(method: Method, uri: Uri) -> Failure {
    Failure::transport(
        StatusCode::NOT_FOUND,
        format!("Cannot {} {}", method, uri.path()),
    )
}

/// Fallback for known paths hit with an unsupported method.
pub async fn method_not_allowed(method: Method, uri: Uri) -> Failure {
    Failure::transport(
        StatusCode::METHOD_NOT_ALLOWED,
        format!("Cannot {} {}", method, uri.path()),
    )
}
