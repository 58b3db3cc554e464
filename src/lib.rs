//! Catalog API library - espone i moduli principali per i test

pub mod core;
pub mod dtos;
pub mod entities;
pub mod repositories;
pub mod services;

// Re-export dei tipi principali per facilitare l'import
pub use core::{AppError, AppState, Config, auth, config};
pub use services::root;

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, patch, post},
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

/// Crea il router principale dell'applicazione
pub fn create_router(state: Arc<AppState>) -> Router {
    use services::{method_not_allowed, not_found};

    let api = Router::new()
        .nest("/auth", configure_auth_routes())
        .nest("/users", configure_user_routes(state.clone()))
        .nest("/products", configure_product_routes(state.clone()));

    Router::new()
        .route("/", get(root))
        .nest(&api_base(&state.config.global_prefix), api)
        .fallback(not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(CatchPanicLayer::custom(core::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(configure_cors(&state.config.cors_origins))
        .with_state(state)
}

/// `/{prefix}/v1`, or `/v1` when the prefix is empty.
fn api_base(prefix: &str) -> String {
    if prefix.is_empty() {
        "/v1".to_string()
    } else {
        format!("/{}/v1", prefix)
    }
}

fn configure_cors(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([header::AUTHORIZATION])
        .allow_credentials(true)
}

/// Configura le routes di autenticazione (register, login, logout)
fn configure_auth_routes() -> Router<Arc<AppState>> {
    use services::*;
    Router::new()
        .route("/register", post(register_user))
        .route("/login", post(login_user))
        .route("/logout", post(logout_user))
}

/// Configura le routes per la gestione degli utenti
fn configure_user_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/me", get(get_me).patch(update_me))
        .route("/me/password", patch(change_password))
        .route(
            "/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}

/// Configura le routes del catalogo prodotti
fn configure_product_routes(state: Arc<AppState>) -> Router<Arc<AppState>> {
    use core::authentication_middleware;
    use services::*;

    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/stats", get(product_stats))
        .route(
            "/{id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route_layer(middleware::from_fn_with_state(
            state,
            authentication_middleware,
        ))
}
