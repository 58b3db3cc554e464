#![allow(dead_code)]

use async_trait::async_trait;
use axum::http::HeaderName;
use axum_test::{TestRequest, TestServer};
use catalog_api::core::{AppState, Config, encode_jwt};
use catalog_api::entities::{NewProduct, NewUser, Product, ProductType, Role, User};
use catalog_api::repositories::{
    Changes, Entity, Filter, FindOptions, MemoryStore, RecordId, Repository, Store, StoreError,
};
use serde_json::Value;
use std::sync::Arc;

pub const TEST_SECRET: &str = "ilmiobellissimosegretochevaassolutamentecambiato";
pub const TEST_PASSWORD: &str = "Password123";

/// Crea un AppState in memoria per i test
///
/// bcrypt al costo minimo per non rallentare la suite.
pub fn create_test_state() -> Arc<AppState> {
    Arc::new(AppState::in_memory(Config {
        jwt_secret: TEST_SECRET.to_string(),
        bcrypt_cost: 4,
        ..Config::default()
    }))
}

/// Store che fallisce ogni chiamata come un database irraggiungibile
pub struct UnavailableStore;

fn pool_timeout() -> StoreError {
    StoreError::Backend(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl<T: Entity> Store<T> for UnavailableStore {
    async fn insert(&self, _entity: &T) -> Result<(), StoreError> {
        Err(pool_timeout())
    }

    async fn find_one(&self, _filter: &Filter) -> Result<Option<T>, StoreError> {
        Err(pool_timeout())
    }

    async fn find_by_id(&self, _id: &RecordId) -> Result<Option<T>, StoreError> {
        Err(pool_timeout())
    }

    async fn update_by_id(&self, _id: &RecordId, _changes: &Changes) -> Result<Option<T>, StoreError> {
        Err(pool_timeout())
    }

    async fn delete_by_id(&self, _id: &RecordId) -> Result<bool, StoreError> {
        Err(pool_timeout())
    }

    async fn count(&self, _filter: &Filter) -> Result<u64, StoreError> {
        Err(pool_timeout())
    }

    async fn find_many(&self, _filter: &Filter, _options: &FindOptions) -> Result<Vec<T>, StoreError> {
        Err(pool_timeout())
    }
}

/// AppState il cui storage utenti non risponde
pub fn create_unavailable_users_state() -> Arc<AppState> {
    Arc::new(AppState {
        users: Repository::new(Arc::new(UnavailableStore)),
        products: Repository::new(Arc::new(MemoryStore::<Product>::new())),
        config: Config {
            jwt_secret: TEST_SECRET.to_string(),
            bcrypt_cost: 4,
            ..Config::default()
        },
    })
}

/// Crea un TestServer sul router completo
pub fn create_test_server(state: Arc<AppState>) -> TestServer {
    let app = catalog_api::create_router(state);
    TestServer::new(app).expect("Failed to create test server")
}

/// Genera un JWT token valido per `user`
pub fn create_test_jwt(user: &User) -> String {
    encode_jwt(user, TEST_SECRET, 24).expect("Failed to create JWT token")
}

/// Aggiunge l'header `Authorization: Bearer <token>` alla richiesta
pub fn bearer(request: TestRequest, token: &str) -> TestRequest {
    request.add_header(
        HeaderName::from_static("authorization"),
        format!("Bearer {}", token),
    )
}

pub async fn seed_user_with_role(state: &AppState, email: &str, role: Role) -> User {
    let password = User::hash_password(TEST_PASSWORD, 4).expect("hash");
    state
        .users
        .create(NewUser {
            email: email.to_string(),
            name: email.split('@').next().unwrap_or("user").to_string(),
            password,
            role,
        })
        .await
        .expect("Failed to seed user")
}

pub async fn seed_user(state: &AppState, email: &str) -> User {
    seed_user_with_role(state, email, Role::User).await
}

pub async fn seed_admin(state: &AppState, email: &str) -> User {
    seed_user_with_role(state, email, Role::Admin).await
}

pub fn new_product(sku: &str, product_type: ProductType) -> NewProduct {
    NewProduct {
        sku: sku.to_string(),
        name: format!("Product {}", sku),
        description: None,
        category: "Peripherals".to_string(),
        product_type,
        price: 50.0,
        discount_price: None,
        quantity: 5,
    }
}

pub async fn seed_product(state: &AppState, data: NewProduct) -> Product {
    state
        .products
        .create(data)
        .await
        .expect("Failed to seed product")
}

/// `error.code` dell'envelope di errore
pub fn error_code(body: &Value) -> &str {
    body["error"]["code"].as_str().unwrap_or_default()
}
