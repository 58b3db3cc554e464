//! Application State - Shared state of the application
//!
//! Holds one repository per resource plus the configuration. Both storage
//! bindings produce the same state shape.

use crate::core::Config;
use crate::entities::{Product, User};
use crate::repositories::{MemoryStore, MySqlStore, Repository};
use sqlx::MySqlPool;
use std::sync::Arc;

/// Global state shared by every route and middleware
pub struct AppState {
    pub users: Repository<User>,
    pub products: Repository<Product>,
    pub config: Config,
}

impl AppState {
    /// Builds the state over a MySQL connection pool.
    pub fn new(pool: MySqlPool, config: Config) -> Self {
        Self {
            users: Repository::new(Arc::new(MySqlStore::<User>::new(pool.clone()))),
            products: Repository::new(Arc::new(MySqlStore::<Product>::new(pool))),
            config,
        }
    }

    /// Builds the state over in-process storage.
    pub fn in_memory(config: Config) -> Self {
        Self {
            users: Repository::new(Arc::new(MemoryStore::<User>::new())),
            products: Repository::new(Arc::new(MemoryStore::<Product>::new())),
            config,
        }
    }
}
