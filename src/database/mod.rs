//! # Database Module
//!
//! Persistence for admin identities and catalog products. Handlers only see the
//! [`AdminStore`] and [`ProductStore`] traits; PostgreSQL (tokio-postgres over
//! deadpool) backs them in production and a dashmap store backs them in tests.

pub mod connection;
pub mod memory;
pub mod migrations;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

pub use connection::{DatabaseConfig, DatabaseConnection};
pub use models::*;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("duplicate key")]
    DuplicateKey,
    /// A check constraint rejected the write
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Admin credential persistence
#[async_trait]
pub trait AdminStore: Send + Sync {
    /// Look up an admin by email; the email is normalized first
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>>;

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<AdminIdentity>>;

    /// Persist a new admin, failing with [`StoreError::DuplicateKey`] if the
    /// email is taken
    async fn create(&self, admin: NewAdmin) -> StoreResult<AdminIdentity>;
}

/// Product catalog persistence
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn create(&self, product: NewProduct) -> StoreResult<Product>;

    /// Every product, newest first
    async fn list(&self) -> StoreResult<Vec<Product>>;

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>>;

    /// Apply a partial update; `None` when no such product exists
    async fn update(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>>;

    /// Remove a product, reporting whether anything was removed
    async fn delete(&self, id: Uuid) -> StoreResult<bool>;
}
