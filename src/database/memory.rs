//! In-memory stores
//!
//! Dashmap-backed implementations of the store traits, used by the test suite
//! and by `STORE_BACKEND=memory` for local runs without PostgreSQL. The email
//! index entry is the uniqueness guard, mirroring the unique index in SQL.

use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::models::{AdminIdentity, NewAdmin, NewProduct, Product, ProductPatch, normalize_email};
use super::{AdminStore, ProductStore, StoreError, StoreResult};

#[derive(Debug, Default)]
pub struct MemoryAdminStore {
    admins: DashMap<Uuid, AdminIdentity>,
    by_email: DashMap<String, Uuid>,
}

impl MemoryAdminStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.admins.len()
    }
}

#[async_trait]
impl AdminStore for MemoryAdminStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>> {
        let Some(id) = self.by_email.get(&normalize_email(email)).map(|e| *e.value()) else {
            return Ok(None);
        };
        Ok(self.admins.get(&id).map(|a| a.value().clone()))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<AdminIdentity>> {
        Ok(self.admins.get(&id).map(|a| a.value().clone()))
    }

    async fn create(&self, admin: NewAdmin) -> StoreResult<AdminIdentity> {
        match self.by_email.entry(admin.email().to_string()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey),
            Entry::Vacant(slot) => {
                let now = Utc::now();
                let identity = AdminIdentity {
                    id: Uuid::new_v4(),
                    fullname: admin.fullname().to_string(),
                    email: admin.email().to_string(),
                    password_hash: admin.password_hash().to_string(),
                    phone: admin.phone().to_string(),
                    created_at: now,
                    updated_at: now,
                };
                self.admins.insert(identity.id, identity.clone());
                slot.insert(identity.id);
                Ok(identity)
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct MemoryProductStore {
    products: DashMap<Uuid, Product>,
}

impl MemoryProductStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.products.len()
    }
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        let now = Utc::now();
        let NewProduct {
            fields,
            product_image,
            product_image2,
            product_image3,
            product_image4,
        } = product;
        let stored = Product {
            id: Uuid::new_v4(),
            title: fields.title,
            price: fields.price,
            description: fields.description,
            category: fields.category,
            links: fields.links,
            product_image,
            product_image2,
            product_image3,
            product_image4,
            created_at: now,
            updated_at: now,
        };
        self.products.insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        let mut products: Vec<Product> = self.products.iter().map(|p| p.value().clone()).collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.products.get(&id).map(|p| p.value().clone()))
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        Ok(self.products.get_mut(&id).map(|mut entry| {
            let product = entry.value_mut();
            product.apply(&patch);
            product.updated_at = Utc::now();
            product.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.products.remove(&id).is_some())
    }
}
