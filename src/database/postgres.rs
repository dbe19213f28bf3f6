//! PostgreSQL-backed stores
//!
//! Admin and product persistence on top of the shared deadpool pool.

use anyhow::Context;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::error::SqlState;
use uuid::Uuid;

use super::models::{AdminIdentity, FromRow, NewAdmin, NewProduct, Product, ProductPatch, normalize_email};
use super::{AdminStore, ProductStore, StoreError, StoreResult};

const ADMIN_COLUMNS: &str = "id, fullname, email, password_hash, phone, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, title, price, description, category, links, \
     product_image, product_image2, product_image3, product_image4, created_at, updated_at";

/// Map driver errors, surfacing constraint violations as their own kinds
fn map_pg_error(e: tokio_postgres::Error, action: &'static str) -> StoreError {
    match e.code() {
        Some(code) if *code == SqlState::UNIQUE_VIOLATION => StoreError::DuplicateKey,
        Some(code) if *code == SqlState::CHECK_VIOLATION => {
            StoreError::Validation(e.as_db_error().map(|db| db.message().to_string()).unwrap_or_default())
        }
        _ => StoreError::Backend(anyhow::Error::new(e).context(action)),
    }
}

async fn client(pool: &Pool) -> StoreResult<deadpool_postgres::Object> {
    Ok(pool.get().await.context("Failed to get DB connection")?)
}

#[derive(Clone)]
pub struct PgAdminStore {
    pool: Pool,
}

impl PgAdminStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AdminStore for PgAdminStore {
    async fn find_by_email(&self, email: &str) -> StoreResult<Option<AdminIdentity>> {
        let client = client(&self.pool).await?;
        let row = client
            .query_opt(
                &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE email = $1"),
                &[&normalize_email(email)],
            )
            .await
            .map_err(|e| map_pg_error(e, "Failed to query admin by email"))?;
        row.map(|r| AdminIdentity::from_row(&r))
            .transpose()
            .map_err(|e| map_pg_error(e, "Failed to decode admin row"))
    }

    async fn find_by_id(&self, id: Uuid) -> StoreResult<Option<AdminIdentity>> {
        let client = client(&self.pool).await?;
        let row = client
            .query_opt(
                &format!("SELECT {ADMIN_COLUMNS} FROM admins WHERE id = $1"),
                &[&id],
            )
            .await
            .map_err(|e| map_pg_error(e, "Failed to query admin by id"))?;
        row.map(|r| AdminIdentity::from_row(&r))
            .transpose()
            .map_err(|e| map_pg_error(e, "Failed to decode admin row"))
    }

    async fn create(&self, admin: NewAdmin) -> StoreResult<AdminIdentity> {
        let client = client(&self.pool).await?;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO admins (id, fullname, email, password_hash, phone) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING {ADMIN_COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &admin.fullname(),
                    &admin.email(),
                    &admin.password_hash(),
                    &admin.phone(),
                ],
            )
            .await
            .map_err(|e| map_pg_error(e, "Failed to insert admin"))?;
        AdminIdentity::from_row(&row).map_err(|e| map_pg_error(e, "Failed to decode admin row"))
    }
}

#[derive(Clone)]
pub struct PgProductStore {
    pool: Pool,
}

impl PgProductStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductStore for PgProductStore {
    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        let client = client(&self.pool).await?;
        let fields = &product.fields;
        let row = client
            .query_one(
                &format!(
                    "INSERT INTO products (id, title, price, description, category, links, \
                     product_image, product_image2, product_image3, product_image4) \
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {PRODUCT_COLUMNS}"
                ),
                &[
                    &Uuid::new_v4(),
                    &fields.title,
                    &fields.price,
                    &fields.description,
                    &fields.category.as_str(),
                    &fields.links,
                    &product.product_image,
                    &product.product_image2,
                    &product.product_image3,
                    &product.product_image4,
                ],
            )
            .await
            .map_err(|e| map_pg_error(e, "Failed to insert product"))?;
        Product::from_row(&row).map_err(|e| map_pg_error(e, "Failed to decode product row"))
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        let client = client(&self.pool).await?;
        let rows = client
            .query(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC"),
                &[],
            )
            .await
            .map_err(|e| map_pg_error(e, "Failed to list products"))?;
        rows.iter()
            .map(Product::from_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| map_pg_error(e, "Failed to decode product row"))
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let client = client(&self.pool).await?;
        let row = client
            .query_opt(
                &format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"),
                &[&id],
            )
            .await
            .map_err(|e| map_pg_error(e, "Failed to query product"))?;
        row.map(|r| Product::from_row(&r))
            .transpose()
            .map_err(|e| map_pg_error(e, "Failed to decode product row"))
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        let client = client(&self.pool).await?;
        let [image1, image2, image3, image4] = &patch.images;
        // `links` needs a separate flag: NULL means "clear" only when the caller sent it.
        let (set_links, links) = match &patch.links {
            Some(links) => (true, links.clone()),
            None => (false, None),
        };
        let row = client
            .query_opt(
                &format!(
                    "UPDATE products SET \
                        title = COALESCE($2, title), \
                        price = COALESCE($3, price), \
                        description = COALESCE($4, description), \
                        category = COALESCE($5, category), \
                        links = CASE WHEN $6 THEN $7 ELSE links END, \
                        product_image = COALESCE($8, product_image), \
                        product_image2 = COALESCE($9, product_image2), \
                        product_image3 = COALESCE($10, product_image3), \
                        product_image4 = COALESCE($11, product_image4), \
                        updated_at = NOW() \
                     WHERE id = $1 RETURNING {PRODUCT_COLUMNS}"
                ),
                &[
                    &id,
                    &patch.title,
                    &patch.price,
                    &patch.description,
                    &patch.category.map(|c| c.as_str()),
                    &set_links,
                    &links,
                    image1,
                    image2,
                    image3,
                    image4,
                ],
            )
            .await
            .map_err(|e| map_pg_error(e, "Failed to update product"))?;
        row.map(|r| Product::from_row(&r))
            .transpose()
            .map_err(|e| map_pg_error(e, "Failed to decode product row"))
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        let client = client(&self.pool).await?;
        let n = client
            .execute("DELETE FROM products WHERE id = $1", &[&id])
            .await
            .map_err(|e| map_pg_error(e, "Failed to delete product"))?;
        Ok(n > 0)
    }
}
