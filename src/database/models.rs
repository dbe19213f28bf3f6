// Database Models
//
// Admin identities and catalog products, plus the validated inputs the stores
// accept. Validation lives on the input types so both store backends enforce
// the same rules.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tokio_postgres::Row;
use tokio_postgres::types::{FromSql, Type, accepts};
use uuid::Uuid;

use crate::auth::password;
use crate::config::MAX_IMAGES_PER_PRODUCT;

/// Trait for converting from tokio-postgres Row
pub trait FromRow {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> where Self: Sized;
}

/// Input rejected before it reaches a store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn new(msg: impl Into<String>) -> Self {
        Self(msg.into())
    }
}

// ============================================================================
// ADMIN MODELS
// ============================================================================

/// Stored admin account
#[derive(Debug, Clone)]
pub struct AdminIdentity {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub phone: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for AdminIdentity {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            fullname: row.try_get("fullname")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            phone: row.try_get("phone")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl AdminIdentity {
    /// Check a candidate password against the stored hash
    pub async fn verify_password(&self, candidate: &str) -> bool {
        password::verify(candidate, &self.password_hash).await
    }

    /// Public view of the account, never carrying the hash
    pub fn summary(&self) -> AdminSummary {
        AdminSummary {
            id: self.id,
            fullname: self.fullname.clone(),
            email: self.email.clone(),
            number: self.phone.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const MIN_PASSWORD_LEN: usize = 6;

/// Trim and lower-case an email so lookups and the unique index agree
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// A registration that has been validated and had its password hashed
#[derive(Debug, Clone)]
pub struct NewAdmin {
    fullname: String,
    email: String,
    password_hash: String,
    phone: String,
}

impl NewAdmin {
    /// Validate the registration fields and hash the plaintext password.
    ///
    /// This is the only place a password hash is produced.
    pub async fn new(
        fullname: &str,
        email: &str,
        plaintext_password: &str,
        phone: &str,
    ) -> Result<Self, NewAdminError> {
        let fullname = fullname.trim();
        let email = normalize_email(email);
        let phone = phone.trim();

        if fullname.is_empty() || email.is_empty() || phone.is_empty() || plaintext_password.is_empty() {
            return Err(ValidationError::new("All fields are required").into());
        }
        if plaintext_password.chars().count() < MIN_PASSWORD_LEN {
            return Err(ValidationError::new(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            ))
            .into());
        }

        let password_hash = password::hash(plaintext_password).await?;

        Ok(Self {
            fullname: fullname.to_string(),
            email,
            password_hash,
            phone: phone.to_string(),
        })
    }

    pub fn fullname(&self) -> &str {
        &self.fullname
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password_hash(&self) -> &str {
        &self.password_hash
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }
}

#[derive(Debug, thiserror::Error)]
pub enum NewAdminError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Password(#[from] password::PasswordError),
}

// ============================================================================
// PRODUCT MODELS
// ============================================================================

/// Closed set of catalog categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Men,
    Women,
    Children,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Men, Category::Women, Category::Children];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Men => "Men",
            Category::Women => "Women",
            Category::Children => "Children",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == s.trim())
            .ok_or_else(|| ValidationError::new("Category must be one of Men, Women, Children"))
    }
}

impl<'a> FromSql<'a> for Category {
    fn from_sql(ty: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn std::error::Error + Sync + Send>> {
        let value = <&str as FromSql>::from_sql(ty, raw)?;
        Ok(value.parse::<Category>()?)
    }

    accepts!(TEXT, VARCHAR);
}

/// Catalog entry as stored and returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub category: Category,
    pub links: Option<String>,
    pub product_image: String,
    pub product_image2: Option<String>,
    pub product_image3: Option<String>,
    pub product_image4: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FromRow for Product {
    fn from_row(row: &Row) -> Result<Self, tokio_postgres::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            price: row.try_get("price")?,
            description: row.try_get("description")?,
            category: row.try_get("category")?,
            links: row.try_get("links")?,
            product_image: row.try_get("product_image")?,
            product_image2: row.try_get("product_image2")?,
            product_image3: row.try_get("product_image3")?,
            product_image4: row.try_get("product_image4")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl Product {
    /// Every populated image slot, in slot order
    pub fn image_urls(&self) -> Vec<&str> {
        std::iter::once(Some(self.product_image.as_str()))
            .chain([
                self.product_image2.as_deref(),
                self.product_image3.as_deref(),
                self.product_image4.as_deref(),
            ])
            .flatten()
            .collect()
    }

    /// Apply a validated patch; omitted fields keep their current value
    pub fn apply(&mut self, patch: &ProductPatch) {
        if let Some(title) = &patch.title {
            self.title = title.clone();
        }
        if let Some(price) = patch.price {
            self.price = price;
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(links) = &patch.links {
            self.links = links.clone();
        }
        let [first, second, third, fourth] = &patch.images;
        if let Some(url) = first {
            self.product_image = url.clone();
        }
        if let Some(url) = second {
            self.product_image2 = Some(url.clone());
        }
        if let Some(url) = third {
            self.product_image3 = Some(url.clone());
        }
        if let Some(url) = fourth {
            self.product_image4 = Some(url.clone());
        }
    }
}

fn required_text(value: Option<&str>, field: &str) -> Result<String, ValidationError> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ValidationError::new(format!("{field} is required"))),
    }
}

fn parse_price(raw: &str) -> Result<Decimal, ValidationError> {
    let price = Decimal::from_str(raw.trim())
        .or_else(|_| Decimal::from_scientific(raw.trim()))
        .map_err(|_| ValidationError::new("Price must be a number"))?;
    if price.is_sign_negative() && !price.is_zero() {
        return Err(ValidationError::new("Price cannot be negative"));
    }
    Ok(price)
}

/// JSON clients send the price either as a number or as a string
fn price_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum TextOrNumber {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<TextOrNumber>::deserialize(deserializer)?.map(|price| match price {
        TextOrNumber::Text(text) => text,
        TextOrNumber::Number(number) => number.to_string(),
    }))
}

fn optional_links(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}

/// Raw product text fields as they arrive from a form or a JSON body
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductDraft {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "price_text")]
    pub price: Option<String>,
    pub description: Option<String>,
    pub links: Option<String>,
    pub category: Option<String>,
}

/// Text fields of a new product that passed validation; images come later
#[derive(Debug, Clone, PartialEq)]
pub struct ProductFields {
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub category: Category,
    pub links: Option<String>,
}

impl ProductDraft {
    /// Validate every field a new product needs
    pub fn validate(&self) -> Result<ProductFields, ValidationError> {
        let title = required_text(self.title.as_deref(), "Title")?;
        let price = parse_price(&required_text(self.price.as_deref(), "Price")?)?;
        let description = required_text(self.description.as_deref(), "Description")?;
        let category = required_text(self.category.as_deref(), "Category")?.parse::<Category>()?;

        Ok(ProductFields {
            title,
            price,
            description,
            category,
            links: optional_links(self.links.as_deref()),
        })
    }

    /// Validate only the fields that were supplied, for a partial update
    pub fn validate_patch(&self) -> Result<ProductPatch, ValidationError> {
        fn non_blank(value: Option<&str>, field: &str) -> Result<Option<String>, ValidationError> {
            value.map(|v| required_text(Some(v), field)).transpose()
        }

        Ok(ProductPatch {
            title: non_blank(self.title.as_deref(), "Title")?,
            price: self.price.as_deref().map(parse_price).transpose()?,
            description: non_blank(self.description.as_deref(), "Description")?,
            category: self.category.as_deref().map(str::parse::<Category>).transpose()?,
            // An explicitly empty `links` clears it.
            links: self.links.as_deref().map(|raw| optional_links(Some(raw))),
            images: Default::default(),
        })
    }
}

impl ProductFields {
    /// Attach relayed image URLs, filling slots in order
    pub fn with_images(self, urls: Vec<String>) -> Result<NewProduct, ValidationError> {
        if urls.len() > MAX_IMAGES_PER_PRODUCT {
            return Err(ValidationError::new(format!(
                "At most {MAX_IMAGES_PER_PRODUCT} images are allowed"
            )));
        }
        let mut urls = urls.into_iter();
        let primary = urls
            .next()
            .ok_or_else(|| ValidationError::new("At least one image is required"))?;

        Ok(NewProduct {
            fields: self,
            product_image: primary,
            product_image2: urls.next(),
            product_image3: urls.next(),
            product_image4: urls.next(),
        })
    }
}

/// A complete, validated product ready to be stored
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub fields: ProductFields,
    pub product_image: String,
    pub product_image2: Option<String>,
    pub product_image3: Option<String>,
    pub product_image4: Option<String>,
}

/// Partial update. `None` leaves the stored value alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductPatch {
    pub title: Option<String>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub category: Option<Category>,
    pub links: Option<Option<String>>,
    pub images: [Option<String>; MAX_IMAGES_PER_PRODUCT],
}

impl ProductPatch {
    /// Place freshly relayed URLs into slots `0..urls.len()`
    pub fn set_images(&mut self, urls: Vec<String>) -> Result<(), ValidationError> {
        if urls.len() > MAX_IMAGES_PER_PRODUCT {
            return Err(ValidationError::new(format!(
                "At most {MAX_IMAGES_PER_PRODUCT} images are allowed"
            )));
        }
        for (slot, url) in self.images.iter_mut().zip(urls) {
            *slot = Some(url);
        }
        Ok(())
    }
}
