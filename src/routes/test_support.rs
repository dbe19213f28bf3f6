//! Router test harness: in-memory stores, a scripted image host and a private
//! staging directory per test.

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tower::ServiceExt;
use uuid::Uuid;

use crate::auth::jwt::JwtService;
use crate::config::UploadConfig;
use crate::database::memory::{MemoryAdminStore, MemoryProductStore};
use crate::database::{NewProduct, Product, ProductPatch, ProductStore, StoreError, StoreResult};
use crate::server::{AppState, build_router};
use crate::services::ImageRelay;
use crate::services::image_relay::testing::FakeImageHost;

const BOUNDARY: &str = "----watchg-test-boundary";

/// In-memory catalog whose writes can be made to fail on demand
#[derive(Default)]
pub struct FaultyProductStore {
    inner: Arc<MemoryProductStore>,
    fail_writes: AtomicBool,
    lose_updates: AtomicBool,
}

impl FaultyProductStore {
    /// Every following `create` and `update` fails with a backend error
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    /// Every following `update` behaves as if the row was deleted meanwhile
    pub fn lose_updates(&self) {
        self.lose_updates.store(true, Ordering::SeqCst);
    }

    fn write_guard(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("catalog unavailable")));
        }
        Ok(())
    }
}

#[async_trait]
impl ProductStore for FaultyProductStore {
    async fn create(&self, product: NewProduct) -> StoreResult<Product> {
        self.write_guard()?;
        self.inner.create(product).await
    }

    async fn list(&self) -> StoreResult<Vec<Product>> {
        self.inner.list().await
    }

    async fn get_by_id(&self, id: Uuid) -> StoreResult<Option<Product>> {
        self.inner.get_by_id(id).await
    }

    async fn update(&self, id: Uuid, patch: ProductPatch) -> StoreResult<Option<Product>> {
        self.write_guard()?;
        if self.lose_updates.load(Ordering::SeqCst) {
            return Ok(None);
        }
        self.inner.update(id, patch).await
    }

    async fn delete(&self, id: Uuid) -> StoreResult<bool> {
        self.inner.delete(id).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub admins: Arc<MemoryAdminStore>,
    /// Backing store of `catalog`, for seeding and inspection
    pub products: Arc<MemoryProductStore>,
    pub catalog: Arc<FaultyProductStore>,
    pub host: Arc<FakeImageHost>,
    pub jwt_service: Arc<JwtService>,
    pub upload_dir: PathBuf,
}

impl TestApp {
    pub fn new() -> Self {
        let upload_dir = std::env::temp_dir().join(format!("watchg-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&upload_dir).unwrap();

        let admins = Arc::new(MemoryAdminStore::new());
        let products = Arc::new(MemoryProductStore::new());
        let catalog = Arc::new(FaultyProductStore {
            inner: products.clone(),
            ..Default::default()
        });
        let host = Arc::new(FakeImageHost::new());
        let jwt_service = Arc::new(JwtService::new("test_secret"));

        let state = AppState {
            admins: admins.clone(),
            products: catalog.clone(),
            jwt_service: jwt_service.clone(),
            relay: ImageRelay::new(host.clone()),
            uploads: Arc::new(UploadConfig {
                dir: upload_dir.clone(),
                max_image_bytes: 64 * 1024,
            }),
            cookie_secure: true,
        };
        let router = build_router(state, "http://localhost:3000", &upload_dir.join("public")).unwrap();

        Self { router, admins, products, catalog, host, jwt_service, upload_dir }
    }

    /// Files still sitting in the staging directory
    pub fn staged_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(&self.upload_dir)
            .unwrap()
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

pub struct FilePart {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl FilePart {
    pub fn new(name: &str, content_type: &str, bytes: &[u8]) -> Self {
        Self {
            name: name.to_string(),
            content_type: content_type.to_string(),
            bytes: bytes.to_vec(),
        }
    }
}

pub fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: Method, uri: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

/// Hand-rolled `multipart/form-data` body with text fields then image parts
pub fn multipart_request(method: Method, uri: &str, fields: &[(&str, &str)], files: &[FilePart]) -> Request<Body> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n").as_bytes(),
        );
    }
    for file in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"productImages\"; filename=\"{}\"\r\nContent-Type: {}\r\n\r\n",
                file.name, file.content_type
            )
            .as_bytes(),
        );
        body.extend_from_slice(&file.bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(body))
        .unwrap()
}

/// Drive one request through the router and decode the JSON body
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, headers, body)
}

#[tokio::test]
async fn ping_and_welcome_respond() {
    let app = TestApp::new();
    let (status, _, body) = send(&app.router, empty_request(Method::GET, "/ping")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pong");

    let (status, _, body) = send(&app.router, empty_request(Method::GET, "/")).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.as_str().is_some_and(|s| s.contains("Watch G")));
}
