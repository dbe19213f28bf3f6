//! Product catalog routes
//!
//! Create and update take `multipart/form-data` with up to four
//! `productImages` parts, or a JSON body without images; the rest of the
//! catalog endpoints are plain JSON.

use axum::extract::{DefaultBodyLimit, Path, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::routes::upload::ProductForm;
use crate::server::AppState;
use crate::services::UploadedImage;

fn product_not_found() -> ApiError {
    ApiError::not_found("Product not found.")
}

fn urls(images: &[UploadedImage]) -> Vec<String> {
    images.iter().map(|image| image.url.clone()).collect()
}

pub async fn add_product(
    State(state): State<AppState>,
    form: ProductForm,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let (fields, staged) = form.into_new_product().await?;

    let uploaded = state.relay.upload_all(&staged).await?;

    let new_product = match fields.with_images(urls(&uploaded)) {
        Ok(product) => product,
        Err(e) => {
            state.relay.discard(&uploaded).await;
            return Err(e.into());
        }
    };

    let product = match state.products.create(new_product).await {
        Ok(product) => product,
        Err(e) => {
            state.relay.discard(&uploaded).await;
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %product.id, images = uploaded.len(), "Product created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Product created successfully.",
            "product": product,
        })),
    ))
}

pub async fn get_products(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let products = state.products.list().await?;
    if products.is_empty() {
        return Err(ApiError::not_found("No products found."));
    }

    Ok(Json(json!({
        "success": true,
        "message": "Products fetched successfully.",
        "products": products,
    })))
}

pub async fn get_product_by_id(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let id = Uuid::parse_str(&id).map_err(|_| product_not_found())?;
    let product = state.products.get_by_id(id).await?.ok_or_else(product_not_found)?;

    Ok(Json(json!({
        "success": true,
        "message": "Product fetched successfully.",
        "product": product,
    })))
}

pub async fn update_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
    form: ProductForm,
) -> ApiResult<Json<Value>> {
    // Settle everything that can fail cheaply before any upload starts.
    let existing = match Uuid::parse_str(&id) {
        Ok(id) => state.products.get_by_id(id).await,
        Err(_) => Ok(None),
    };
    let existing = match existing {
        Ok(Some(product)) => product,
        Ok(None) => {
            form.discard().await;
            return Err(product_not_found());
        }
        Err(e) => {
            form.discard().await;
            return Err(e.into());
        }
    };
    let (mut patch, staged) = form.into_patch().await?;

    let uploaded = if staged.is_empty() {
        Vec::new()
    } else {
        state.relay.upload_all(&staged).await?
    };

    if let Err(e) = patch.set_images(urls(&uploaded)) {
        state.relay.discard(&uploaded).await;
        return Err(e.into());
    }

    let updated = match state.products.update(existing.id, patch).await {
        Ok(Some(product)) => product,
        Ok(None) => {
            // Deleted while the uploads were in flight.
            state.relay.discard(&uploaded).await;
            return Err(product_not_found());
        }
        Err(e) => {
            state.relay.discard(&uploaded).await;
            return Err(e.into());
        }
    };

    tracing::info!(product_id = %updated.id, new_images = uploaded.len(), "Product updated");
    Ok(Json(json!({
        "success": true,
        "message": "Product updated successfully.",
        "product": updated,
    })))
}

/// Deleting reports success whether or not the product existed
pub async fn delete_product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    match Uuid::parse_str(&id) {
        Ok(id) => {
            let removed = state.products.delete(id).await?;
            tracing::info!(product_id = %id, removed, "Product delete requested");
        }
        Err(_) => tracing::debug!("Delete for malformed product id `{}`", id),
    }

    Ok(Json(json!({
        "success": true,
        "message": "Product deleted successfully.",
    })))
}

pub fn create_product_routes(body_limit: usize) -> Router<AppState> {
    let multipart_routes = Router::new()
        .route("/api/v1/addProduct", post(add_product))
        .route("/api/v1/updateProduct/{id}", put(update_product))
        .layer(DefaultBodyLimit::max(body_limit));

    Router::new()
        .merge(multipart_routes)
        .route("/api/v1/getProduct", get(get_products))
        .route("/api/v1/getByIdProduct/{id}", get(get_product_by_id))
        .route("/api/v1/deleteProduct/{id}", delete(delete_product))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::ProductStore;
    use crate::database::models::{ProductDraft, Product};
    use crate::routes::test_support::{FilePart, TestApp, empty_request, json_request, multipart_request, send};
    use axum::http::{Method, header};
    use serde_json::json;

    fn shirt_fields() -> Vec<(&'static str, &'static str)> {
        vec![
            ("title", "Shirt"),
            ("price", "20"),
            ("description", "Cotton"),
            ("category", "Men"),
        ]
    }

    fn png(name: &str) -> FilePart {
        FilePart::new(name, "image/png", b"\x89PNG\r\n\x1a\nfake")
    }

    async fn seed(app: &TestApp) -> Product {
        let new = ProductDraft {
            title: Some("Shirt".into()),
            price: Some("20".into()),
            description: Some("Cotton".into()),
            links: Some("https://shop.example/shirt".into()),
            category: Some("Men".into()),
        }
        .validate()
        .unwrap()
        .with_images(vec!["https://img/1".into(), "https://img/2".into()])
        .unwrap();
        app.products.create(new).await.unwrap()
    }

    #[tokio::test]
    async fn create_product_with_one_image() {
        let app = TestApp::new();
        let request = multipart_request(Method::POST, "/api/v1/addProduct", &shirt_fields(), &[png("front.png")]);
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["success"], true);
        assert_eq!(body["product"]["title"], "Shirt");
        assert_eq!(body["product"]["price"], 20.0);
        assert_eq!(body["product"]["productImage"], "https://res.cloudinary.test/watchg/1.png");
        assert!(body["product"]["productImage2"].is_null());
        assert_eq!(app.products.len(), 1);
        assert!(app.staged_files().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_category_outside_set() {
        let app = TestApp::new();
        let mut fields = shirt_fields();
        fields[3] = ("category", "Other");
        let request = multipart_request(Method::POST, "/api/v1/addProduct", &fields, &[png("front.png")]);
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(app.host.upload_count(), 0);
        assert!(app.staged_files().is_empty());
    }

    #[tokio::test]
    async fn create_rejects_negative_price() {
        let app = TestApp::new();
        let mut fields = shirt_fields();
        fields[1] = ("price", "-1");
        let request = multipart_request(Method::POST, "/api/v1/addProduct", &fields, &[png("front.png")]);
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Price cannot be negative");
        assert_eq!(app.products.len(), 0);
    }

    #[tokio::test]
    async fn create_requires_an_image() {
        let app = TestApp::new();
        let request = multipart_request(Method::POST, "/api/v1/addProduct", &shirt_fields(), &[]);
        let (status, _, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn create_rejects_non_images_and_too_many_files() {
        let app = TestApp::new();
        let request = multipart_request(
            Method::POST,
            "/api/v1/addProduct",
            &shirt_fields(),
            &[png("a.png"), FilePart::new("notes.txt", "text/plain", b"hello")],
        );
        let (status, _, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Only image files are allowed!");
        assert!(app.staged_files().is_empty());

        let five: Vec<FilePart> = (0..5).map(|i| png(&format!("{i}.png"))).collect();
        let request = multipart_request(Method::POST, "/api/v1/addProduct", &shirt_fields(), &five);
        let (status, _, _) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(app.staged_files().is_empty());
        assert_eq!(app.host.upload_count(), 0);
    }

    #[tokio::test]
    async fn partial_upload_failure_persists_nothing_and_cleans_up() {
        let app = TestApp::new();
        app.host.fail_on("back");
        let request = multipart_request(
            Method::POST,
            "/api/v1/addProduct",
            &shirt_fields(),
            &[png("front.png"), png("back.png")],
        );
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(app.products.len(), 0);
        assert!(app.staged_files().is_empty());
        assert_eq!(app.host.destroyed(), vec!["watchg/1".to_string()]);
    }

    #[tokio::test]
    async fn list_and_fetch_by_id() {
        let app = TestApp::new();

        let (status, _, body) = send(&app.router, empty_request(Method::GET, "/api/v1/getProduct")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "No products found.");

        let product = seed(&app).await;
        let (status, _, body) = send(&app.router, empty_request(Method::GET, "/api/v1/getProduct")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["products"].as_array().unwrap().len(), 1);

        let uri = format!("/api/v1/getByIdProduct/{}", product.id);
        let (status, _, body) = send(&app.router, empty_request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["id"], product.id.to_string());

        let uri = format!("/api/v1/getByIdProduct/{}", Uuid::new_v4());
        let (status, _, _) = send(&app.router, empty_request(Method::GET, &uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _, _) = send(&app.router, empty_request(Method::GET, "/api/v1/getByIdProduct/not-an-id")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn update_without_files_keeps_images() {
        let app = TestApp::new();
        let product = seed(&app).await;

        let uri = format!("/api/v1/updateProduct/{}", product.id);
        let request = multipart_request(Method::PUT, &uri, &[("title", "Linen shirt"), ("price", "25.5")], &[]);
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["title"], "Linen shirt");
        assert_eq!(body["product"]["price"], 25.5);
        assert_eq!(body["product"]["productImage"], "https://img/1");
        assert_eq!(body["product"]["productImage2"], "https://img/2");
        assert_eq!(body["product"]["description"], "Cotton");
        assert_eq!(app.host.upload_count(), 0);
    }

    #[tokio::test]
    async fn update_replaces_only_uploaded_slots() {
        let app = TestApp::new();
        let product = seed(&app).await;

        let uri = format!("/api/v1/updateProduct/{}", product.id);
        let request = multipart_request(Method::PUT, &uri, &[], &[png("new-front.png")]);
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["productImage"], "https://res.cloudinary.test/watchg/1.png");
        assert_eq!(body["product"]["productImage2"], "https://img/2");
        assert!(app.staged_files().is_empty());
    }

    #[tokio::test]
    async fn update_unknown_product_uploads_nothing() {
        let app = TestApp::new();
        let uri = format!("/api/v1/updateProduct/{}", Uuid::new_v4());
        let request = multipart_request(Method::PUT, &uri, &[("title", "x")], &[png("front.png")]);
        let (status, _, _) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(app.host.upload_count(), 0);
        assert!(app.staged_files().is_empty());
    }

    #[tokio::test]
    async fn update_validates_supplied_fields() {
        let app = TestApp::new();
        let product = seed(&app).await;
        let uri = format!("/api/v1/updateProduct/{}", product.id);
        let request = multipart_request(Method::PUT, &uri, &[("category", "Other")], &[]);
        let (status, _, _) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        let stored = app.products.get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored, product);
    }

    #[tokio::test]
    async fn create_with_json_body_needs_an_image() {
        let app = TestApp::new();
        let body = json!({"title": "Shirt", "price": 20, "description": "Cotton", "category": "Men"});
        let (status, _, body) = send(&app.router, json_request(Method::POST, "/api/v1/addProduct", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "All fields and at least one image are required.");
        assert_eq!(app.products.len(), 0);
    }

    #[tokio::test]
    async fn unsupported_body_is_rejected_with_json_error() {
        let app = TestApp::new();
        let product = seed(&app).await;

        let uris = ["/api/v1/addProduct".to_string(), format!("/api/v1/updateProduct/{}", product.id)];
        for (method, uri) in [Method::POST, Method::PUT].into_iter().zip(uris) {
            let request = axum::http::Request::builder()
                .method(method)
                .uri(uri)
                .header(header::CONTENT_TYPE, "text/plain")
                .body(axum::body::Body::from("title=Shirt"))
                .unwrap();
            let (status, headers, body) = send(&app.router, request).await;

            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(headers[header::CONTENT_TYPE], "application/json");
            assert_eq!(body["success"], false);
            assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));
        }

        let request = axum::http::Request::builder()
            .method(Method::PUT)
            .uri(format!("/api/v1/updateProduct/{}", product.id))
            .header(header::CONTENT_TYPE, "application/json")
            .body(axum::body::Body::from("{\"title\":"))
            .unwrap();
        let (status, _, body) = send(&app.router, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn update_accepts_json_body_without_files() {
        let app = TestApp::new();
        let product = seed(&app).await;

        let uri = format!("/api/v1/updateProduct/{}", product.id);
        let (status, _, body) = send(
            &app.router,
            json_request(Method::PUT, &uri, json!({"title": "Oxford shirt", "price": 30, "category": "Women"})),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"]["title"], "Oxford shirt");
        assert_eq!(body["product"]["price"], 30.0);
        assert_eq!(body["product"]["category"], "Women");
        assert_eq!(body["product"]["productImage"], "https://img/1");
        assert_eq!(body["product"]["productImage2"], "https://img/2");
        assert_eq!(app.host.upload_count(), 0);
    }

    #[tokio::test]
    async fn failed_create_write_discards_uploaded_images() {
        let app = TestApp::new();
        app.catalog.fail_writes();
        let request = multipart_request(
            Method::POST,
            "/api/v1/addProduct",
            &shirt_fields(),
            &[png("front.png"), png("back.png")],
        );
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Internal server error");
        let mut destroyed = app.host.destroyed();
        destroyed.sort();
        assert_eq!(destroyed, vec!["watchg/1".to_string(), "watchg/2".to_string()]);
        assert_eq!(app.products.len(), 0);
        assert!(app.staged_files().is_empty());
    }

    #[tokio::test]
    async fn failed_update_write_discards_new_images() {
        let app = TestApp::new();
        let product = seed(&app).await;
        app.catalog.fail_writes();

        let uri = format!("/api/v1/updateProduct/{}", product.id);
        let request = multipart_request(Method::PUT, &uri, &[("title", "Linen shirt")], &[png("new-front.png")]);
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert_eq!(app.host.destroyed(), vec!["watchg/1".to_string()]);
        assert!(app.staged_files().is_empty());
        let stored = app.products.get_by_id(product.id).await.unwrap().unwrap();
        assert_eq!(stored, product);
    }

    #[tokio::test]
    async fn product_vanishing_mid_update_discards_new_images() {
        let app = TestApp::new();
        let product = seed(&app).await;
        app.catalog.lose_updates();

        let uri = format!("/api/v1/updateProduct/{}", product.id);
        let request = multipart_request(Method::PUT, &uri, &[], &[png("new-front.png")]);
        let (status, _, body) = send(&app.router, request).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Product not found.");
        assert_eq!(app.host.destroyed(), vec!["watchg/1".to_string()]);
        assert!(app.staged_files().is_empty());
    }

    #[tokio::test]
    async fn delete_reports_success_even_when_absent() {
        let app = TestApp::new();
        let product = seed(&app).await;

        let uri = format!("/api/v1/deleteProduct/{}", product.id);
        let (status, _, body) = send(&app.router, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(app.products.len(), 0);

        let uri = format!("/api/v1/deleteProduct/{}", Uuid::new_v4());
        let (status, _, body) = send(&app.router, empty_request(Method::DELETE, &uri)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Product deleted successfully.");
    }
}
