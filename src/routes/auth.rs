//! Auth routes for admin registration, login, and session checks

use axum::extract::rejection::JsonRejection;
use axum::{Json, Router, extract::State, http::StatusCode, routing::{get, post}};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde_json::{Value, json};

use crate::auth::jwt::TOKEN_TTL_DAYS;
use crate::auth::models::{LoggedInAdmin, LoginRequest, RegisterRequest, RegisteredAdmin, SESSION_COOKIE};
use crate::auth::password::verify_dummy;
use crate::database::models::NewAdmin;
use crate::error::{ApiError, ApiResult};
use crate::server::AppState;

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid credentials")
}

/// Session cookie carrying the token for the lifetime of the token itself
fn session_cookie(token: String, secure: bool) -> Cookie<'static> {
    let mut cookie = Cookie::new(SESSION_COOKIE, token);
    cookie.set_http_only(true);
    cookie.set_secure(secure);
    // Cross-site dashboards need None, which browsers only honour on Secure cookies.
    cookie.set_same_site(if secure { SameSite::None } else { SameSite::Lax });
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::days(TOKEN_TTL_DAYS));
    cookie
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let Json(req) = payload?;
    let (Some(fullname), Some(email), Some(password), Some(number)) = (
        present(req.fullname),
        present(req.email),
        present(req.password),
        present(req.number),
    ) else {
        return Err(ApiError::validation("All fields are required"));
    };

    let new_admin = NewAdmin::new(&fullname, &email, &password, &number).await?;
    if state.admins.find_by_email(new_admin.email()).await?.is_some() {
        return Err(ApiError::Conflict("Admin already exists".to_string()));
    }

    // A concurrent registration can still win the race; the store's unique
    // constraint turns that into DuplicateKey, reported as 409.
    let admin = state.admins.create(new_admin).await?;
    let token = state.jwt_service.issue(&admin)?;

    tracing::info!(admin_id = %admin.id, "Admin registered");

    let data = RegisteredAdmin {
        id: admin.id,
        fullname: admin.fullname,
        email: admin.email,
        number: admin.phone,
        token,
    };
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Admin created successfully",
            "data": data,
        })),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let Json(req) = payload?;
    let (Some(email), Some(password)) = (present(req.email), req.password.filter(|p| !p.is_empty())) else {
        return Err(ApiError::validation("Email and password are required"));
    };

    let admin = match state.admins.find_by_email(&email).await? {
        Some(admin) if admin.verify_password(&password).await => admin,
        Some(_) => {
            tracing::info!("Login rejected: bad password");
            return Err(invalid_credentials());
        }
        None => {
            verify_dummy(&password).await;
            tracing::info!("Login rejected: unknown email");
            return Err(invalid_credentials());
        }
    };

    let token = state.jwt_service.issue(&admin)?;
    tracing::info!(admin_id = %admin.id, "Admin logged in");

    let data = LoggedInAdmin {
        id: admin.id,
        fullname: admin.fullname,
        email: admin.email,
    };
    Ok((
        jar.add(session_cookie(token, state.cookie_secure)),
        Json(json!({
            "success": true,
            "message": "Logged in successfully",
            "data": data,
        })),
    ))
}

pub async fn is_login(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<Value>> {
    let Some(token) = jar.get(SESSION_COOKIE).map(|c| c.value().to_string()) else {
        return Err(ApiError::unauthorized("Not authenticated"));
    };

    let claims = state.jwt_service.verify(&token)?;

    let Some(admin) = state.admins.find_by_id(claims.sub).await? else {
        return Err(ApiError::not_found("Admin not found"));
    };

    Ok(Json(json!({
        "success": true,
        "message": "Authenticated",
        "admin": admin.summary(),
    })))
}

pub fn create_auth_routes() -> Router<AppState> {
    Router::new()
        .route("/api/v1/addAdmin", post(register))
        .route("/api/v1/loginAdmin", post(login))
        .route("/api/v1/isLogin", get(is_login))
}
