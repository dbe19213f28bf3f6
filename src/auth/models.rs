//! Authentication Models
//!
//! Request and response payloads for the admin registration and login endpoints.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the cookie carrying the session token
pub const SESSION_COOKIE: &str = "token";

/// Registration request payload. Fields are optional so a missing one is
/// reported as a validation error rather than a body rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RegisterRequest {
    pub fullname: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    #[serde(alias = "phone")]
    pub number: Option<String>,
}

/// Login request payload
#[derive(Debug, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Returned once from registration, including the freshly issued token
#[derive(Debug, Serialize)]
pub struct RegisteredAdmin {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub number: String,
    pub token: String,
}

/// Returned from login; the token travels in the cookie only
#[derive(Debug, Serialize)]
pub struct LoggedInAdmin {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
}
