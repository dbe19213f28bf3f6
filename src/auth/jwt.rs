//! JWT Token Service
//!
//! Issues and verifies the signed session tokens handed to admins at login.

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::database::models::AdminIdentity;

const ISSUER: &str = "watchg-admin";

/// Lifetime of a session token, also used as the cookie max-age
pub const TOKEN_TTL_DAYS: i64 = 30;

/// JWT Claims structure containing admin information and token metadata
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Claims {
    /// Admin unique identifier
    pub sub: Uuid,
    /// Admin email
    pub email: String,
    /// Admin display name
    pub fullname: String,
    /// Token issued at timestamp
    pub iat: i64,
    /// Token expiration timestamp
    pub exp: i64,
    /// Token issuer
    pub iss: String,
}

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Malformed, badly signed and expired tokens are reported identically.
    #[error("invalid or expired token")]
    InvalidOrExpired,
    #[error("failed to encode token: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}

/// JWT Service for token operations
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtService {
    /// Create a new JWT service with the provided secret
    pub fn new(secret: &str) -> Self {
        let encoding_key = EncodingKey::from_secret(secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(secret.as_bytes());

        let mut validation = Validation::default();
        validation.set_issuer(&[ISSUER]);
        validation.leeway = 0;

        Self {
            encoding_key,
            decoding_key,
            validation,
        }
    }

    /// Generate a 30-day token for an admin
    pub fn issue(&self, admin: &AdminIdentity) -> Result<String, TokenError> {
        let now = Utc::now();
        let claims = Claims {
            sub: admin.id,
            email: admin.email.clone(),
            fullname: admin.fullname.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::days(TOKEN_TTL_DAYS)).timestamp(),
            iss: ISSUER.to_string(),
        };
        self.sign(&claims)
    }

    fn sign(&self, claims: &Claims) -> Result<String, TokenError> {
        Ok(encode(&Header::default(), claims, &self.encoding_key)?)
    }

    /// Check signature and expiry, returning the claims on success
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!("JWT validation failed: {:?}", e.kind());
                TokenError::InvalidOrExpired
            })
    }
}
