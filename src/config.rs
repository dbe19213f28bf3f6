//! Configuration module for environment variables and application settings
//!
//! Everything is read once in `main` and handed to the components that need it.
//! Nothing below the router looks at the environment on its own.

use anyhow::{Context, Result, anyhow};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP listener configuration
    pub server: ServerConfig,

    /// Persistence backend configuration
    pub database: DatabaseSettings,

    /// Session token and cookie configuration
    pub auth: AuthConfig,

    /// Remote image host credentials
    pub cloudinary: CloudinaryConfig,

    /// Multipart staging configuration
    pub uploads: UploadConfig,

    /// The single trusted cross-origin caller
    pub cors_origin: String,

    /// Directory served for any unmatched GET
    pub static_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub backend: StoreBackend,
    pub url: Option<String>,
    pub max_connections: usize,
    pub tls: bool,
}

#[derive(Clone)]
pub struct AuthConfig {
    pub jwt_secret: String,
    pub cookie_secure: bool,
}

// Keep the secret out of debug logs.
impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("cookie_secure", &self.cookie_secure)
            .finish()
    }
}

#[derive(Clone)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
    pub timeout: Duration,
}

impl std::fmt::Debug for CloudinaryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudinaryConfig")
            .field("cloud_name", &self.cloud_name)
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Where multipart file parts are staged before relay
    pub dir: PathBuf,
    /// Per-image size ceiling in bytes
    pub max_image_bytes: usize,
}

/// Maximum number of `productImages` parts accepted per request
pub const MAX_IMAGES_PER_PRODUCT: usize = 4;

impl UploadConfig {
    /// Body limit for multipart product requests: every image slot full plus
    /// headroom for the text fields and part headers.
    pub fn body_limit(&self) -> usize {
        self.max_image_bytes * MAX_IMAGES_PER_PRODUCT + 64 * 1024
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            dir: env::temp_dir(),
            max_image_bytes: 5 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let backend = match env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .to_lowercase()
            .as_str()
        {
            "postgres" | "postgresql" => StoreBackend::Postgres,
            "memory" => StoreBackend::Memory,
            other => return Err(anyhow!("STORE_BACKEND must be `postgres` or `memory`, got `{other}`")),
        };

        let database_url = env::var("DATABASE_URL").ok();
        if backend == StoreBackend::Postgres && database_url.is_none() {
            return Err(anyhow!("DATABASE_URL environment variable is required for the postgres backend"));
        }

        let uploads_default = UploadConfig::default();

        Ok(Self {
            server: ServerConfig {
                host: env::var("SERVER_HOST")
                    .unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .or_else(|_| env::var("SERVER_PORT"))
                    .unwrap_or_else(|_| "5000".to_string())
                    .parse()
                    .context("PORT must be a valid port number")?,
            },

            database: DatabaseSettings {
                backend,
                url: database_url,
                max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                    .unwrap_or_else(|_| "16".to_string())
                    .parse()
                    .unwrap_or(16),
                tls: parse_bool(env::var("DATABASE_TLS").ok(), true),
            },

            auth: AuthConfig {
                jwt_secret: env::var("JWT_SECRET")
                    .map_err(|_| anyhow!("JWT_SECRET environment variable is required"))?,
                cookie_secure: parse_bool(env::var("COOKIE_SECURE").ok(), true),
            },

            cloudinary: CloudinaryConfig {
                cloud_name: env::var("CLOUD_NAME")
                    .map_err(|_| anyhow!("CLOUD_NAME environment variable is required"))?,
                api_key: env::var("API_KEY")
                    .map_err(|_| anyhow!("API_KEY environment variable is required"))?,
                api_secret: env::var("API_SECRET")
                    .map_err(|_| anyhow!("API_SECRET environment variable is required"))?,
                timeout: Duration::from_secs(
                    env::var("CLOUDINARY_TIMEOUT_SECS")
                        .unwrap_or_else(|_| "30".to_string())
                        .parse()
                        .unwrap_or(30),
                ),
            },

            uploads: UploadConfig {
                dir: env::var("UPLOAD_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(uploads_default.dir),
                max_image_bytes: env::var("MAX_IMAGE_BYTES")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(uploads_default.max_image_bytes),
            },

            cors_origin: env::var("CORS_ORIGIN")
                .unwrap_or_else(|_| "https://watch-gi.vercel.app".to_string()),

            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),
        })
    }
}

fn parse_bool(value: Option<String>, default: bool) -> bool {
    match value.as_deref().map(str::trim).map(str::to_lowercase).as_deref() {
        Some("1" | "true" | "yes" | "on") => true,
        Some("0" | "false" | "no" | "off") => false,
        _ => default,
    }
}
