// Database Connection Management
//
// Handles PostgreSQL connection pooling using tokio-postgres and deadpool.
use anyhow::{Context, Result};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use native_tls::TlsConnector;
use postgres_native_tls::MakeTlsConnector;
use std::time::Duration;

use crate::config::DatabaseSettings;

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub dbname: String,
    pub max_size: usize,
    pub tls: bool,
    pub timeouts: deadpool_postgres::Timeouts,
}

fn default_timeouts() -> deadpool_postgres::Timeouts {
    deadpool_postgres::Timeouts {
        wait: Some(Duration::from_secs(30)),
        create: Some(Duration::from_secs(30)),
        recycle: Some(Duration::from_secs(30)),
    }
}

impl DatabaseConfig {
    /// Create configuration from database URL
    pub fn from_url(url: &str) -> Result<Self> {
        let parsed = url::Url::parse(url)
            .context("Failed to parse database URL")?;

        if parsed.scheme() != "postgresql" && parsed.scheme() != "postgres" {
            anyhow::bail!("Invalid database URL scheme, expected postgresql or postgres");
        }

        let dbname = parsed.path().trim_start_matches('/');
        Ok(Self {
            host: parsed.host_str().unwrap_or("localhost").to_string(),
            port: parsed.port().unwrap_or(5432),
            user: parsed.username().to_string(),
            password: parsed.password().unwrap_or("").to_string(),
            dbname: if dbname.is_empty() { "postgres".to_string() } else { dbname.to_string() },
            max_size: 16,
            tls: true,
            timeouts: default_timeouts(),
        })
    }

    /// Build from the application settings loaded at startup
    pub fn from_settings(settings: &DatabaseSettings) -> Result<Self> {
        let url = settings
            .url
            .as_deref()
            .context("DATABASE_URL must be set for the postgres backend")?;
        let mut config = Self::from_url(url)?;
        config.max_size = settings.max_connections;
        config.tls = settings.tls;
        Ok(config)
    }
}

/// Database connection wrapper
#[derive(Debug, Clone)]
pub struct DatabaseConnection {
    pool: Pool,
}

impl DatabaseConnection {
    /// Create a new database connection with the provided configuration
    pub async fn new(config: DatabaseConfig) -> Result<Self> {
        let masked_host = format!("{}:{}/{}", config.host, config.port, config.dbname);
        tracing::info!("🔌 Connecting to database: {}", masked_host);

        let mut pg_config = tokio_postgres::Config::new();
        pg_config.host(&config.host);
        pg_config.port(config.port);
        pg_config.user(&config.user);
        pg_config.password(&config.password);
        pg_config.dbname(&config.dbname);

        let mgr_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };
        let mgr = if config.tls {
            let tls_connector = TlsConnector::builder().build().context("Failed to build TLS connector")?;
            Manager::from_config(pg_config, MakeTlsConnector::new(tls_connector), mgr_config)
        } else {
            tracing::warn!("⚠️  Database TLS disabled");
            Manager::from_config(pg_config, tokio_postgres::NoTls, mgr_config)
        };

        let pool = Pool::builder(mgr)
            .max_size(config.max_size)
            .wait_timeout(config.timeouts.wait)
            .create_timeout(config.timeouts.create)
            .recycle_timeout(config.timeouts.recycle)
            .runtime(deadpool_postgres::Runtime::Tokio1)
            .build()
            .context("Failed to create database pool")?;

        let connection = Self { pool };
        connection.health_check().await?;

        tracing::info!("✅ Database connection established successfully");

        Ok(connection)
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run embedded migrations
    pub async fn migrate(&self) -> Result<()> {
        super::migrations::run_migrations(&self.pool).await
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<()> {
        let client = self.pool
            .get()
            .await
            .context("Failed to get connection for health check")?;

        client
            .query("SELECT 1", &[])
            .await
            .context("Database health check failed")?;
        Ok(())
    }

    /// Get database connection statistics
    pub fn stats(&self) -> ConnectionStats {
        let status = self.pool.status();
        ConnectionStats {
            size: status.size as u32,
            idle: status.available,
        }
    }
}

/// Database connection statistics
#[derive(Debug)]
pub struct ConnectionStats {
    pub size: u32,
    pub idle: usize,
}
