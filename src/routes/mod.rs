// # Routes Module
//
// - HTTP route handlers for the admin server, one submodule per API area.
// - Each module exposes a `create_*_routes` function merged in `server.rs`.

/// Welcome and health check endpoints
pub mod health;

/// Admin registration, login and session check
pub mod auth;

/// Product catalog CRUD
pub mod product;

/// Multipart form parsing and image staging
pub mod upload;

#[cfg(test)]
pub mod test_support;
