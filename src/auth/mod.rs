//! # Authentication Module
//!
//! Password hashing, session token issuance and validation, and the payloads
//! used by the admin auth endpoints.

pub mod jwt;
pub mod models;
pub mod password;
