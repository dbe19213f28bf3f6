//! # Services Module
//!
//! Outbound integrations: the image relay and the Cloudinary host behind it.

pub mod cloudinary;
pub mod image_relay;

pub use cloudinary::CloudinaryClient;
pub use image_relay::{ImageHost, ImageRelay, UploadError, UploadedImage};
