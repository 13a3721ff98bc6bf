//! Core domain types and shared logic for menuboard.
//!
//! This crate defines the data model used across all other crates:
//! - Image identity extraction and classification
//! - Locale rules for page routing
//! - Application configuration

pub mod config;
pub mod error;
pub mod image;
pub mod locale;

pub use error::{Error, Result};
pub use image::{ADMIN_IMAGE_NAME, Classified, ImageRecord, Origin, classify_key};
pub use locale::LocaleSet;

/// Default maximum upload size: 10 MiB
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Default session lifetime: 2 hours
pub const DEFAULT_SESSION_TTL_SECS: u64 = 2 * 60 * 60;
