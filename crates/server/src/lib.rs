//! HTTP server for the menuboard site backend.
//!
//! This crate provides:
//! - The menu gallery API (list, admin upload and delete)
//! - Session login/logout with a signed cookie
//! - The front-line interceptor for locale and admin page routing
//! - Serving of images held by local backends

pub mod auth;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod routes;
pub mod session;
pub mod state;

pub use auth::{AdminSession, TraceId};
pub use error::ApiError;
pub use routes::create_router;
pub use session::{SESSION_COOKIE, Session, SessionGate};
pub use state::AppState;
