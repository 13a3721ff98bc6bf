//! HTTP request handlers.

pub mod assets;
pub mod auth;
pub mod health;
pub mod images;

pub use assets::*;
pub use auth::*;
pub use health::*;
pub use images::*;
