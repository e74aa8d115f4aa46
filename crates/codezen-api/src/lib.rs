//! REST API for CodeZen.
//!
//! Exposes projects, guidelines, reviews, and review conversations under
//! `/api/v1/projects`, every route scoped to the caller named by the
//! `X-User-Email` header.

pub mod auth;
pub mod body;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use routes::router;
pub use server::run_server;
pub use state::AppState;
