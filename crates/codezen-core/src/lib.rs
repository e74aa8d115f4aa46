//! Core types, configuration, and error handling for CodeZen.
//!
//! This crate provides the shared foundation used by all other CodeZen crates:
//! - [`CodezenError`]: unified error type using `thiserror`
//! - [`CodezenConfig`]: configuration loaded from `.codezen.toml`
//! - Persisted records: [`User`], [`Project`], [`Guideline`], [`Review`],
//!   [`Comment`], plus [`CommentRole`] and [`OutputFormat`]

mod config;
mod error;
mod types;

pub use config::{CodezenConfig, DatabaseConfig, LlmConfig, ServerConfig};
pub use error::CodezenError;
pub use types::{Comment, CommentRole, Guideline, OutputFormat, Project, Review, User};

/// A convenience `Result` type for CodeZen operations.
pub type Result<T> = std::result::Result<T, CodezenError>;
