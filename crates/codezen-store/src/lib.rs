//! SQLite persistence for users, projects, guidelines, reviews, and comments.
//!
//! Every project lookup is scoped by owner, and every child lookup by its
//! parent, so a caller can never reach another user's records.

pub mod store;

pub use store::Store;
