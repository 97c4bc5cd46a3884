//! Product API Library
//!
//! User registration and login with bcrypt-hashed credentials and signed
//! bearer tokens, plus a paginated product listing behind the token gate
//! and a per-client rate limiter.

pub mod auth;
pub mod catalog;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod server;

pub use config::Config;
pub use db::Database;
pub use error::{ApiError, ConfigError, StoreError};
pub use server::{build_router, AppState, Server};
