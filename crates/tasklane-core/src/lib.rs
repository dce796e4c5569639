//! Core library for tasklane.
//!
//! Holds everything with real failure modes: the session/token lifecycle,
//! the authenticated request wrapper, and the configuration that wires them
//! together. Front-ends only render what this crate returns.

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod models;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_utils;

pub use api::{ApiClient, ApiError};
pub use auth::{AuthError, SessionManager};
pub use config::Config;
pub use context::AppContext;
