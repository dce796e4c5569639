//! REST API client module for the task backend.
//!
//! This module provides the `ApiClient` for calling the backend's task,
//! profile and admin endpoints. Every call is gated on the session holding a
//! valid bearer token, and every HTTP exchange goes through the
//! `HttpTransport` seam.

pub mod admin;
pub mod client;
pub mod error;
pub mod tasks;
pub mod transport;

pub use client::{ApiClient, RequestOptions};
pub use error::ApiError;
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport, TransportError};
