//! Custom middleware implementations for the API.
//!
//! This module contains middleware for session resolution, security headers,
//! request IDs and metrics collection.

pub mod metrics;
pub mod request_id;
pub mod security;
pub mod session;

pub use metrics::*;
pub use request_id::*;
pub use security::*;
pub use session::*;
