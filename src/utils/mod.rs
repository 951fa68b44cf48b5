//! Utility functions and helper modules.
//!
//! Client IP and user agent extraction, route patterns for metrics,
//! HTML/URL sanitizing, request validation, and session cookies.

pub mod cookies;
pub mod http;
pub mod route;
pub mod sanitize;
pub mod validation;

pub use cookies::*;
pub use http::*;
pub use route::*;
pub use sanitize::*;
pub use validation::*;
