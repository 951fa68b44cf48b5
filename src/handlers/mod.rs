//! HTTP request handlers for API endpoints and pages.
//!
//! Handlers are grouped by feature; [`openapi`] wires them into the app.

pub mod ai;
pub mod auth;
pub mod health;
pub mod iban;
pub mod kb;
pub mod metrics;
pub mod notes;
pub mod openapi;
pub mod pages;
pub mod profile;

pub use openapi::{AppState, StartupError, create_app, create_openapi_spec};
