//! QA Toolsmith API - everyday helpers for software testers
//!
//! An Actix Web service that provides:
//! - A shared knowledge base of testing resources with private notes
//! - Deterministic IBAN test data and an IBAN validator
//! - An AI assistant with a per-user daily limit
//! - Cookie sessions backed by a hosted Supabase-style auth/data backend
//! - Rate limiting, security headers, request ids and Prometheus metrics
//! - OpenAPI documentation
//!
//! ## Architecture
//!
//! - `backend/` - Auth and data backend trait, Supabase and in-memory implementations
//! - `models/` - Data structures and request/response models
//! - `handlers/` - HTTP request handlers, the app state and the app factory
//! - `middleware/` - Session, security header, request id and metrics middleware
//! - `services/` - IBAN, rate limiting, access rules, AI assist and metrics
//! - `utils/` - Validation, sanitizing, cookies and request helpers
//! - `config/` - Configuration structures and environment loading
//!
//! ## Quick Start
//!
//! ```no_run
//! use qa_toolsmith::{AppState, create_app};
//!
//! #[actix_web::main]
//! async fn main() -> std::io::Result<()> {
//!     let state = AppState::from_env().map_err(std::io::Error::other)?;
//!     actix_web::HttpServer::new(move || create_app(state.clone()))
//!         .bind(("127.0.0.1", 8080))?
//!         .run()
//!         .await
//! }
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use backend::{Backend, BackendError, MemoryBackend, SharedBackend, SupabaseBackend};
pub use config::{
    AiAssistConfig, AuthConfig, BackendConfig, BackendMode, ConfigError, MetricsConfig,
    RateLimitConfig, SecurityHeadersConfig, ServerConfig,
};
pub use error::ApiError;
pub use handlers::{AppState, StartupError, create_app, create_openapi_spec};
pub use middleware::{
    MetricsMiddleware, RequestId, RequestIdMiddleware, SecurityHeaders, SessionContext,
    SessionMiddleware,
};
pub use services::{AiAssistant, AppMetrics, RateLimiter, UsageTracker};
