//! Business logic and service layer modules.
//!
//! IBAN generation and validation, rate limiting, metrics, profile lookup,
//! KB access rules and the AI-assist client with its usage tracker.

pub mod access;
pub mod ai_assist;
pub mod iban;
pub mod metrics;
pub mod profile;
pub mod rate_limit;
pub mod usage;

pub use ai_assist::{AiAssistError, AiAssistant, Completion};
pub use metrics::*;
pub use rate_limit::*;
pub use usage::*;
