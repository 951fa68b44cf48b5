//! Data models and schemas for the QA Toolsmith API.
//!
//! Request bodies and query strings are deserialized into permissive shapes
//! (mostly `Option` fields) so that the validation layer can report every
//! problem with a field name instead of failing on the first serde error.

pub mod ai;
pub mod api;
pub mod audit;
pub mod auth;
pub mod iban;
pub mod kb;
pub mod profile;

pub use ai::*;
pub use api::*;
pub use audit::*;
pub use auth::*;
pub use iban::*;
pub use kb::*;
pub use profile::*;
