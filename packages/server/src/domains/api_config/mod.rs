//! External API configuration domain - API keys, per-key field scoping,
//! CORS/HTTPS policy and rate-limit settings for the public endpoints.

pub mod models;
pub mod store;

pub use models::{ApiConfiguration, NewApiConfiguration, RateLimitSettings};
pub use store::{ApiConfigError, ApiConfigStore};
