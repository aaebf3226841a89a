// Kernel - cross-domain infrastructure: dependency container, rate limiting

pub mod deps;
pub mod rate_limit;

pub use deps::ServerDeps;
pub use rate_limit::{InMemoryRateLimiter, RateKey, RateLimiter};
