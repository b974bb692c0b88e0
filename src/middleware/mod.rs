//! Request middleware
//!
//! Cross-cutting request policies applied in front of the handlers.

pub mod rate_limit;

pub use rate_limit::RateLimitMiddleware;
