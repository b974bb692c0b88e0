//! HTTP routes module
//!
//! This module contains all HTTP route configurations.

pub mod builder;
pub mod health;
pub mod metrics;
pub mod payments;

// Re-export commonly used types
pub use builder::{handle_rejection, RouteBuilder, RouteServices};
pub use health::HealthRoutes;
pub use metrics::MetricsRoutes;
pub use payments::PaymentsRoutes;
