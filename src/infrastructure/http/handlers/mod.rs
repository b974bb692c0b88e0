//! HTTP route handlers module
//!
//! This module contains separate route handlers for different endpoint types,
//! organized by functionality to improve maintainability and testability.

pub mod health;
pub mod metrics;
pub mod payments;

pub use health::handle_health_request;
pub use metrics::handle_prometheus_request;
pub use payments::{handle_transaction_details, handle_user_transactions, handle_verify_payment};
