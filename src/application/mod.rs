//! Application layer - Use cases and application services
//!
//! This module contains the verification orchestrator and the services
//! around it (metrics, receipt delivery, health reporting).

pub mod services;
pub mod use_cases;

pub use services::*;
pub use use_cases::*;
