//! WalletPay Verifier - payment verification for a digital-goods storefront
//!
//! Buyers pay through a Pakistani mobile wallet (NayaPay, JazzCash,
//! Easypaisa, or a JazzCash to NayaPay Raast transfer) and submit the
//! transaction id. The engine finds the provider's confirmation email in the
//! merchant inbox, extracts the payment details, matches them against the
//! claim and grants the purchase exactly once per transaction id.

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod middleware;
pub mod shared;

#[cfg(test)]
mod tests;

pub use config::AppConfig;
pub use infrastructure::http::HttpServer;
pub use shared::error::{AppError, AppResult};

/// Application result type
pub type Result<T> = std::result::Result<T, shared::error::AppError>;
