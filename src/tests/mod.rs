//! Cross-layer test suite for the payment verification service
//!
//! - `integration`: verification scenarios through the full route tree
//! - `security`: authentication, ownership and rate limiting
//! - `common`: mailbox double, configuration and request helpers

pub mod common;
pub mod integration;
pub mod security;

/// Test configuration and utilities
pub mod config {
    use std::sync::Once;

    static INIT: Once = Once::new();

    /// Initialize tracing once for tests that want log output
    pub fn init() {
        INIT.call_once(|| {
            let _ = tracing_subscriber::fmt()
                .with_env_filter("debug")
                .with_test_writer()
                .try_init();
        });
    }
}
