//! Logging utilities module
//!
//! This module provides centralized logging functionality and utilities.

use crate::config::app_config::LoggingConfig;
use crate::shared::error::AppError;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{info, warn};

/// Logging utilities for the application
pub struct LoggingUtils;

impl LoggingUtils {
    /// Initialize the global subscriber. `RUST_LOG` wins over the configured level.
    pub fn initialize(config: &LoggingConfig) -> crate::Result<()> {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.level));

        let builder = fmt::Subscriber::builder()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false);

        let result = if config.format == "compact" {
            tracing::subscriber::set_global_default(builder.compact().finish())
        } else {
            tracing::subscriber::set_global_default(builder.finish())
        };

        result.map_err(|e| AppError::Internal(format!("Failed to initialize logging: {}", e)))
    }

    /// Log an incoming verification claim
    pub fn log_claim(request_id: &str, user_id: &str, method: &str, txn_id: &str) {
        info!(
            request_id = %request_id,
            user_id = %user_id,
            method = %method,
            txn_id = %txn_id,
            "Processing payment verification"
        );
    }

    /// Log the terminal state of a verification request
    pub fn log_outcome(request_id: &str, txn_id: &str, outcome: &str, duration_ms: u64) {
        info!(
            request_id = %request_id,
            txn_id = %txn_id,
            outcome = %outcome,
            duration_ms = %duration_ms,
            "Payment verification finished"
        );
    }

    /// Log events worth an operator's attention (replays, races)
    pub fn log_security_event(event_type: &str, details: &str, user_id: &str) {
        warn!(
            event_type = %event_type,
            details = %details,
            user_id = %user_id,
            "Security event detected"
        );
    }

    /// Generate a unique request ID
    pub fn generate_request_id() -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();

        format!("req_{:x}", now)
    }
}
