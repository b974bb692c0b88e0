//! Configuration validation module
//!
//! This module provides additional validation logic for configuration
//! beyond the basic validator crate validation.

use crate::config::app_config::{AppConfig, EmailConfig, EmailProvider, LoggingConfig, RateLimitConfig};
use crate::shared::error::AppError;

/// Configuration validator for cross-field rules
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the complete configuration
    pub fn validate_config(config: &AppConfig) -> crate::Result<()> {
        Self::validate_email_config(&config.email, config.security.development_mode)?;
        Self::validate_rate_limit_config(&config.rate_limit)?;
        Self::validate_logging_config(&config.logging)?;
        Self::validate_storage_url(config.storage.redis_url.as_deref())?;

        for product in &config.catalog.products {
            if !(product.price.is_finite() && product.price > 0.0) {
                return Err(AppError::Validation(format!(
                    "Product {} must have a positive price",
                    product.id
                )));
            }
        }

        Ok(())
    }

    /// Mailbox rules: synthetic confirmations only in development, real credentials otherwise
    fn validate_email_config(email: &EmailConfig, development_mode: bool) -> crate::Result<()> {
        if email.widened_days_back < email.default_days_back {
            return Err(AppError::Validation(
                "widened_days_back must not be shorter than default_days_back".to_string(),
            ));
        }

        match email.provider {
            EmailProvider::Synthetic if !development_mode => Err(AppError::Validation(
                "The synthetic mailbox accepts any claim and is only allowed in development mode".to_string(),
            )),
            EmailProvider::Synthetic => {
                tracing::warn!("Synthetic mailbox enabled - every claimed payment will appear to exist");
                Ok(())
            }
            EmailProvider::Gmail => {
                let gmail = &email.gmail;
                if gmail.client_id.is_empty() || gmail.client_secret.is_empty() || gmail.refresh_token.is_empty() {
                    return Err(AppError::Validation(
                        "Gmail provider requires client_id, client_secret and refresh_token".to_string(),
                    ));
                }
                if !gmail.api_base_url.starts_with("https://") && !development_mode {
                    return Err(AppError::Validation("Gmail API URL must use HTTPS".to_string()));
                }
                Ok(())
            }
        }
    }

    /// Validate rate limiting configuration
    fn validate_rate_limit_config(rate_limit: &RateLimitConfig) -> crate::Result<()> {
        if rate_limit.enabled && rate_limit.burst_size > rate_limit.requests_per_minute {
            return Err(AppError::Validation(
                "Burst size cannot be greater than requests per minute".to_string(),
            ));
        }
        Ok(())
    }

    fn validate_logging_config(logging: &LoggingConfig) -> crate::Result<()> {
        if !["full", "compact"].contains(&logging.format.as_str()) {
            return Err(AppError::Validation(format!("Invalid log format: {}", logging.format)));
        }
        Ok(())
    }

    fn validate_storage_url(url: Option<&str>) -> crate::Result<()> {
        match url {
            Some(url) if !url.starts_with("redis://") && !url.starts_with("rediss://") => Err(
                AppError::Validation("Redis URL must start with redis:// or rediss://".to_string()),
            ),
            _ => Ok(()),
        }
    }
}
