//! Application configuration structures
//!
//! This module contains the main configuration structures for the application.

use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use validator::Validate;

use crate::domain::payments::{PaymentMethod, Product, User};

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Server address to bind to
    pub bind_address: IpAddr,

    /// Server port
    #[validate(range(min = 1, max = 65535))]
    pub port: u16,

    /// Maximum request size in bytes
    #[validate(range(min = 1024, max = 10485760))] // 1KB to 10MB
    pub max_request_size: usize,
}

/// JWT configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct JwtConfig {
    /// JWT secret key
    #[validate(length(min = 32))]
    pub secret_key: String,

    /// JWT issuer
    #[validate(length(min = 1))]
    pub issuer: String,

    /// JWT audience
    #[validate(length(min = 1))]
    pub audience: String,
}

/// Security configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SecurityConfig {
    #[validate(nested)]
    pub jwt: JwtConfig,

    /// Development mode - enables the synthetic mailbox
    pub development_mode: bool,
}

/// Rate limiting configuration for the verify endpoint, keyed per user
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitConfig {
    /// Verification attempts per minute per user
    #[validate(range(min = 1, max = 10000))]
    pub requests_per_minute: u32,

    /// Burst size
    #[validate(range(min = 1, max = 1000))]
    pub burst_size: u32,

    /// Enable rate limiting
    pub enabled: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoggingConfig {
    /// Log level, overridden by RUST_LOG
    #[validate(length(min = 1))]
    pub level: String,

    /// "full" or "compact"
    #[validate(length(min = 1))]
    pub format: String,
}

/// Durable storage configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StorageConfig {
    /// Redis connection URL; the in-process store is used when unset
    pub redis_url: Option<String>,

    /// Prefix for every key this service writes
    #[validate(length(min = 1, max = 64))]
    pub key_prefix: String,
}

/// Which mailbox implementation backs the email search adapter
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EmailProvider {
    Gmail,
    /// Fabricated confirmations, development only
    Synthetic,
}

/// Gmail API mailbox credentials and limits
#[derive(Clone, Serialize, Deserialize, Validate)]
pub struct GmailConfig {
    #[validate(url)]
    pub api_base_url: String,

    #[validate(url)]
    pub token_url: String,

    /// Mailbox owner, "me" for the authorized account
    #[validate(length(min = 1))]
    pub user_id: String,

    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,

    /// Upper bound on messages fetched per search
    #[validate(range(min = 1, max = 100))]
    pub max_results: u32,

    /// Transport timeout per provider call (seconds)
    #[validate(range(min = 1, max = 120))]
    pub timeout_seconds: u64,
}

impl std::fmt::Debug for GmailConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GmailConfig")
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("user_id", &self.user_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("max_results", &self.max_results)
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Email search configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmailConfig {
    pub provider: EmailProvider,

    /// First-pass lookback window in days
    #[validate(range(min = 1, max = 90))]
    pub default_days_back: u32,

    /// Lookback used for the single retry after an empty first pass
    #[validate(range(min = 1, max = 180))]
    pub widened_days_back: u32,

    /// Method whose search hints are used for the widened retry
    pub fallback_method: PaymentMethod,

    #[validate(nested)]
    pub gmail: GmailConfig,
}

/// Verification engine tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VerificationConfig {
    /// Request-level bound on the whole search step (seconds)
    #[validate(range(min = 1, max = 300))]
    pub search_timeout_seconds: u64,

    /// Account title peer transfers must be received by, when set
    pub merchant_receiver_name: Option<String>,
}

/// Post-purchase download link configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DownloadsConfig {
    /// Base URL the token is appended to as a path segment
    #[validate(url)]
    pub base_url: String,

    /// Random bytes per token before hex encoding
    #[validate(range(min = 16, max = 64))]
    pub token_bytes: usize,
}

/// Background receipt queue configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ReceiptsConfig {
    pub enabled: bool,

    #[validate(range(min = 1, max = 100000))]
    pub queue_capacity: usize,

    #[validate(range(min = 1, max = 20))]
    pub max_attempts: u32,

    #[validate(range(min = 10, max = 60000))]
    pub retry_backoff_ms: u64,
}

/// Products and users the verification engine can resolve
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogConfig {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub users: Vec<User>,
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub security: SecurityConfig,
    pub rate_limit: RateLimitConfig,
    pub logging: LoggingConfig,
    pub storage: StorageConfig,
    pub email: EmailConfig,
    pub verification: VerificationConfig,
    pub downloads: DownloadsConfig,
    pub receipts: ReceiptsConfig,
    pub catalog: CatalogConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: IpAddr::V4(Ipv4Addr::LOCALHOST),
                port: 8080,
                max_request_size: 64 * 1024,
            },
            security: SecurityConfig {
                jwt: JwtConfig {
                    secret_key: "change-me-this-secret-must-be-at-least-32-chars".to_string(),
                    issuer: "walletpay-auth".to_string(),
                    audience: "walletpay-store".to_string(),
                },
                development_mode: false,
            },
            rate_limit: RateLimitConfig {
                requests_per_minute: 20,
                burst_size: 5,
                enabled: true,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "full".to_string(),
            },
            storage: StorageConfig {
                redis_url: None,
                key_prefix: "walletpay".to_string(),
            },
            email: EmailConfig::default(),
            verification: VerificationConfig {
                search_timeout_seconds: 30,
                merchant_receiver_name: None,
            },
            downloads: DownloadsConfig {
                base_url: "http://127.0.0.1:8080/downloads".to_string(),
                token_bytes: 32,
            },
            receipts: ReceiptsConfig {
                enabled: true,
                queue_capacity: 256,
                max_attempts: 5,
                retry_backoff_ms: 500,
            },
            catalog: CatalogConfig::default(),
        }
    }
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            provider: EmailProvider::Gmail,
            default_days_back: 7,
            widened_days_back: 14,
            fallback_method: PaymentMethod::NayaPay,
            gmail: GmailConfig {
                api_base_url: "https://gmail.googleapis.com/gmail/v1".to_string(),
                token_url: "https://oauth2.googleapis.com/token".to_string(),
                user_id: "me".to_string(),
                client_id: String::new(),
                client_secret: String::new(),
                refresh_token: String::new(),
                max_results: 20,
                timeout_seconds: 15,
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> crate::Result<Self> {
        let defaults = config::Config::try_from(&AppConfig::default())?;
        let config = config::Config::builder()
            .add_source(defaults)
            .add_source(config::File::with_name("Conf").required(false))
            .add_source(config::Environment::with_prefix("WALLETPAY").separator("__"))
            .build()
            .map_err(|e| crate::shared::error::AppError::Config(format!("Failed to build configuration: {}", e)))?;

        let config: AppConfig = config
            .try_deserialize()
            .map_err(|e| crate::shared::error::AppError::Config(format!("Failed to deserialize configuration: {}", e)))?;

        config
            .validate_config()
            .map_err(|e| crate::shared::error::AppError::Validation(format!("Configuration validation failed: {}", e)))?;
        crate::config::ConfigValidator::validate_config(&config)?;

        Ok(config)
    }

    /// Validate every section's declarative rules
    pub fn validate_config(&self) -> Result<(), validator::ValidationErrors> {
        self.server.validate()?;
        self.security.validate()?;
        self.rate_limit.validate()?;
        self.logging.validate()?;
        self.storage.validate()?;
        self.email.validate()?;
        self.verification.validate()?;
        self.downloads.validate()?;
        self.receipts.validate()?;
        Ok(())
    }

    /// Get server address as string
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.bind_address, self.server.port)
    }
}
