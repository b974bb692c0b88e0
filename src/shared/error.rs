//! Error handling module
//!
//! This module provides centralized error handling for the application.
//! Verification rejections travel as `AppError::Payment` so that every
//! layer can propagate them with `?` and the HTTP layer can still render
//! the structured `errorType` the client expects.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use warp::http::StatusCode;

/// Structured reason codes surfaced to clients as `errorType`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentErrorKind {
    DuplicateTransaction,
    NoEmailsFound,
    TxnidNotFound,
    AmountMismatch,
    MissingSenderAccount,
    MissingSenderInfo,
    MissingReceiverInfo,
    MissingRaastId,
    MissingTransactionTime,
    SenderAccountMismatch,
    ProductNotFound,
    UserNotFound,
    VerificationFailed,
}

impl PaymentErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentErrorKind::DuplicateTransaction => "DUPLICATE_TRANSACTION",
            PaymentErrorKind::NoEmailsFound => "NO_EMAILS_FOUND",
            PaymentErrorKind::TxnidNotFound => "TXNID_NOT_FOUND",
            PaymentErrorKind::AmountMismatch => "AMOUNT_MISMATCH",
            PaymentErrorKind::MissingSenderAccount => "MISSING_SENDER_ACCOUNT",
            PaymentErrorKind::MissingSenderInfo => "MISSING_SENDER_INFO",
            PaymentErrorKind::MissingReceiverInfo => "MISSING_RECEIVER_INFO",
            PaymentErrorKind::MissingRaastId => "MISSING_RAAST_ID",
            PaymentErrorKind::MissingTransactionTime => "MISSING_TRANSACTION_TIME",
            PaymentErrorKind::SenderAccountMismatch => "SENDER_ACCOUNT_MISMATCH",
            PaymentErrorKind::ProductNotFound => "PRODUCT_NOT_FOUND",
            PaymentErrorKind::UserNotFound => "USER_NOT_FOUND",
            PaymentErrorKind::VerificationFailed => "VERIFICATION_FAILED",
        }
    }

    /// Referential failures map to 404, everything else the client can fix is a 400
    pub fn http_status_code(&self) -> StatusCode {
        match self {
            PaymentErrorKind::ProductNotFound | PaymentErrorKind::UserNotFound => StatusCode::NOT_FOUND,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl std::fmt::Display for PaymentErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error types
#[derive(Error, Debug, Clone)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization error: {0}")]
    Json(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimit,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{message}")]
    Payment { kind: PaymentErrorKind, message: String },

    /// Storage-level uniqueness violation on a transaction identifier
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Mailbox search error: {0}")]
    Search(String),

    #[error("Mailbox search timed out after {seconds}s")]
    SearchTimeout { seconds: u64 },

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl AppError {
    /// Build a structured verification rejection
    pub fn payment(kind: PaymentErrorKind, message: impl Into<String>) -> Self {
        AppError::Payment { kind, message: message.into() }
    }

    /// Get HTTP status code for this error
    pub fn http_status_code(&self) -> StatusCode {
        match self {
            AppError::Payment { kind, .. } => kind.http_status_code(),
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Json(_) => StatusCode::BAD_REQUEST,
            AppError::Authentication(_) => StatusCode::UNAUTHORIZED,
            AppError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// `errorType` value reported to clients
    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::Payment { kind, .. } => kind.as_str(),
            AppError::Conflict(_) => PaymentErrorKind::DuplicateTransaction.as_str(),
            AppError::Validation(_) | AppError::Json(_) => "VALIDATION_ERROR",
            AppError::Authentication(_) => "UNAUTHORIZED",
            AppError::RateLimit => "RATE_LIMITED",
            AppError::NotFound(_) => "NOT_FOUND",
            _ => "SERVER_ERROR",
        }
    }

    /// Message safe to show to the caller; server faults never leak internals
    pub fn client_message(&self) -> String {
        match self {
            AppError::Payment { message, .. } => message.clone(),
            AppError::Conflict(_) => "This transaction ID has already been used".to_string(),
            AppError::Validation(msg) => msg.clone(),
            AppError::Json(_) => "Malformed request body".to_string(),
            AppError::Authentication(_) => "Authentication required".to_string(),
            AppError::RateLimit => "Too many verification attempts, please slow down".to_string(),
            AppError::NotFound(msg) => msg.clone(),
            AppError::SearchTimeout { .. } => {
                "Payment verification is temporarily unavailable, please try again".to_string()
            }
            _ => "Server error during payment verification".to_string(),
        }
    }

    /// True for rejections caused by an identifier that was already consumed
    pub fn is_already_used(&self) -> bool {
        matches!(
            self,
            AppError::Conflict(_)
                | AppError::Payment { kind: PaymentErrorKind::DuplicateTransaction, .. }
        )
    }

    /// True for faults the caller may retry without risk of a double grant
    pub fn is_server_fault(&self) -> bool {
        self.http_status_code().is_server_error()
    }
}

/// Application result type
pub type AppResult<T> = Result<T, AppError>;

impl warp::reject::Reject for AppError {}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Json(err.to_string())
    }
}

impl From<redis::RedisError> for AppError {
    fn from(err: redis::RedisError) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        AppError::Search(err.to_string())
    }
}
