//! HTTP models - Infrastructure concerns
//!
//! Wire shapes for the payments API. Domain types are built from these only
//! after validation.

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::domain::payments::{PaymentClaim, PaymentMethod, Transaction};
use crate::shared::error::{AppError, AppResult};

/// Body of `POST /payments/verify`
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPaymentRequest {
    /// Payment method name, matched case-insensitively
    #[validate(length(min = 1, max = 32))]
    pub method: String,

    #[validate(length(min = 1, max = 128))]
    pub txn_id: String,

    #[validate(length(min = 1, max = 128))]
    pub product_id: String,

    #[serde(default)]
    #[validate(length(max = 128))]
    pub sender_name: Option<String>,

    #[serde(default)]
    #[validate(range(min = 0.0))]
    pub sender_amount: Option<f64>,
}

impl VerifyPaymentRequest {
    /// Validate and attribute the claim to the authenticated user
    pub fn into_claim(self, user_id: &str) -> AppResult<PaymentClaim> {
        self.validate()
            .map_err(|e| AppError::Validation(format!("Invalid request: {}", e)))?;
        let method: PaymentMethod = self.method.parse().map_err(AppError::Validation)?;
        if self.txn_id.trim().is_empty() {
            return Err(AppError::Validation("Transaction ID is required".to_string()));
        }

        Ok(PaymentClaim {
            method,
            claimed_txn_id: self.txn_id,
            product_id: self.product_id,
            user_id: user_id.to_string(),
            sender_name: self.sender_name,
            sender_amount: self.sender_amount,
        })
    }
}

/// Successful verification body
#[derive(Debug, Clone, Serialize)]
pub struct VerifyPaymentResponse {
    pub success: bool,
    pub message: String,
    pub transaction: Transaction,
}

/// Error body shared by every payments endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub already_used: Option<bool>,
}

impl From<&AppError> for ErrorResponse {
    fn from(error: &AppError) -> Self {
        Self {
            success: false,
            message: error.client_message(),
            error_type: Some(error.error_type().to_string()),
            already_used: error.is_already_used().then_some(true),
        }
    }
}
