//! HTTP responses module
//!
//! This module contains HTTP response formatting and utilities.

use serde::Serialize;
use tracing::error;
use warp::http::StatusCode;
use warp::reply::{Json, WithStatus};

use crate::{
    infrastructure::http::models::{ErrorResponse, VerifyPaymentResponse},
    domain::payments::Transaction,
    shared::error::AppError,
};

/// Response formatter for HTTP responses
pub struct ResponseFormatter;

impl ResponseFormatter {
    /// Any serializable body with 200
    pub fn ok<T: Serialize>(body: &T) -> WithStatus<Json> {
        warp::reply::with_status(warp::reply::json(body), StatusCode::OK)
    }

    /// Successful verification
    pub fn verified(transaction: Transaction, message: String) -> WithStatus<Json> {
        let body = VerifyPaymentResponse { success: true, message, transaction };
        Self::ok(&body)
    }

    /// Structured error body; server faults are logged in full and reported generically
    pub fn from_app_error(error: &AppError) -> WithStatus<Json> {
        let status = error.http_status_code();
        if error.is_server_fault() {
            error!(error = %error, status = status.as_u16(), "Request failed");
        }
        warp::reply::with_status(warp::reply::json(&ErrorResponse::from(error)), status)
    }
}
