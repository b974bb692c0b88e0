//! Payments HTTP handlers

use std::sync::Arc;

use warp::Reply;

use crate::application::services::VerificationService;
use crate::infrastructure::adapters::AuthenticatedUser;
use crate::infrastructure::http::models::VerifyPaymentRequest;
use crate::infrastructure::http::responses::ResponseFormatter;
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::shared::logging::LoggingUtils;

/// `POST /payments/verify`
pub async fn handle_verify_payment(
    user: AuthenticatedUser,
    body: VerifyPaymentRequest,
    service: Arc<VerificationService>,
    rate_limiter: Arc<RateLimitMiddleware>,
) -> Result<impl Reply, warp::reject::Rejection> {
    if let Err(e) = rate_limiter.check(&user.user_id) {
        LoggingUtils::log_security_event("rate_limited", "verification attempts exceeded", &user.user_id);
        return Ok(ResponseFormatter::from_app_error(&e));
    }

    let claim = match body.into_claim(&user.user_id) {
        Ok(claim) => claim,
        Err(e) => return Ok(ResponseFormatter::from_app_error(&e)),
    };

    let response = match service.verify(claim).await {
        Ok(outcome) => ResponseFormatter::verified(outcome.transaction, outcome.message),
        Err(e) => ResponseFormatter::from_app_error(&e),
    };
    Ok(response)
}

/// `GET /payments/transaction/{txnId}`
pub async fn handle_transaction_details(
    txn_id: String,
    user: AuthenticatedUser,
    service: Arc<VerificationService>,
) -> Result<impl Reply, warp::reject::Rejection> {
    let response = match service.transaction_details(&txn_id, &user.user_id).await {
        Ok(details) => ResponseFormatter::ok(&details),
        Err(e) => ResponseFormatter::from_app_error(&e),
    };
    Ok(response)
}

/// `GET /payments/user-transactions`
pub async fn handle_user_transactions(
    user: AuthenticatedUser,
    service: Arc<VerificationService>,
) -> Result<impl Reply, warp::reject::Rejection> {
    let response = match service.user_transactions(&user.user_id).await {
        Ok(transactions) => ResponseFormatter::ok(&transactions),
        Err(e) => ResponseFormatter::from_app_error(&e),
    };
    Ok(response)
}
