//! Payments routes

use std::sync::Arc;
use warp::Filter;

use crate::application::services::VerificationService;
use crate::config::AppConfig;
use crate::infrastructure::adapters::AuthenticationAdapter;
use crate::infrastructure::http::handlers::{handle_transaction_details, handle_user_transactions, handle_verify_payment};
use crate::infrastructure::http::utils::{with_authenticated_user, with_rate_limiter, with_verification_service};
use crate::middleware::rate_limit::RateLimitMiddleware;

pub struct PaymentsRoutes;

impl PaymentsRoutes {
    pub fn create_routes(
        config: &AppConfig,
        service: Arc<VerificationService>,
        auth: Arc<AuthenticationAdapter>,
        rate_limiter: Arc<RateLimitMiddleware>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        let verify = warp::path!("payments" / "verify")
            .and(warp::post())
            .and(with_authenticated_user(auth.clone()))
            .and(warp::body::content_length_limit(config.server.max_request_size as u64))
            .and(warp::body::json())
            .and(with_verification_service(service.clone()))
            .and(with_rate_limiter(rate_limiter))
            .and_then(handle_verify_payment);

        let details = warp::path!("payments" / "transaction" / String)
            .and(warp::get())
            .and(with_authenticated_user(auth.clone()))
            .and(with_verification_service(service.clone()))
            .and_then(handle_transaction_details);

        let user_transactions = warp::path!("payments" / "user-transactions")
            .and(warp::get())
            .and(with_authenticated_user(auth))
            .and(with_verification_service(service))
            .and_then(handle_user_transactions);

        verify.or(details).or(user_transactions)
    }
}
