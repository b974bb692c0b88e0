//! HTTP utilities - Common helper functions
//!
//! Filters that inject shared services into handlers and authenticate the
//! caller.

use crate::application::services::{MetricsService, VerificationService};
use crate::application::use_cases::HealthCheckUseCase;
use crate::infrastructure::adapters::{AuthenticatedUser, AuthenticationAdapter};
use crate::middleware::rate_limit::RateLimitMiddleware;
use crate::shared::logging::LoggingUtils;
use std::sync::Arc;
use warp::Filter;

/// Require a valid bearer token; failures reject with `AppError::Authentication`
pub fn with_authenticated_user(
    auth: Arc<AuthenticationAdapter>,
) -> impl Filter<Extract = (AuthenticatedUser,), Error = warp::Rejection> + Clone {
    warp::header::optional::<String>("authorization").and_then(move |header: Option<String>| {
        let auth = auth.clone();
        async move {
            auth.authenticate(header.as_deref()).map_err(|e| {
                LoggingUtils::log_security_event("authentication_failed", &e.to_string(), "anonymous");
                warp::reject::custom(e)
            })
        }
    })
}

/// Inject the verification service into route handlers
pub fn with_verification_service(
    service: Arc<VerificationService>,
) -> impl Filter<Extract = (Arc<VerificationService>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || service.clone())
}

/// Inject the per-user rate limiter into route handlers
pub fn with_rate_limiter(
    limiter: Arc<RateLimitMiddleware>,
) -> impl Filter<Extract = (Arc<RateLimitMiddleware>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || limiter.clone())
}

/// Inject the health use case into route handlers
pub fn with_health_use_case(
    health_use_case: Arc<HealthCheckUseCase>,
) -> impl Filter<Extract = (Arc<HealthCheckUseCase>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || health_use_case.clone())
}

/// Inject the metrics service into route handlers
pub fn with_metrics_service(
    metrics: Arc<MetricsService>,
) -> impl Filter<Extract = (Arc<MetricsService>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || metrics.clone())
}
