//! Route builder module
//!
//! This module contains the main route builder that orchestrates the creation
//! of all application routes and turns rejections into the JSON error body.

use crate::{
    application::{services::{MetricsService, VerificationService}, use_cases::HealthCheckUseCase},
    config::AppConfig,
    infrastructure::{
        adapters::AuthenticationAdapter,
        http::{
            models::ErrorResponse,
            responses::ResponseFormatter,
            routes::{HealthRoutes, MetricsRoutes, PaymentsRoutes},
        },
    },
    middleware::rate_limit::RateLimitMiddleware,
    shared::error::AppError,
};
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

/// Everything the route tree hands to its handlers
#[derive(Clone)]
pub struct RouteServices {
    pub verification: Arc<VerificationService>,
    pub metrics: Arc<MetricsService>,
    pub health: Arc<HealthCheckUseCase>,
    pub auth: Arc<AuthenticationAdapter>,
    pub rate_limiter: Arc<RateLimitMiddleware>,
}

/// Route builder that orchestrates the creation of all application routes
pub struct RouteBuilder;

impl RouteBuilder {
    /// Build all application routes
    pub fn build_routes(
        config: &AppConfig,
        services: RouteServices,
    ) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
        let payments = PaymentsRoutes::create_routes(
            config,
            services.verification,
            services.auth,
            services.rate_limiter,
        );
        let health = HealthRoutes::create_health_route(services.health);
        let metrics = MetricsRoutes::create_prometheus_route(services.metrics);

        payments
            .or(health)
            .or(metrics)
            .recover(handle_rejection)
    }
}

/// Map any rejection onto the `{success:false, message, errorType}` body
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    if let Some(app_error) = err.find::<AppError>() {
        return Ok(ResponseFormatter::from_app_error(app_error));
    }

    let (status, error_type, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "NOT_FOUND", "Not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", format!("Invalid request body: {}", e))
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "VALIDATION_ERROR", "Request body too large".to_string())
    } else if err.find::<warp::reject::UnsupportedMediaType>().is_some() {
        (StatusCode::UNSUPPORTED_MEDIA_TYPE, "VALIDATION_ERROR", "Expected a JSON body".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "NOT_FOUND", "Method not allowed".to_string())
    } else {
        tracing::error!(rejection = ?err, "Unhandled rejection");
        (StatusCode::INTERNAL_SERVER_ERROR, "SERVER_ERROR", "Internal server error".to_string())
    };

    let body = ErrorResponse {
        success: false,
        message,
        error_type: Some(error_type.to_string()),
        already_used: None,
    };
    Ok(warp::reply::with_status(warp::reply::json(&body), status))
}
