//! Health check handler module
//!
//! This module contains the health check endpoint handler for monitoring system status.

use crate::{
    application::use_cases::HealthCheckUseCase,
    infrastructure::http::responses::ResponseFormatter,
};
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Reply;

/// Handle health check requests
pub async fn handle_health_request(
    health_use_case: Arc<HealthCheckUseCase>,
) -> Result<impl Reply, warp::reject::Rejection> {
    let response = match health_use_case.execute().await {
        Ok(health) => {
            let status = StatusCode::from_u16(health.http_status_code()).unwrap_or(StatusCode::OK);
            warp::reply::with_status(warp::reply::json(&health), status)
        }
        Err(e) => ResponseFormatter::from_app_error(&e),
    };
    Ok(response)
}
