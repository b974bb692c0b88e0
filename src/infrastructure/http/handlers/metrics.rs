//! Metrics handler module
//!
//! This module contains the Prometheus endpoint handler for monitoring.

use crate::{
    application::services::MetricsService,
    infrastructure::http::responses::ResponseFormatter,
};
use std::sync::Arc;
use warp::Reply;

/// Handle Prometheus metrics requests
pub async fn handle_prometheus_request(
    metrics: Arc<MetricsService>,
) -> Result<warp::reply::Response, warp::reject::Rejection> {
    let response = match metrics.render() {
        Ok(text) => warp::reply::with_header(
            warp::reply::with_status(text, warp::http::StatusCode::OK),
            "Content-Type",
            "text/plain; version=0.0.4; charset=utf-8",
        )
        .into_response(),
        Err(e) => ResponseFormatter::from_app_error(&e).into_response(),
    };
    Ok(response)
}
