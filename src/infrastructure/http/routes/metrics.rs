//! Metrics routes module
//!
//! This module contains the Prometheus exposition route.

use crate::{
    application::services::MetricsService,
    infrastructure::http::{handlers::handle_prometheus_request, utils::with_metrics_service},
};
use std::sync::Arc;
use warp::Filter;

/// Metrics routes configuration
pub struct MetricsRoutes;

impl MetricsRoutes {
    /// Create the Prometheus metrics endpoint route
    pub fn create_prometheus_route(
        metrics: Arc<MetricsService>,
    ) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
        warp::path("metrics")
            .and(warp::path::end())
            .and(warp::get())
            .and(with_metrics_service(metrics))
            .and_then(handle_prometheus_request)
    }
}
