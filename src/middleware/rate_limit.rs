//! Per-user rate limiting for verification attempts

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultKeyedRateLimiter, Quota, RateLimiter};

use crate::config::app_config::RateLimitConfig;
use crate::shared::error::{AppError, AppResult};

/// Keyed limiter; each authenticated user gets an independent bucket
#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Option<Arc<DefaultKeyedRateLimiter<String>>>,
}

impl RateLimitMiddleware {
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { limiter: None };
        }

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let burst = NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_minute(per_minute).allow_burst(burst);

        Self { limiter: Some(Arc::new(RateLimiter::keyed(quota))) }
    }

    /// Take one cell from the caller's bucket
    pub fn check(&self, key: &str) -> AppResult<()> {
        match &self.limiter {
            Some(limiter) => limiter.check_key(&key.to_string()).map_err(|_| AppError::RateLimit),
            None => Ok(()),
        }
    }
}
