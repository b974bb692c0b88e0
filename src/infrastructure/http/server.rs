//! HTTP server implementation for reverse proxy deployment
//!
//! Wires configuration into adapters, services and the route tree. TLS and
//! CORS are expected to be handled by the reverse proxy in front.

use crate::{
    application::{
        services::{LoggingReceiptRenderer, MetricsService, ReceiptQueue, VerificationService},
        use_cases::HealthCheckUseCase,
    },
    config::{AppConfig, EmailProvider},
    infrastructure::{
        adapters::{
            AuthenticationAdapter, CatalogDirectory, EmailSearch, GmailSearchAdapter, PurchaseGrantStore,
            SyntheticSearchAdapter,
        },
        http::routes::{RouteBuilder, RouteServices},
    },
    middleware::rate_limit::RateLimitMiddleware,
    shared::error::{AppError, AppResult},
};
use redis::{aio::ConnectionManager, Client};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, instrument, warn};
use warp::{Filter, Reply};

/// HTTP server implementation optimized for reverse proxy deployment
pub struct HttpServer {
    config: AppConfig,
    services: RouteServices,
    receipt_worker: Option<JoinHandle<()>>,
}

/// How long shutdown waits for queued receipts
const RECEIPT_DRAIN_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpServer {
    /// Create the server with the mailbox and store the configuration selects
    pub async fn new(config: AppConfig) -> AppResult<Self> {
        let search: Arc<dyn EmailSearch> = match config.email.provider {
            EmailProvider::Gmail => Arc::new(GmailSearchAdapter::new(config.email.gmail.clone())?),
            EmailProvider::Synthetic => {
                warn!("Using the synthetic mailbox; every claimed payment will be accepted");
                Arc::new(SyntheticSearchAdapter::new())
            }
        };

        let redis = match &config.storage.redis_url {
            Some(url) => Some(Arc::new(Self::create_redis_manager(url).await?)),
            None => {
                warn!("No Redis URL configured; grants are kept in memory only");
                None
            }
        };
        let store = Arc::new(PurchaseGrantStore::new(redis, config.storage.key_prefix.clone()));

        Self::with_adapters(config, search, store)
    }

    /// Create the server around explicit adapters
    pub fn with_adapters(
        config: AppConfig,
        search: Arc<dyn EmailSearch>,
        store: Arc<PurchaseGrantStore>,
    ) -> AppResult<Self> {
        let metrics = Arc::new(MetricsService::new()?);
        let catalog = Arc::new(CatalogDirectory::from_config(&config.catalog));
        let (receipts, receipt_worker) = ReceiptQueue::start(&config.receipts, Arc::new(LoggingReceiptRenderer));

        let health = Arc::new(HealthCheckUseCase::new(store.clone(), search.name()));
        let verification = Arc::new(VerificationService::new(
            &config,
            search,
            store,
            catalog,
            receipts,
            metrics.clone(),
        )?);

        let services = RouteServices {
            verification,
            metrics,
            health,
            auth: Arc::new(AuthenticationAdapter::new(config.security.jwt.clone())),
            rate_limiter: Arc::new(RateLimitMiddleware::new(&config.rate_limit)),
        };

        Ok(Self { config, services, receipt_worker })
    }

    async fn create_redis_manager(redis_url: &str) -> AppResult<ConnectionManager> {
        let client = Client::open(redis_url)
            .map_err(|e| AppError::Storage(format!("Failed to create Redis client: {}", e)))?;

        let manager = ConnectionManager::new(client)
            .await
            .map_err(|e| AppError::Storage(format!("Failed to create Redis connection manager: {}", e)))?;

        info!("Connected to Redis grant store");
        Ok(manager)
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Run the HTTP server
    #[instrument(skip(self))]
    pub async fn run(self) -> AppResult<()> {
        let addr: std::net::SocketAddr = self
            .config
            .server_address()
            .parse()
            .map_err(|e| AppError::Config(format!("Invalid server address: {}", e)))?;

        info!(mailbox = self.services.verification.search_adapter_name(), "Starting HTTP server on {}", addr);
        warp::serve(self.routes())
            .bind(addr)
            .await
            .graceful(shutdown_signal())
            .run()
            .await;

        info!("HTTP server stopped, draining receipt queue");
        let Self { services, receipt_worker, .. } = self;
        drop(services);
        if let Some(worker) = receipt_worker {
            match tokio::time::timeout(RECEIPT_DRAIN_TIMEOUT, worker).await {
                Ok(Ok(())) => info!("Receipt queue drained"),
                Ok(Err(e)) => error!(error = %e, "Receipt worker panicked"),
                Err(_) => warn!("Receipt queue still busy at shutdown"),
            }
        }

        Ok(())
    }

    /// Whether a receipt worker is running behind this server
    pub fn has_receipt_worker(&self) -> bool {
        self.receipt_worker.as_ref().is_some_and(|worker| !worker.is_finished())
    }

    /// The complete route tree
    pub fn routes(&self) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
        RouteBuilder::build_routes(&self.config, self.services.clone())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for the shutdown signal");
        std::future::pending::<()>().await;
    }
}
