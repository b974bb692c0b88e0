use anyhow::Context;
use tracing::{error, info};
use walletpay_verifier::{shared::logging::LoggingUtils, AppConfig, HttpServer};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Server error: {:#}", e);
        eprintln!("walletpay-verifier: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;
    LoggingUtils::initialize(&config.logging).context("Failed to initialize logging")?;
    info!("Configuration loaded successfully");

    let server = HttpServer::new(config)
        .await
        .context("Failed to initialize server")?;
    info!("Server starting on {}", server.config().server_address());

    server.run().await.context("HTTP server stopped")?;
    Ok(())
}
