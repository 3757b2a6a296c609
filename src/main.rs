mod auth;
mod backend;
mod config;
mod protocol;
mod relay;
mod server;

#[cfg(test)]
mod test_support;

use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{error, info, warn};

use config::Config;
use relay::Relay;

#[tokio::main]
async fn main() {
    // A missing .env file is not an error.
    let _ = dotenvy::dotenv();

    let config = Config::parse();

    // Configure logging
    match config.log_format.as_str() {
        "json" => {
            tracing_subscriber::fmt().json().init();
        }
        _ => {
            tracing_subscriber::fmt().init();
        }
    }

    if config.watson_api_key.is_some() && std::env::var("WATSON_API_KEY").is_err() {
        warn!("Watson API key provided via command-line flag - use WATSON_API_KEY env var in production");
    }

    let relay_config = config.relay_config();

    info!(
        api_url = relay_config.api_url.as_deref().unwrap_or("not configured"),
        project_id = relay_config.project_id.as_deref().unwrap_or("not configured"),
        api_key = if relay_config.api_key.is_some() { "configured" } else { "missing" },
        model_id = %relay_config.model_id,
        "watsonx configuration"
    );

    if !relay_config.is_configured() || relay_config.api_url.is_none() {
        warn!("watsonx configuration is incomplete - queries will fail until WATSON_API_KEY, WATSON_API_URL and WATSON_PROJECT_ID are set");
    }

    // Shared HTTP client for IAM and watsonx calls
    let http_client = match reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(10)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "failed to build HTTP client");
            std::process::exit(1);
        }
    };

    let app = server::build_router(Relay::new(relay_config, http_client));

    let addr = config.listen_addr();
    let listener = TcpListener::bind(&addr).await.unwrap_or_else(|e| {
        error!(addr = addr, error = %e, "failed to bind");
        std::process::exit(1);
    });

    info!(addr = addr, "server starting");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap_or_else(|e| {
            error!(error = %e, "server error");
            std::process::exit(1);
        });

    info!("server stopped");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl+c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received SIGINT, shutting down"),
        _ = terminate => info!("received SIGTERM, shutting down"),
    }
}
