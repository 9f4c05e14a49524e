use std::net::SocketAddr;
use std::sync::Arc;

use api_server::http::{AppState, build_router};
use prompt_gateway::config::{ApiConfig, load_dotenv};
use prompt_gateway::llm::Gateway;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    if let Err(err) = load_dotenv() {
        eprintln!("{err}");
        std::process::exit(1);
    }

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| {
            "api_server=info,prompt_gateway=info,axum=info".to_string()
        }))
        .json()
        .flatten_event(true)
        .with_current_span(true)
        .init();

    let config = match ApiConfig::from_env() {
        Ok(config) => config,
        Err(err) => {
            error!(error = %err, "failed to load api server config");
            std::process::exit(1);
        }
    };

    let gateway = match Gateway::from_config(&config.gateway) {
        Ok(gateway) => gateway,
        Err(err) => {
            error!(error = %err, "failed to initialize prompt gateway");
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = match config.bind_addr.parse() {
        Ok(addr) => addr,
        Err(err) => {
            error!(bind_addr = %config.bind_addr, error = %err, "invalid API_BIND_ADDR");
            std::process::exit(1);
        }
    };

    let shutdown = CancellationToken::new();
    let app = build_router(AppState {
        gateway: Arc::new(gateway),
        shutdown: shutdown.clone(),
    });

    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            error!(%addr, error = %err, "failed to bind api server listener");
            std::process::exit(1);
        }
    };

    info!(
        "api server listening on {}",
        listener.local_addr().unwrap_or(addr)
    );
    if let Err(err) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
    {
        error!(error = %err, "api server stopped with error");
        std::process::exit(1);
    }
}

/// In-flight provider calls are cancelled once the process is asked to stop.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
    shutdown.cancel();
}
