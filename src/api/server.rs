use std::net::SocketAddr;

use axum::Router;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::errors::{Error, Result};

use super::routes::{build_router, ApiState};

pub async fn start_api_server(config: &ServerConfig, state: ApiState) -> Result<()> {
    let addr: SocketAddr = config
        .bind_address()
        .parse()
        .map_err(|e| Error::config(format!("Invalid API address: {}", e)))?;

    let router: Router = build_router(state, config.enable_cors);

    let listener = TcpListener::bind(addr).await.map_err(|e| Error::Io {
        source: e,
        context: format!("Failed to bind API server to {}", addr),
    })?;

    info!(address = %addr, cors = config.enable_cors, "Starting HTTP API server");
    run_http_server(listener, router).await?;

    info!("API server shutdown completed");
    Ok(())
}

async fn run_http_server(listener: TcpListener, router: Router) -> Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "API server shutdown listener failed");
            }
        })
        .await
        .map_err(|e| Error::Io { source: e, context: "API server error".to_string() })
}
