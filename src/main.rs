//! CLI entry point: stdio MCP server by default, streamable HTTP with
//! `--http <host:port>`

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use rmcp::{
    transport::streamable_http_server::session::local::LocalSessionManager,
    transport::{StreamableHttpServerConfig, StreamableHttpService},
    ServiceExt,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use autosphere_mcp::awx::{AwxClient, AwxConfig};
use autosphere_mcp::config::Config;
use autosphere_mcp::prometheus::{PrometheusClient, PrometheusConfig};
use autosphere_mcp::server::AutosphereServer;
use autosphere_mcp::services::{AutomationService, ObservabilityService, SimulatedHealth};

/// AWX operations can be slow; give the pooled client generous headroom.
const AWX_CLIENT_TIMEOUT: Duration = Duration::from_secs(120);

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("failed to install CTRL+C signal handler");
    info!("Shutdown signal received, stopping server...");
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    // Stdio mode keeps stderr quiet so protocol traffic stays clean;
    // HTTP mode logs at INFO, --debug raises everything to DEBUG.
    let log_level = if config.debug {
        Level::DEBUG
    } else if config.is_http_mode() {
        Level::INFO
    } else {
        Level::WARN
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let awx = Arc::new(AwxClient::new(AwxConfig {
        base_url: config.awx_url.clone(),
        username: config.awx_username.clone(),
        password: config.awx_password.clone(),
        token: config.awx_token.clone(),
        timeout: Some(AWX_CLIENT_TIMEOUT),
        debug: config.debug,
    })?);

    if config.has_awx_credentials() {
        match awx.test_connection().await {
            Ok(()) => info!("AWX connection test successful"),
            Err(e) => {
                warn!("AWX connection test failed: {e}");
                warn!("Server will still start, but AWX operations may fail");
            }
        }
    } else {
        warn!("No AWX credentials provided; use --awx-username/--awx-password or --awx-token");
    }

    let prometheus = match &config.prometheus_url {
        Some(url) => {
            info!("Prometheus client enabled: {url}");
            Some(Arc::new(PrometheusClient::new(PrometheusConfig {
                base_url: url.clone(),
                username: config.prometheus_username.clone(),
                password: config.prometheus_password.clone(),
                timeout: None,
                debug: config.debug,
            })?))
        }
        None => {
            info!("Prometheus client disabled (no --prometheus-url)");
            None
        }
    };

    let automation = Arc::new(AutomationService::new(
        awx.clone(),
        prometheus.clone(),
        Arc::new(SimulatedHealth),
    ));
    let observability = Arc::new(ObservabilityService::new(prometheus));
    let server = AutosphereServer::new(automation, observability, &config.awx_url);

    match &config.http {
        Some(addr) => serve_http(server, addr).await?,
        None => {
            let service = server.serve(rmcp::transport::stdio()).await?;
            service.waiting().await?;
        }
    }

    Ok(())
}

async fn serve_http(server: AutosphereServer, addr: &str) -> Result<()> {
    info!("Starting streamable HTTP server at {addr}");

    let mcp_service = StreamableHttpService::new(
        move || Ok(server.clone()),
        Arc::new(LocalSessionManager::default()),
        StreamableHttpServerConfig::default(),
    );

    // Browser-based clients need CORS to reach the MCP endpoint
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = axum::Router::new()
        .nest_service("/mcp", mcp_service)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("MCP endpoint: http://{addr}/mcp");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
