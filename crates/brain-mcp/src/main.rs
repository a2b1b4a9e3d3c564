//! Brain MCP Server - WorldQuant Brain simulations via Model Context Protocol
//!
//! Credentials are read from `WORLDQUANT_EMAIL` and `WORLDQUANT_PASSWORD`.
//!
//! # Usage
//!
//! ## stdio transport (for Claude Desktop, local use)
//! ```bash
//! brain-mcp-server
//! brain-mcp-server --config brain.toml
//! ```
//!
//! ## HTTP transport (for remote hosting)
//! ```bash
//! brain-mcp-server --http --port 8080
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use brain_client::{BrainConfig, Credentials, SimulationClient};
use brain_mcp::server::BrainMcpServer;

/// Brain MCP Server - WorldQuant Brain alpha simulations
#[derive(Parser, Debug)]
#[command(name = "brain-mcp-server")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// TOML configuration file (base URL, timeouts, retry and polling policy)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Use HTTP transport instead of stdio (for remote hosting)
    #[arg(long)]
    http: bool,

    /// HTTP port (only used with --http)
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// HTTP host to bind to (only used with --http)
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = if args.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("brain_mcp=debug,brain_client=debug,rmcp=debug"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("brain_mcp=info,brain_client=info,rmcp=warn"))
    };

    // Only log to stderr for stdio transport to avoid corrupting the protocol
    if args.http {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }

    let config = match &args.config {
        Some(path) => {
            tracing::info!("Loading configuration from {}", path.display());
            BrainConfig::from_file(path)?
        }
        None => BrainConfig::default(),
    };
    let credentials = Credentials::from_env()
        .context("WorldQuant Brain credentials are required to start the server")?;

    let client = Arc::new(SimulationClient::from_config(&config, credentials)?);
    tracing::info!("WorldQuant Brain API client initialized ({})", config.base_url);

    if args.http {
        run_http_server(client, &args.host, args.port).await
    } else {
        run_stdio_server(BrainMcpServer::new(client)).await
    }
}

/// Run the server with stdio transport (for Claude Desktop)
async fn run_stdio_server(server: BrainMcpServer) -> anyhow::Result<()> {
    use rmcp::{transport::stdio, ServiceExt};

    tracing::info!("Using stdio transport");

    let service = server.serve(stdio()).await?;

    tracing::info!("Brain MCP Server ready");
    tracing::info!(
        "Available tools: submit_alpha, get_alpha, list_alphas, get_simulation, \
         get_simulation_status, check_expression"
    );

    service.waiting().await?;

    Ok(())
}

/// Run the server with HTTP transport (for remote hosting)
#[cfg(feature = "http")]
async fn run_http_server(
    client: Arc<SimulationClient>,
    host: &str,
    port: u16,
) -> anyhow::Result<()> {
    use axum::Router;
    use rmcp::transport::streamable_http_server::{
        session::local::LocalSessionManager, StreamableHttpService,
    };
    use tower_http::cors::{Any, CorsLayer};

    tracing::info!("Using HTTP transport on {}:{}", host, port);

    // Every MCP session shares the one client and its login session
    let mcp_service = StreamableHttpService::new(
        move || Ok(BrainMcpServer::new(client.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    // Configure CORS for browser clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let router = Router::new()
        .nest_service("/mcp", mcp_service)
        .route("/health", axum::routing::get(health_check))
        .layer(cors);

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Brain MCP Server listening on http://{}/mcp", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_err() {
                tracing::warn!("Failed to install CTRL+C handler");
                std::future::pending::<()>().await;
            }
            tracing::info!("Shutting down...");
        })
        .await?;

    Ok(())
}

/// Health check endpoint for HTTP transport
#[cfg(feature = "http")]
async fn health_check() -> &'static str {
    "OK"
}

/// Fallback when HTTP feature is not enabled
#[cfg(not(feature = "http"))]
async fn run_http_server(
    _client: Arc<SimulationClient>,
    _host: &str,
    _port: u16,
) -> anyhow::Result<()> {
    anyhow::bail!("HTTP transport not available. Rebuild with: cargo build --features http")
}
