use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use clap::Parser;
use jobtread_mcp_runtime::{Dispatcher, ProcessEnv, RuntimeArgs};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod error;
mod middleware;
mod routes;
mod state;

use error::ServerError;

#[derive(Parser, Debug)]
#[command(name = "jobtread-api", version, about = "JobTread MCP connector over HTTP")]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8080)]
    port: u16,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: IpAddr,

    #[command(flatten)]
    runtime: RuntimeArgs,
}

#[tokio::main]
async fn main() {
    // Load .env if present (dev only)
    let _ = dotenvy::dotenv();

    // Structured JSON logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jobtread_api=debug,jobtread_mcp_runtime=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    let cli = Cli::parse();
    if let Err(err) = serve(cli).await {
        tracing::error!(event = "server_failed", error = %err);
        std::process::exit(1);
    }
}

async fn serve(cli: Cli) -> Result<(), ServerError> {
    let config = Arc::new(cli.runtime.into_config());
    tracing::info!(
        event = "server_config",
        upstream_url = %config.upstream_url,
        grant_key_vars = ?config.grant_key_vars,
        organization_id_vars = ?config.organization_id_vars,
        frame_interval_ms = config.frame_interval.as_millis() as u64,
    );

    let dispatcher = Dispatcher::new(config, Arc::new(ProcessEnv))?;
    let app = routes::app(state::AppState::new(dispatcher));

    let addr = SocketAddr::new(cli.host, cli.port);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    tracing::info!("JobTread MCP server listening on {}", addr);

    axum::serve(listener, app).await.map_err(ServerError::Serve)
}
