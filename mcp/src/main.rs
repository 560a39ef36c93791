use clap::Parser;
use tracing_subscriber::EnvFilter;

use jobtread_mcp_runtime::{McpCommands, RuntimeArgs, run as run_mcp};

#[derive(Parser)]
#[command(
    name = "jobtread-mcp",
    version,
    about = "JobTread MCP server: construction data over stdio"
)]
struct Cli {
    #[command(flatten)]
    runtime: RuntimeArgs,

    #[command(subcommand)]
    command: McpCommands,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    // stdout carries protocol frames only
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let code = run_mcp(cli.runtime.into_config(), cli.command).await;
    std::process::exit(code);
}
