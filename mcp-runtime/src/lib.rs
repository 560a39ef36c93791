//! Model Context Protocol runtime for the JobTread connector.
//!
//! Everything transport-independent lives here: protocol dispatch, the tool
//! catalog, upstream access with sample fallback and result streaming. The
//! HTTP host (`jobtread-api`), the stdio server (`jobtread-mcp`) and the CLI
//! are thin shells around [`Dispatcher`].

pub mod config;
pub mod credentials;
pub mod dispatcher;
pub mod error;
pub mod framing;
pub mod registry;
pub mod streamer;
pub mod tools;
pub mod upstream;

use std::sync::Arc;

use clap::{Args, Subcommand};
use serde_json::{Map, Value, json};
use tokio::io::{self, BufReader};

pub use config::{Config, RuntimeArgs};
pub use credentials::{EnvSource, ProcessEnv};
pub use dispatcher::{Dispatcher, LATEST_PROTOCOL_VERSION, Reply, SUPPORTED_PROTOCOL_VERSIONS, Session};
pub use registry::{RegistryError, ToolRegistry};
pub use streamer::EmissionMode;
pub use upstream::{Operation, ProbeReport, UpstreamAdapter};

#[derive(Subcommand)]
pub enum McpCommands {
    /// Serve MCP over stdio (Content-Length framed JSON-RPC)
    Serve(ServeArgs),
    /// Probe every upstream request strategy and report which one works
    Diagnose(DiagnoseArgs),
}

#[derive(Args, Clone, Debug)]
pub struct ServeArgs {
    /// Emit tool results as partial-result frames instead of one response
    #[arg(long, env = "JOBTREAD_MCP_STREAM")]
    pub stream: bool,
}

#[derive(Args, Clone, Debug)]
pub struct DiagnoseArgs {
    /// Operation to probe
    #[arg(long, value_enum, default_value_t = Operation::SearchJobs)]
    pub operation: Operation,
    /// Query used for search probes
    #[arg(long, default_value = "")]
    pub query: String,
    /// Item id used for getItem probes
    #[arg(long, default_value = "")]
    pub id: String,
    /// Result limit sent with search/list probes
    #[arg(long, default_value_t = 1)]
    pub limit: u64,
}

impl DiagnoseArgs {
    fn params(&self) -> Map<String, Value> {
        let mut params = Map::new();
        match self.operation {
            Operation::GetItem => {
                params.insert("id".into(), json!(self.id));
            }
            Operation::SearchJobs => {
                params.insert("query".into(), json!(self.query));
                params.insert("limit".into(), json!(self.limit));
            }
            Operation::ListJobs | Operation::ListCustomers => {
                params.insert("limit".into(), json!(self.limit));
            }
        }
        params
    }
}

/// Runs one MCP subcommand and returns the process exit code.
pub async fn run(config: Config, command: McpCommands) -> i32 {
    let config = Arc::new(config);
    match command {
        McpCommands::Serve(args) => {
            let mode = if args.stream {
                EmissionMode::Streaming
            } else {
                EmissionMode::Aggregate
            };
            let dispatcher = match Dispatcher::new(config, Arc::new(ProcessEnv)) {
                Ok(dispatcher) => dispatcher,
                Err(err) => {
                    tracing::error!(event = "tool_registry_invalid", error = %err);
                    return 1;
                }
            };
            let mut reader = BufReader::new(io::stdin());
            let mut stdout = io::stdout();
            tracing::info!(event = "stdio_server_started", stream = args.stream);
            match framing::serve(&dispatcher, mode, &mut reader, &mut stdout).await {
                Ok(()) => 0,
                Err(err) => {
                    let payload = json!({
                        "error": "mcp_server_error",
                        "message": err.to_string(),
                    });
                    eprintln!("{}", to_pretty_json(&payload));
                    1
                }
            }
        }
        McpCommands::Diagnose(args) => {
            let adapter = UpstreamAdapter::new(config, Arc::new(ProcessEnv));
            let report = adapter.probe(args.operation, &args.params()).await;
            println!("{}", to_pretty_json(&json!(report)));
            if report.selected.is_some() { 0 } else { 2 }
        }
    }
}

pub fn to_pretty_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
}
