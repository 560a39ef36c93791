use std::sync::Arc;

use clap::{Parser, Subcommand};
use jobtread_mcp_runtime::{Config, DiagnoseArgs, Dispatcher, McpCommands, ProcessEnv, RuntimeArgs, ServeArgs};
use tracing_subscriber::EnvFilter;

mod commands;
mod util;

#[derive(Parser)]
#[command(
    name = "jobtread",
    version,
    about = "JobTread connector CLI: inspect tools, call them, and probe the upstream API"
)]
struct Cli {
    #[command(flatten)]
    runtime: RuntimeArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tool catalog as served by tools/list
    Tools,
    /// Call one tool locally and print its result
    Call(commands::call::CallArgs),
    /// Probe every upstream request strategy with the configured credentials
    Diagnose(DiagnoseArgs),
    /// Serve MCP over stdio
    Serve(ServeArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.runtime.into_config();

    let code = match cli.command {
        Commands::Tools => commands::tools::run(&local_dispatcher(config)).await,
        Commands::Call(args) => commands::call::run(&local_dispatcher(config), args).await,
        Commands::Diagnose(args) => jobtread_mcp_runtime::run(config, McpCommands::Diagnose(args)).await,
        Commands::Serve(args) => jobtread_mcp_runtime::run(config, McpCommands::Serve(args)).await,
    };

    std::process::exit(code);
}

fn local_dispatcher(config: Config) -> Dispatcher {
    Dispatcher::new(Arc::new(config), Arc::new(ProcessEnv))
        .unwrap_or_else(|err| util::exit_error(&err.to_string(), None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn call_parses_tool_and_json_args() {
        let cli = Cli::try_parse_from(["jobtread", "call", "search", "--args", r#"{"query":"deck"}"#])
            .expect("call should parse");
        let Commands::Call(args) = cli.command else {
            panic!("expected call");
        };
        assert_eq!(args.tool, "search");
        assert!(!args.stream);
    }

    #[test]
    fn runtime_flags_apply_before_subcommand() {
        let cli = Cli::try_parse_from([
            "jobtread",
            "--upstream-url",
            "http://127.0.0.1:9",
            "diagnose",
            "--operation",
            "list-customers",
        ])
        .expect("diagnose should parse");
        assert_eq!(cli.runtime.into_config().upstream_url, "http://127.0.0.1:9");
        assert!(matches!(cli.command, Commands::Diagnose(_)));
    }

    #[test]
    fn unknown_operation_is_rejected() {
        assert!(Cli::try_parse_from(["jobtread", "diagnose", "--operation", "delete-everything"]).is_err());
    }
}
