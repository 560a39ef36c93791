use clap::Args;
use serde_json::{Value, json};
use thiserror::Error;

use jobtread_mcp_runtime::{Dispatcher, EmissionMode, Reply};

use crate::util::{exit_error, print_json};

#[derive(Args, Clone, Debug)]
pub struct CallArgs {
    /// Tool name (see `jobtread tools`)
    pub tool: String,
    /// Tool arguments as a JSON object
    #[arg(long, default_value = "{}")]
    pub args: String,
    /// Print each partial-result frame on its own line instead of one response
    #[arg(long)]
    pub stream: bool,
}

#[derive(Debug, Error)]
pub enum CallError {
    #[error("--args is not valid JSON: {0}")]
    InvalidArgs(#[source] serde_json::Error),
    #[error("RPC error {code}: {message}")]
    Rpc { code: i64, message: String },
}

/// Runs one tool call and returns every emitted message in order.
pub async fn call(dispatcher: &Dispatcher, args: &CallArgs) -> Result<Vec<Value>, CallError> {
    let arguments: Value = serde_json::from_str(&args.args).map_err(CallError::InvalidArgs)?;
    let mode = if args.stream {
        EmissionMode::Streaming
    } else {
        EmissionMode::Aggregate
    };
    let params = json!({ "name": args.tool, "arguments": arguments });

    match super::request(dispatcher, "tools/call", params, mode).await {
        Reply::Silent => Ok(Vec::new()),
        Reply::Message(response) => match response.get("error") {
            Some(error) => Err(CallError::Rpc {
                code: error["code"].as_i64().unwrap_or_default(),
                message: error["message"].as_str().unwrap_or_default().to_string(),
            }),
            None => Ok(vec![response]),
        },
        Reply::Frames(frames) => Ok(frames.collect_frames().await),
    }
}

pub async fn run(dispatcher: &Dispatcher, args: CallArgs) -> i32 {
    match call(dispatcher, &args).await {
        Ok(messages) => {
            for message in &messages {
                if args.stream {
                    println!("{message}");
                } else {
                    print_json(message);
                }
            }
            0
        }
        Err(CallError::InvalidArgs(err)) => exit_error(
            &format!("--args is not valid JSON: {err}"),
            Some("Pass a JSON object, e.g. --args '{\"query\":\"kitchen\"}'"),
        ),
        Err(err) => {
            tracing::warn!(event = "cli_call_failed", tool = %args.tool, error = %err);
            eprintln!("{err}");
            1
        }
    }
}
