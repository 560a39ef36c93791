pub mod call;
pub mod tools;

use serde_json::{Value, json};

use jobtread_mcp_runtime::{Dispatcher, EmissionMode, Reply, Session};

/// Sends one request envelope through the dispatcher the same way a client would.
pub(crate) async fn request(
    dispatcher: &Dispatcher,
    method: &str,
    params: Value,
    mode: EmissionMode,
) -> Reply {
    let envelope = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": method,
        "params": params,
    });
    dispatcher
        .handle_value(&mut Session::default(), envelope, mode)
        .await
}
