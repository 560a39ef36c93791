use serde_json::Value;

use jobtread_mcp_runtime::{Dispatcher, EmissionMode, Reply};

use crate::util::print_json;

/// The `tools/list` result, exactly as an MCP client would receive it.
pub async fn catalog(dispatcher: &Dispatcher) -> Value {
    match super::request(dispatcher, "tools/list", Value::Null, EmissionMode::Aggregate).await {
        Reply::Message(response) => response["result"].clone(),
        Reply::Silent | Reply::Frames(_) => Value::Null,
    }
}

pub async fn run(dispatcher: &Dispatcher) -> i32 {
    print_json(&catalog(dispatcher).await);
    0
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Arc;

    use jobtread_mcp_runtime::Config;

    #[tokio::test]
    async fn catalog_lists_every_tool_in_order() {
        let dispatcher = Dispatcher::new(Arc::new(Config::default()), Arc::new(HashMap::<String, String>::new()))
            .expect("dispatcher should build");
        let catalog = catalog(&dispatcher).await;
        let names: Vec<&str> = catalog["tools"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["search", "fetch", "list"]);
    }
}
