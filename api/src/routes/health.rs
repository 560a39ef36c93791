use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::{Value, json};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/tools", get(list_tools))
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: String,
    pub version: String,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let config = state.dispatcher.config();
    Json(HealthResponse {
        status: "healthy",
        service: config.server_name.clone(),
        version: config.server_version.clone(),
    })
}

async fn root(State(state): State<AppState>) -> Json<Value> {
    let config = state.dispatcher.config();
    Json(json!({
        "status": "running",
        "service": config.server_name,
        "version": config.server_version,
        "protocol": "Model Context Protocol",
        "protocolVersions": jobtread_mcp_runtime::SUPPORTED_PROTOCOL_VERSIONS,
        "endpoints": ["/health", "/sse/", "/mcp", "/tools"],
        "description": "Construction data connector for JobTread"
    }))
}

/// Human-oriented summary of the catalog; `tools/list` is the authoritative form.
async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    let tools: Vec<Value> = state
        .dispatcher
        .registry()
        .iter()
        .map(|tool| {
            let parameters: serde_json::Map<String, Value> = tool.input_schema["properties"]
                .as_object()
                .map(|props| {
                    props
                        .iter()
                        .map(|(name, schema)| {
                            let kind = schema.get("type").cloned().unwrap_or(Value::Null);
                            (name.clone(), kind)
                        })
                        .collect()
                })
                .unwrap_or_default();
            json!({
                "name": tool.name,
                "description": tool.description,
                "parameters": parameters,
            })
        })
        .collect();
    Json(json!({ "tools": tools }))
}
