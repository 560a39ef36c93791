//! JSON-RPC method routing for the MCP surface.
//!
//! Transports own the [`Session`]: the HTTP host creates a fresh one per
//! request, the stdio server keeps one for its whole lifetime. Tool calls
//! are served whether or not `initialize` was seen first.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value, json};

use crate::config::Config;
use crate::credentials::EnvSource;
use crate::error::{ProtocolError, error_response, success_response};
use crate::registry::{RegistryError, ToolRegistry};
use crate::streamer::{EmissionMode, FrameStream, Pacing, ResultStreamer};
use crate::tools::{self, ToolError};
use crate::upstream::UpstreamAdapter;

pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2024-11-05", "2025-03-26", "2025-06-18"];
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    jsonrpc: Option<String>,
    /// `Some(Value::Null)` for an explicit `"id": null`, `None` when absent.
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,
    method: Option<String>,
    #[serde(default)]
    params: Value,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RpcMethod {
    Initialize,
    Initialized,
    Ping,
    ToolsList,
    ToolsCall,
    Unknown(String),
}

impl From<&str> for RpcMethod {
    fn from(method: &str) -> Self {
        match method {
            "initialize" => RpcMethod::Initialize,
            "notifications/initialized" => RpcMethod::Initialized,
            "ping" => RpcMethod::Ping,
            "tools/list" => RpcMethod::ToolsList,
            "tools/call" => RpcMethod::ToolsCall,
            other => RpcMethod::Unknown(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Uninitialized,
    Initialized,
}

#[derive(Clone, Debug, Default)]
pub struct Session {
    state: SessionState,
    protocol_version: Option<String>,
    client_ready: bool,
}

impl Session {
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Negotiated version, or the latest supported one when none was negotiated.
    pub fn protocol_version(&self) -> &str {
        self.protocol_version
            .as_deref()
            .unwrap_or(LATEST_PROTOCOL_VERSION)
    }

    pub fn client_ready(&self) -> bool {
        self.client_ready
    }
}

/// What a transport should send back for one inbound envelope.
#[derive(Debug)]
pub enum Reply {
    /// Notification: nothing at all goes on the wire.
    Silent,
    Message(Value),
    Frames(FrameStream),
}

pub struct Dispatcher {
    config: Arc<Config>,
    registry: ToolRegistry,
    adapter: UpstreamAdapter,
    streamer: ResultStreamer,
}

impl Dispatcher {
    pub fn new(config: Arc<Config>, env: Arc<dyn EnvSource>) -> Result<Self, RegistryError> {
        let registry = ToolRegistry::standard()?;
        let adapter = UpstreamAdapter::new(config.clone(), env);
        Ok(Self::with_parts(config, registry, adapter))
    }

    pub fn with_parts(config: Arc<Config>, registry: ToolRegistry, adapter: UpstreamAdapter) -> Self {
        let streamer = ResultStreamer::new(Pacing::from_interval(config.frame_interval));
        Self {
            config,
            registry,
            adapter,
            streamer,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn adapter(&self) -> &UpstreamAdapter {
        &self.adapter
    }

    pub async fn handle_bytes(&self, session: &mut Session, raw: &[u8], mode: EmissionMode) -> Reply {
        match serde_json::from_slice::<Value>(raw) {
            Ok(incoming) => self.handle_value(session, incoming, mode).await,
            Err(err) => {
                tracing::warn!(event = "rpc_parse_error", error = %err, "Rejected undecodable RPC body");
                Reply::Message(error_response(Value::Null, &ProtocolError::Parse))
            }
        }
    }

    pub async fn handle_value(&self, session: &mut Session, incoming: Value, mode: EmissionMode) -> Reply {
        if incoming.is_array() {
            return Reply::Message(error_response(
                Value::Null,
                &ProtocolError::InvalidRequest("batch requests are not supported".into()),
            ));
        }
        if !incoming.is_object() {
            return Reply::Message(error_response(
                Value::Null,
                &ProtocolError::InvalidRequest("request must be a JSON object".into()),
            ));
        }

        let envelope: RpcEnvelope = match serde_json::from_value(incoming) {
            Ok(envelope) => envelope,
            Err(err) => {
                return Reply::Message(error_response(
                    Value::Null,
                    &ProtocolError::InvalidRequest(err.to_string()),
                ));
            }
        };

        if envelope.jsonrpc.as_deref() != Some("2.0") {
            let Some(id) = envelope.id else {
                tracing::debug!(
                    event = "rpc_invalid_notification_dropped",
                    jsonrpc = ?envelope.jsonrpc,
                    "Dropped notification with wrong jsonrpc version"
                );
                return Reply::Silent;
            };
            return Reply::Message(error_response(
                id,
                &ProtocolError::InvalidRequest("jsonrpc must be '2.0'".into()),
            ));
        }

        let Some(method) = envelope.method.as_deref() else {
            // A client response; this server never issues requests of its own.
            return Reply::Silent;
        };
        let method = RpcMethod::from(method);
        tracing::debug!(event = "rpc_request", method = ?method, notification = envelope.id.is_none());

        if method == RpcMethod::Initialized {
            session.client_ready = true;
            return Reply::Silent;
        }

        let Some(id) = envelope.id else {
            if let RpcMethod::Initialize = method {
                // Still negotiate so a later request on this session sees the version.
                let _ = self.initialize(session, &envelope.params);
            }
            return Reply::Silent;
        };

        if session.state == SessionState::Uninitialized
            && matches!(method, RpcMethod::ToolsList | RpcMethod::ToolsCall)
        {
            tracing::debug!(
                event = "rpc_without_initialize",
                method = ?method,
                client_ready = session.client_ready,
                "Serving request on a session that never sent initialize"
            );
        }

        let result = match method {
            RpcMethod::Initialize => self.initialize(session, &envelope.params),
            RpcMethod::Ping => Ok(json!({})),
            RpcMethod::ToolsList => Ok(self.registry.catalog()),
            RpcMethod::ToolsCall => {
                return match self.call_tool(envelope.params).await {
                    Ok(records) => match mode {
                        EmissionMode::Aggregate => Reply::Message(self.streamer.aggregate(id, &records)),
                        EmissionMode::Streaming => Reply::Frames(self.streamer.stream(id, records)),
                    },
                    Err(err) => Reply::Message(error_response(id, &err)),
                };
            }
            RpcMethod::Unknown(name) => Err(ProtocolError::MethodNotFound(name)),
            RpcMethod::Initialized => return Reply::Silent,
        };

        Reply::Message(match result {
            Ok(payload) => success_response(id, payload),
            Err(err) => error_response(id, &err),
        })
    }

    fn initialize(&self, session: &mut Session, params: &Value) -> Result<Value, ProtocolError> {
        let requested = match params.get("protocolVersion") {
            None | Some(Value::Null) => LATEST_PROTOCOL_VERSION.to_string(),
            Some(Value::String(version)) => version.clone(),
            Some(other) => other.to_string(),
        };
        if !SUPPORTED_PROTOCOL_VERSIONS.contains(&requested.as_str()) {
            tracing::warn!(
                event = "rpc_unsupported_protocol_version",
                requested = %requested,
                "Rejected initialize with unsupported protocol version"
            );
            return Err(ProtocolError::UnsupportedVersion(requested));
        }

        session.state = SessionState::Initialized;
        session.protocol_version = Some(requested.clone());
        tracing::info!(event = "rpc_initialized", protocol_version = %requested);

        Ok(json!({
            "protocolVersion": requested,
            "capabilities": {
                "tools": {
                    "listChanged": false
                }
            },
            "serverInfo": {
                "name": self.config.server_name,
                "version": self.config.server_version
            },
            "instructions": "Use search to find JobTread jobs and customers, fetch for full details of one item, and list to browse jobs or customers. Results fall back to sample data when the JobTread API is unavailable."
        }))
    }

    async fn call_tool(&self, params: Value) -> Result<Vec<Value>, ProtocolError> {
        let params = match params {
            Value::Object(map) => map,
            _ => {
                return Err(ProtocolError::InvalidParams(
                    "tools/call params must be an object".into(),
                ));
            }
        };

        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidParams("tools/call requires string field 'name'".into()))?;

        let tool = self.registry.get(name).ok_or_else(|| {
            tracing::warn!(event = "rpc_unknown_tool", tool = %name);
            ProtocolError::InvalidTool(name.to_string())
        })?;

        let args = match params.get("arguments") {
            Some(Value::Object(map)) => map.clone(),
            Some(Value::Null) | None => Map::new(),
            Some(_) => {
                return Err(ProtocolError::InvalidParams(
                    "tools/call 'arguments' must be an object".into(),
                ));
            }
        };

        let outcome = AssertUnwindSafe(tools::run(tool.kind, &args, &self.adapter))
            .catch_unwind()
            .await;
        match outcome {
            Ok(Ok(records)) => {
                tracing::info!(event = "tool_call_completed", tool = tool.name, records = records.len());
                Ok(records)
            }
            Ok(Err(err @ ToolError::InvalidArgument { .. })) => Err(ProtocolError::InvalidParams(err.to_string())),
            Err(_) => {
                tracing::error!(event = "tool_call_panicked", tool = tool.name, "Tool execution panicked");
                Err(ProtocolError::Internal(format!("tool '{}' failed unexpectedly", tool.name)))
            }
        }
    }
}
