//! Tool handlers. Arguments are never rejected for being absent; each
//! handler fills in its own defaults.

use jobtread_core::sample::Collection;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::registry::ToolKind;
use crate::upstream::{Operation, UpstreamAdapter};

const DEFAULT_LIMIT: u64 = 10;
const MAX_LIMIT: u64 = 100;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid argument '{field}': {message}")]
    InvalidArgument { field: &'static str, message: String },
}

pub async fn run(
    kind: ToolKind,
    args: &Map<String, Value>,
    adapter: &UpstreamAdapter,
) -> Result<Vec<Value>, ToolError> {
    match kind {
        ToolKind::Search => {
            let query = arg_text(args, "query");
            let limit = arg_limit(args);
            let params = as_map(json!({ "query": query, "limit": limit }));
            let records = adapter.call(Operation::SearchJobs, &params).await;
            Ok(truncate(records, limit))
        }
        ToolKind::Fetch => {
            let id = arg_text(args, "id");
            let params = as_map(json!({ "id": id }));
            let records = adapter.call(Operation::GetItem, &params).await;
            Ok(truncate(records, 1))
        }
        ToolKind::List => {
            let collection = arg_collection(args)?;
            let limit = arg_limit(args);
            let operation = match collection {
                Collection::Jobs => Operation::ListJobs,
                Collection::Customers => Operation::ListCustomers,
            };
            let params = as_map(json!({ "limit": limit }));
            let records = adapter.call(operation, &params).await;
            Ok(truncate(records, limit))
        }
    }
}

fn arg_text(args: &Map<String, Value>, key: &str) -> String {
    match args.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn arg_limit(args: &Map<String, Value>) -> u64 {
    let raw = match args.get("limit") {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    raw.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT)
}

fn arg_collection(args: &Map<String, Value>) -> Result<Collection, ToolError> {
    match args.get("type") {
        Some(Value::String(raw)) if !raw.trim().is_empty() => {
            Collection::parse(raw).ok_or_else(|| ToolError::InvalidArgument {
                field: "type",
                message: format!("expected 'jobs' or 'customers', got '{raw}'"),
            })
        }
        Some(Value::String(_)) | Some(Value::Null) | None => Ok(Collection::default()),
        Some(other) => Err(ToolError::InvalidArgument {
            field: "type",
            message: format!("expected a string, got {other}"),
        }),
    }
}

fn truncate(mut records: Vec<Value>, limit: u64) -> Vec<Value> {
    records.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
    records
}

fn as_map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
