//! Candidate request shapes for the JobTread API.
//!
//! The upstream has shipped several incompatible request contracts, so each
//! shape is one [`RequestStrategy`] value. The adapter walks them in
//! declaration order and keeps the first one that produces usable data.

use serde_json::{Map, Value, json};

use crate::credentials::Credentials;

/// Upstream operations the tools can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Operation {
    SearchJobs,
    GetItem,
    ListJobs,
    ListCustomers,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::SearchJobs => "searchJobs",
            Operation::GetItem => "getItem",
            Operation::ListJobs => "listJobs",
            Operation::ListCustomers => "listCustomers",
        }
    }

    /// Collection (or single-object) field that holds results in the upstream schema.
    fn field(self) -> &'static str {
        match self {
            Operation::SearchJobs | Operation::ListJobs => "jobs",
            Operation::GetItem => "job",
            Operation::ListCustomers => "accounts",
        }
    }

    fn selected_fields(self) -> &'static [&'static str] {
        match self {
            Operation::ListCustomers => &["id", "name", "type", "createdAt"],
            _ => &["id", "name", "number", "description", "status", "createdAt"],
        }
    }

    /// Path segments under `/v1`. Caller-supplied values stay a single segment.
    fn rest_segments(self, params: &Map<String, Value>) -> Vec<String> {
        match self {
            Operation::SearchJobs => vec!["jobs".into(), "search".into()],
            Operation::ListJobs => vec!["jobs".into()],
            Operation::ListCustomers => vec!["customers".into()],
            Operation::GetItem => vec!["items".into(), param_str(params, "id")],
        }
    }
}

/// One fully-built outbound request.
#[derive(Clone, Debug)]
pub struct UpstreamRequest {
    pub url: String,
    pub headers: Vec<(&'static str, String)>,
    pub payload: Value,
}

/// Outcome of pulling records out of a decoded response body.
#[derive(Clone, Debug, PartialEq)]
pub enum Extraction {
    Records(Vec<Value>),
    /// The upstream answered the query and explicitly found nothing.
    NoResults,
    Unusable(String),
}

pub trait RequestStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    fn build_request(
        &self,
        base_url: &str,
        operation: Operation,
        params: &Map<String, Value>,
        credentials: &Credentials,
    ) -> UpstreamRequest;

    fn extract_results(&self, operation: Operation, body: &Value) -> Extraction;
}

/// All known strategies, in the order they are attempted.
pub fn default_strategies() -> Vec<Box<dyn RequestStrategy>> {
    vec![
        Box::new(PaveQuery),
        Box::new(GraphqlBearer),
        Box::new(FlatOperation),
        Box::new(RestPath),
    ]
}

/// Nested Pave query with the grant key embedded in the body.
pub struct PaveQuery;

impl RequestStrategy for PaveQuery {
    fn name(&self) -> &'static str {
        "pave_query"
    }

    fn build_request(
        &self,
        base_url: &str,
        operation: Operation,
        params: &Map<String, Value>,
        credentials: &Credentials,
    ) -> UpstreamRequest {
        let selection = pave_selection(operation.selected_fields());
        let query = match operation {
            Operation::GetItem => {
                let mut item = selection;
                item["$"] = json!({ "id": param_str(params, "id") });
                json!({
                    "$": { "grantKey": credentials.grant_key },
                    "job": item
                })
            }
            _ => {
                let mut args = Map::new();
                args.insert("size".into(), json!(param_limit(params)));
                let query_text = param_str(params, "query");
                if operation == Operation::SearchJobs && !query_text.is_empty() {
                    args.insert("where".into(), json!(["name", "like", format!("%{query_text}%")]));
                }
                let mut organization = Map::new();
                organization.insert("$".into(), json!({ "id": credentials.organization_id }));
                organization.insert(
                    operation.field().into(),
                    json!({ "$": args, "nodes": selection }),
                );
                json!({
                    "$": { "grantKey": credentials.grant_key },
                    "organization": organization
                })
            }
        };
        UpstreamRequest {
            url: format!("{base_url}/pave"),
            headers: Vec::new(),
            payload: json!({ "query": query }),
        }
    }

    fn extract_results(&self, operation: Operation, body: &Value) -> Extraction {
        if let Some(message) = error_message(body) {
            return Extraction::Unusable(message);
        }
        let located = match operation {
            Operation::GetItem => body.get(operation.field()),
            _ => body
                .pointer(&format!("/organization/{}", operation.field()))
                .or_else(|| body.get(operation.field())),
        };
        match located {
            Some(value) => normalize(value),
            None => Extraction::Unusable(format!("missing '{}' in Pave response", operation.field())),
        }
    }
}

/// GraphQL document with bearer authentication.
pub struct GraphqlBearer;

impl RequestStrategy for GraphqlBearer {
    fn name(&self) -> &'static str {
        "graphql_bearer"
    }

    fn build_request(
        &self,
        base_url: &str,
        operation: Operation,
        params: &Map<String, Value>,
        credentials: &Credentials,
    ) -> UpstreamRequest {
        let fields = operation.selected_fields().join(" ");
        let document = match operation {
            Operation::GetItem => format!("query($id: ID!) {{ job(id: $id) {{ {fields} }} }}"),
            Operation::SearchJobs => format!(
                "query($organizationId: ID!, $query: String, $limit: Int) {{ jobs(organizationId: $organizationId, search: $query, first: $limit) {{ nodes {{ {fields} }} }} }}"
            ),
            _ => format!(
                "query($organizationId: ID!, $limit: Int) {{ {field}(organizationId: $organizationId, first: $limit) {{ nodes {{ {fields} }} }} }}",
                field = operation.field()
            ),
        };
        let mut variables = params.clone();
        variables.insert("organizationId".into(), json!(credentials.organization_id));
        variables.insert("limit".into(), json!(param_limit(params)));
        UpstreamRequest {
            url: format!("{base_url}/graphql"),
            headers: vec![("authorization", format!("Bearer {}", credentials.grant_key))],
            payload: json!({
                "query": document,
                "variables": variables
            }),
        }
    }

    fn extract_results(&self, operation: Operation, body: &Value) -> Extraction {
        if let Some(message) = error_message(body) {
            return Extraction::Unusable(message);
        }
        match body.pointer(&format!("/data/{}", operation.field())) {
            Some(value) => normalize(value),
            None => Extraction::Unusable(format!("missing 'data.{}'", operation.field())),
        }
    }
}

/// Flat operation name plus parameters, credentials inline.
pub struct FlatOperation;

impl RequestStrategy for FlatOperation {
    fn name(&self) -> &'static str {
        "flat_operation"
    }

    fn build_request(
        &self,
        base_url: &str,
        operation: Operation,
        params: &Map<String, Value>,
        credentials: &Credentials,
    ) -> UpstreamRequest {
        UpstreamRequest {
            url: format!("{base_url}/pave"),
            headers: Vec::new(),
            payload: json!({
                "grantKey": credentials.grant_key,
                "organizationId": credentials.organization_id,
                "operation": operation.as_str(),
                "parameters": params
            }),
        }
    }

    fn extract_results(&self, _operation: Operation, body: &Value) -> Extraction {
        if let Some(message) = error_message(body) {
            return Extraction::Unusable(message);
        }
        ["results", "data", "items"]
            .iter()
            .find_map(|key| body.get(*key))
            .map(normalize)
            .unwrap_or_else(|| Extraction::Unusable("no results/data/items field".to_string()))
    }
}

/// REST-style resource path with header authentication.
pub struct RestPath;

impl RequestStrategy for RestPath {
    fn name(&self) -> &'static str {
        "rest_path"
    }

    fn build_request(
        &self,
        base_url: &str,
        operation: Operation,
        params: &Map<String, Value>,
        credentials: &Credentials,
    ) -> UpstreamRequest {
        UpstreamRequest {
            url: rest_url(base_url, &operation.rest_segments(params)),
            headers: vec![
                ("authorization", format!("Bearer {}", credentials.grant_key)),
                ("x-organization-id", credentials.organization_id.clone()),
            ],
            payload: Value::Object(params.clone()),
        }
    }

    fn extract_results(&self, _operation: Operation, body: &Value) -> Extraction {
        if body.is_array() {
            return normalize(body);
        }
        if let Some(message) = error_message(body) {
            return Extraction::Unusable(message);
        }
        match body.get("results").or_else(|| body.get("data")) {
            Some(value) => normalize(value),
            None => Extraction::Unusable("expected a list or a 'results' field".to_string()),
        }
    }
}

/// `{base}/v1/<segments>` with every segment percent-encoded, so `/`, `?`
/// and `#` inside an id cannot leave the resource path. An unparsable base
/// is returned as is and rejected by the HTTP client before any request.
fn rest_url(base_url: &str, segments: &[String]) -> String {
    let Ok(mut url) = reqwest::Url::parse(base_url) else {
        return base_url.to_string();
    };
    match url.path_segments_mut() {
        Ok(mut path) => {
            path.pop_if_empty().push("v1").extend(segments);
        }
        Err(()) => return base_url.to_string(),
    }
    url.to_string()
}

/// Lists pass through, `{nodes: [...]}` is unwrapped and a single object
/// becomes a one-element list.
fn normalize(value: &Value) -> Extraction {
    match value {
        Value::Array(items) if items.is_empty() => Extraction::NoResults,
        Value::Array(items) => {
            if items.iter().all(Value::is_object) {
                Extraction::Records(items.clone())
            } else {
                Extraction::Unusable("list contains non-object entries".to_string())
            }
        }
        Value::Object(map) => match map.get("nodes") {
            Some(nodes) => normalize(nodes),
            None if map.is_empty() => Extraction::Unusable("empty object".to_string()),
            None => Extraction::Records(vec![value.clone()]),
        },
        Value::Null => Extraction::Unusable("null result".to_string()),
        _ => Extraction::Unusable("scalar result".to_string()),
    }
}

fn error_message(body: &Value) -> Option<String> {
    if let Some(errors) = body.get("errors").and_then(Value::as_array) {
        if errors.is_empty() {
            return None;
        }
        let first = errors[0]
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| errors[0].to_string());
        return Some(format!("upstream reported errors: {first}"));
    }
    match body.get("error") {
        Some(Value::Null) | None => None,
        Some(Value::String(message)) => Some(format!("upstream reported error: {message}")),
        Some(other) => Some(format!("upstream reported error: {other}")),
    }
}

fn pave_selection(fields: &[&str]) -> Value {
    Value::Object(fields.iter().map(|f| (f.to_string(), json!({}))).collect())
}

fn param_str(params: &Map<String, Value>, key: &str) -> String {
    match params.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

fn param_limit(params: &Map<String, Value>) -> u64 {
    params.get("limit").and_then(Value::as_u64).unwrap_or(10)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            grant_key: "gk".into(),
            organization_id: "org-1".into(),
        }
    }

    fn params(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn default_order_is_stable() {
        let names: Vec<_> = default_strategies().iter().map(|s| s.name()).collect();
        assert_eq!(names, ["pave_query", "graphql_bearer", "flat_operation", "rest_path"]);
    }

    #[test]
    fn pave_search_embeds_credentials_and_filter() {
        let req = PaveQuery.build_request(
            "http://up",
            Operation::SearchJobs,
            &params(json!({"query": "deck", "limit": 5})),
            &creds(),
        );
        assert_eq!(req.url, "http://up/pave");
        assert!(req.headers.is_empty());
        assert_eq!(req.payload["query"]["$"]["grantKey"], "gk");
        let org = &req.payload["query"]["organization"];
        assert_eq!(org["$"]["id"], "org-1");
        assert_eq!(org["jobs"]["$"]["size"], 5);
        assert_eq!(org["jobs"]["$"]["where"], json!(["name", "like", "%deck%"]));
        assert_eq!(org["jobs"]["nodes"]["name"], json!({}));
    }

    #[test]
    fn pave_get_item_targets_job_by_id() {
        let req = PaveQuery.build_request(
            "http://up",
            Operation::GetItem,
            &params(json!({"id": "job_9"})),
            &creds(),
        );
        assert_eq!(req.payload["query"]["job"]["$"]["id"], "job_9");
        assert!(req.payload["query"].get("organization").is_none());
    }

    #[test]
    fn pave_extracts_nodes_and_empty_signal() {
        let body = json!({"organization": {"jobs": {"nodes": [{"id": "1"}, {"id": "2"}]}}});
        assert_eq!(
            PaveQuery.extract_results(Operation::SearchJobs, &body),
            Extraction::Records(vec![json!({"id": "1"}), json!({"id": "2"})])
        );
        let empty = json!({"organization": {"jobs": {"nodes": []}}});
        assert_eq!(PaveQuery.extract_results(Operation::ListJobs, &empty), Extraction::NoResults);
    }

    #[test]
    fn pave_single_job_is_normalized_to_list() {
        let body = json!({"job": {"id": "job_9", "name": "Deck"}});
        assert_eq!(
            PaveQuery.extract_results(Operation::GetItem, &body),
            Extraction::Records(vec![json!({"id": "job_9", "name": "Deck"})])
        );
    }

    #[test]
    fn graphql_uses_bearer_header_and_variables() {
        let req = GraphqlBearer.build_request(
            "http://up",
            Operation::ListCustomers,
            &params(json!({"limit": 3})),
            &creds(),
        );
        assert_eq!(req.url, "http://up/graphql");
        assert_eq!(req.headers, vec![("authorization", "Bearer gk".to_string())]);
        assert_eq!(req.payload["variables"]["organizationId"], "org-1");
        assert!(req.payload["query"].as_str().unwrap().contains("accounts(organizationId"));
    }

    #[test]
    fn graphql_errors_are_unusable() {
        let body = json!({"data": null, "errors": [{"message": "Unknown field"}]});
        assert_eq!(
            GraphqlBearer.extract_results(Operation::SearchJobs, &body),
            Extraction::Unusable("upstream reported errors: Unknown field".into())
        );
    }

    #[test]
    fn flat_operation_reads_first_known_field() {
        let req = FlatOperation.build_request(
            "http://up",
            Operation::ListJobs,
            &params(json!({"limit": 2})),
            &creds(),
        );
        assert_eq!(req.payload["operation"], "listJobs");
        assert_eq!(req.payload["organizationId"], "org-1");
        assert_eq!(req.payload["parameters"]["limit"], 2);

        let body = json!({"items": [{"id": "a"}]});
        assert_eq!(
            FlatOperation.extract_results(Operation::ListJobs, &body),
            Extraction::Records(vec![json!({"id": "a"})])
        );
        assert!(matches!(
            FlatOperation.extract_results(Operation::ListJobs, &json!({"ok": true})),
            Extraction::Unusable(_)
        ));
    }

    #[test]
    fn rest_path_builds_resource_url_and_auth_headers() {
        let req = RestPath.build_request(
            "http://up",
            Operation::GetItem,
            &params(json!({"id": "job_7"})),
            &creds(),
        );
        assert_eq!(req.url, "http://up/v1/items/job_7");
        assert_eq!(req.headers[1], ("x-organization-id", "org-1".to_string()));
        assert_eq!(
            RestPath.extract_results(Operation::GetItem, &json!([{"id": "job_7"}])),
            Extraction::Records(vec![json!({"id": "job_7"})])
        );
    }

    #[test]
    fn rest_path_keeps_item_id_inside_one_segment() {
        let req = RestPath.build_request(
            "http://up",
            Operation::GetItem,
            &params(json!({"id": "../../admin/delete?all=true#"})),
            &creds(),
        );
        assert_eq!(req.url, "http://up/v1/items/..%2F..%2Fadmin%2Fdelete%3Fall=true%23");

        let search = RestPath.build_request("http://up/api", Operation::SearchJobs, &Map::new(), &creds());
        assert_eq!(search.url, "http://up/api/v1/jobs/search");
    }

    #[test]
    fn non_object_list_entries_are_rejected() {
        assert!(matches!(normalize(&json!([1, 2])), Extraction::Unusable(_)));
        assert!(matches!(normalize(&json!("text")), Extraction::Unusable(_)));
        assert!(matches!(normalize(&json!({})), Extraction::Unusable(_)));
    }

    #[test]
    fn error_object_is_detected() {
        assert!(error_message(&json!({"error": "bad grant key"})).is_some());
        assert!(error_message(&json!({"error": null, "results": []})).is_none());
        assert!(error_message(&json!({"errors": []})).is_none());
    }
}
