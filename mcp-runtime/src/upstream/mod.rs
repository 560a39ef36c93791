//! Resilient access to the JobTread API.
//!
//! [`UpstreamAdapter::call`] never fails: missing credentials, transport
//! errors, rejected payloads and unparseable bodies all end in the static
//! sample dataset from `jobtread_core::sample`.

mod strategy;

use std::sync::Arc;
use std::time::{Duration, Instant};

use jobtread_core::sample::{self, Collection};
use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::Config;
use crate::credentials::{CredentialResolver, Credentials, EnvSource};

pub use strategy::{
    Extraction, FlatOperation, GraphqlBearer, Operation, PaveQuery, RequestStrategy, RestPath,
    UpstreamRequest, default_strategies,
};

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("authentication rejected (HTTP 401)")]
    Unauthorized,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("response body is not valid JSON: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("response not usable: {0}")]
    Extraction(String),
}

/// Result of walking the strategy list once.
#[derive(Debug, PartialEq)]
pub enum UpstreamResult {
    Success {
        strategy: &'static str,
        records: Vec<Value>,
    },
    Exhausted,
}

/// Per-strategy line of a diagnostic probe.
#[derive(Debug, Serialize)]
pub struct StrategyOutcome {
    pub strategy: &'static str,
    pub endpoint: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub elapsed_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct ProbeReport {
    pub operation: &'static str,
    pub credentials_present: bool,
    pub attempts: Vec<StrategyOutcome>,
    /// First strategy that would have won a live call.
    pub selected: Option<&'static str>,
}

pub struct UpstreamAdapter {
    config: Arc<Config>,
    http: reqwest::Client,
    credentials: CredentialResolver,
    strategies: Vec<Box<dyn RequestStrategy>>,
}

impl UpstreamAdapter {
    pub fn new(config: Arc<Config>, env: Arc<dyn EnvSource>) -> Self {
        Self::with_strategies(config, env, default_strategies())
    }

    pub fn with_strategies(
        config: Arc<Config>,
        env: Arc<dyn EnvSource>,
        strategies: Vec<Box<dyn RequestStrategy>>,
    ) -> Self {
        let credentials = CredentialResolver::new(&config, env);
        Self {
            config,
            http: reqwest::Client::new(),
            credentials,
            strategies,
        }
    }

    pub async fn call(&self, operation: Operation, params: &Map<String, Value>) -> Vec<Value> {
        let Some(credentials) = self.credentials.resolve() else {
            tracing::info!(
                event = "upstream_sample_fallback",
                operation = operation.as_str(),
                reason = "credentials_absent",
                "No JobTread credentials configured; serving sample data"
            );
            return sample_records(operation, params);
        };

        match self.attempt(&credentials, operation, params).await {
            UpstreamResult::Success { strategy, records } => {
                tracing::info!(
                    event = "upstream_success",
                    operation = operation.as_str(),
                    strategy,
                    records = records.len(),
                    "Upstream call succeeded"
                );
                records
            }
            UpstreamResult::Exhausted => {
                tracing::warn!(
                    event = "upstream_sample_fallback",
                    operation = operation.as_str(),
                    reason = "strategies_exhausted",
                    strategies = self.strategies.len(),
                    "Every upstream request strategy failed; serving sample data"
                );
                sample_records(operation, params)
            }
        }
    }

    /// Tries each strategy in order and stops at the first usable answer.
    pub async fn attempt(
        &self,
        credentials: &Credentials,
        operation: Operation,
        params: &Map<String, Value>,
    ) -> UpstreamResult {
        for strategy in &self.strategies {
            let result = self
                .try_strategy(
                    strategy.as_ref(),
                    credentials,
                    operation,
                    params,
                    self.config.upstream_timeout,
                )
                .await;
            match result {
                Ok(records) => {
                    return UpstreamResult::Success {
                        strategy: strategy.name(),
                        records,
                    };
                }
                Err(UpstreamError::Unauthorized) => {
                    tracing::warn!(
                        event = "upstream_auth_rejected",
                        operation = operation.as_str(),
                        strategy = strategy.name(),
                        "Upstream rejected credentials for this strategy; trying next"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        event = "upstream_strategy_failed",
                        operation = operation.as_str(),
                        strategy = strategy.name(),
                        error = %err,
                        "Upstream strategy failed; trying next"
                    );
                }
            }
        }
        UpstreamResult::Exhausted
    }

    /// Runs every strategy with the diagnostic timeout, without short-circuiting.
    pub async fn probe(&self, operation: Operation, params: &Map<String, Value>) -> ProbeReport {
        let Some(credentials) = self.credentials.resolve() else {
            return ProbeReport {
                operation: operation.as_str(),
                credentials_present: false,
                attempts: Vec::new(),
                selected: None,
            };
        };

        let mut attempts = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            let endpoint = strategy
                .build_request(&self.config.upstream_url, operation, params, &credentials)
                .url;
            let started = Instant::now();
            let result = self
                .try_strategy(
                    strategy.as_ref(),
                    &credentials,
                    operation,
                    params,
                    self.config.diagnostic_timeout,
                )
                .await;
            let elapsed_ms = started.elapsed().as_millis().min(u64::MAX as u128) as u64;
            attempts.push(match result {
                Ok(records) => StrategyOutcome {
                    strategy: strategy.name(),
                    endpoint,
                    ok: true,
                    records: Some(records.len()),
                    error: None,
                    elapsed_ms,
                },
                Err(err) => StrategyOutcome {
                    strategy: strategy.name(),
                    endpoint,
                    ok: false,
                    records: None,
                    error: Some(err.to_string()),
                    elapsed_ms,
                },
            });
        }
        let selected = attempts.iter().find(|a| a.ok).map(|a| a.strategy);
        ProbeReport {
            operation: operation.as_str(),
            credentials_present: true,
            attempts,
            selected,
        }
    }

    async fn try_strategy(
        &self,
        strategy: &dyn RequestStrategy,
        credentials: &Credentials,
        operation: Operation,
        params: &Map<String, Value>,
        timeout: Duration,
    ) -> Result<Vec<Value>, UpstreamError> {
        let request =
            strategy.build_request(&self.config.upstream_url, operation, params, credentials);
        tracing::debug!(
            event = "upstream_attempt",
            operation = operation.as_str(),
            strategy = strategy.name(),
            url = %request.url,
            "Attempting upstream request"
        );

        let mut builder = self
            .http
            .post(&request.url)
            .timeout(timeout)
            .json(&request.payload);
        for (name, value) in &request.headers {
            builder = builder.header(*name, value);
        }

        let response = builder.send().await.map_err(|e| classify_transport(e, timeout))?;
        let status = response.status().as_u16();
        match status {
            200 => {}
            401 => return Err(UpstreamError::Unauthorized),
            other => return Err(UpstreamError::Status(other)),
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport(e, timeout))?;
        let body: Value = serde_json::from_slice(&bytes).map_err(UpstreamError::Decode)?;
        match strategy.extract_results(operation, &body) {
            Extraction::Records(records) => Ok(records),
            Extraction::NoResults => Ok(Vec::new()),
            Extraction::Unusable(reason) => Err(UpstreamError::Extraction(reason)),
        }
    }
}

fn classify_transport(err: reqwest::Error, timeout: Duration) -> UpstreamError {
    if err.is_timeout() {
        UpstreamError::Timeout(timeout)
    } else {
        UpstreamError::Transport(err)
    }
}

/// Sample data shaped like the answer to `operation`.
pub fn sample_records(operation: Operation, params: &Map<String, Value>) -> Vec<Value> {
    let text = |key: &str| {
        params
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    match operation {
        Operation::SearchJobs => sample::search(&text("query")),
        Operation::GetItem => vec![sample::fetch(&text("id"))],
        Operation::ListJobs => sample::list(Collection::Jobs),
        Operation::ListCustomers => sample::list(Collection::Customers),
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::Router;
    use axum::body::Bytes;
    use axum::http::{StatusCode, Uri};
    use axum::response::IntoResponse;
    use serde_json::Value;

    use crate::credentials::EnvSource;

    /// What the fake upstream does for one request.
    #[derive(Clone, Debug)]
    pub enum Canned {
        Status(u16, String),
        Hang,
    }

    #[derive(Clone, Debug)]
    pub struct Recorded {
        pub path: String,
        pub body: Value,
    }

    type Responder = Arc<dyn Fn(&str, &Value) -> Canned + Send + Sync>;

    pub struct FakeUpstream {
        pub base_url: String,
        pub calls: Arc<Mutex<Vec<Recorded>>>,
    }

    impl FakeUpstream {
        pub fn calls(&self) -> Vec<Recorded> {
            self.calls.lock().unwrap().clone()
        }
    }

    /// Which built-in strategy produced a request, judged by path and body shape.
    pub fn strategy_of(path: &str, body: &Value) -> &'static str {
        match path {
            "/graphql" => "graphql_bearer",
            "/pave" if body.get("operation").is_some() => "flat_operation",
            "/pave" => "pave_query",
            _ => "rest_path",
        }
    }

    pub async fn spawn(
        responder: impl Fn(&str, &Value) -> Canned + Send + Sync + 'static,
    ) -> FakeUpstream {
        let calls: Arc<Mutex<Vec<Recorded>>> = Arc::default();
        let responder: Responder = Arc::new(responder);
        let recorder = calls.clone();
        let app = Router::new().fallback(move |uri: Uri, body: Bytes| {
            let recorder = recorder.clone();
            let responder = responder.clone();
            async move {
                let body: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
                let path = uri.path().to_string();
                recorder.lock().unwrap().push(Recorded {
                    path: path.clone(),
                    body: body.clone(),
                });
                match responder(&path, &body) {
                    Canned::Status(status, text) => {
                        (StatusCode::from_u16(status).unwrap(), text).into_response()
                    }
                    Canned::Hang => {
                        tokio::time::sleep(Duration::from_secs(5)).await;
                        StatusCode::OK.into_response()
                    }
                }
            }
        });
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        FakeUpstream {
            base_url: format!("http://{addr}"),
            calls,
        }
    }

    pub fn credentials_env() -> Arc<dyn EnvSource> {
        Arc::new(HashMap::from([
            ("JOBTREAD_GRANT_KEY".to_string(), "test-grant".to_string()),
            ("JOBTREAD_ORGANIZATION_ID".to_string(), "org-1".to_string()),
        ]))
    }

    pub fn empty_env() -> Arc<dyn EnvSource> {
        Arc::new(HashMap::<String, String>::new())
    }
}
