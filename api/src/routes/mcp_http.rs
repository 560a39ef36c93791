use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::header::{ACCEPT, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use futures::{Stream, StreamExt, stream};
use jobtread_mcp_runtime::streamer::{NDJSON_CONTENT_TYPE, ndjson_line};
use jobtread_mcp_runtime::{EmissionMode, LATEST_PROTOCOL_VERSION, Reply, Session};
use serde_json::json;

use crate::state::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/sse/", post(mcp_post).get(sse_keepalive))
        .route("/sse", post(mcp_post).get(sse_keepalive))
        .route("/mcp", post(mcp_post))
}

/// One JSON-RPC envelope per request, each on its own session.
async fn mcp_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    let accept = headers.get(ACCEPT).and_then(|v| v.to_str().ok());
    let mode = EmissionMode::from_accept(accept);
    let mut session = Session::default();

    match state.dispatcher.handle_bytes(&mut session, &body, mode).await {
        Reply::Silent => StatusCode::ACCEPTED.into_response(),
        Reply::Message(payload) => (StatusCode::OK, Json(payload)).into_response(),
        Reply::Frames(frames) => {
            tracing::debug!(event = "mcp_stream_started", frames = frames.len());
            // Dropping the body (client went away) cancels the remaining frames.
            let guard = frames.cancellation().drop_guard();
            let lines = frames.into_stream().map(move |frame| {
                let _keep = &guard;
                Ok::<_, Infallible>(ndjson_line(&frame))
            });
            ndjson_response(Body::from_stream(lines))
        }
    }
}

fn ndjson_response(body: Body) -> Response {
    let mut response = (StatusCode::OK, body).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(NDJSON_CONTENT_TYPE));
    response
}

async fn sse_keepalive(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let connected = json!({
        "server": state.dispatcher.config().server_name,
        "protocolVersion": LATEST_PROTOCOL_VERSION,
    });
    tracing::debug!(event = "sse_client_connected");
    Sse::new(heartbeat_stream(connected.to_string(), HEARTBEAT_INTERVAL))
        .keep_alive(KeepAlive::new().interval(HEARTBEAT_INTERVAL))
}

fn heartbeat_stream(connected: String, period: Duration) -> impl Stream<Item = Result<Event, Infallible>> {
    let first = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("connected").data(connected))
    });

    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let beats = stream::unfold(ticker, |mut ticker| async move {
        ticker.tick().await;
        let data = json!({ "timestamp": chrono::Utc::now().to_rfc3339() }).to_string();
        Some((Ok::<_, Infallible>(Event::default().event("heartbeat").data(data)), ticker))
    });

    first.chain(beats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::routes::app;
    use crate::routes::test_support::demo_state;

    async fn post_rpc(path: &str, accept: Option<&str>, body: &str) -> Response {
        let mut request = Request::builder()
            .method("POST")
            .uri(path)
            .header(CONTENT_TYPE, "application/json");
        if let Some(accept) = accept {
            request = request.header(ACCEPT, accept);
        }
        app(demo_state())
            .oneshot(request.body(Body::from(body.to_string())).expect("request should build"))
            .await
            .expect("request should succeed")
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
    }

    fn content_type(response: &Response) -> &str {
        response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
    }

    #[tokio::test]
    async fn initialize_aggregate_returns_single_json_object() {
        let response = post_rpc(
            "/sse/",
            Some("application/json"),
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2025-06-18"}}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(content_type(&response).starts_with("application/json"));
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["result"]["protocolVersion"], "2025-06-18");
    }

    #[tokio::test]
    async fn tool_call_streams_ndjson_frames_by_default() {
        let response = post_rpc(
            "/sse/",
            None,
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"search","arguments":{"query":"kitchen"}}}"#,
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(content_type(&response), NDJSON_CONTENT_TYPE);

        let text = body_text(response).await;
        let frames: Vec<Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert!(!frames.is_empty());
        assert!(text.ends_with('\n'));
        let last = frames.len() - 1;
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame["id"], 2);
            assert_eq!(frame["result"]["isFinal"], i == last);
        }
    }

    #[tokio::test]
    async fn tool_call_with_json_accept_aggregates() {
        let response = post_rpc(
            "/mcp",
            Some("application/json"),
            r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"list","arguments":{"type":"customers"}}}"#,
        )
        .await;
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        let records: Vec<Value> =
            serde_json::from_str(body["result"]["content"][0]["text"].as_str().unwrap()).unwrap();
        assert_eq!(records.len(), 2);
        assert!(body["result"].get("isFinal").is_none());
    }

    #[tokio::test]
    async fn notification_gets_accepted_with_empty_body() {
        let response = post_rpc("/sse", None, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert!(body_text(response).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_parse_error() {
        let response = post_rpc("/sse/", Some("application/json"), "{oops").await;
        assert_eq!(response.status(), StatusCode::OK);
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], -32700);
        assert!(body["id"].is_null());
    }

    #[tokio::test]
    async fn errors_stay_single_json_objects_when_streaming() {
        let response = post_rpc(
            "/sse/",
            Some("application/x-ndjson"),
            r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"name":"bogus"}}"#,
        )
        .await;
        assert!(content_type(&response).starts_with("application/json"));
        let body: Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(body["error"]["code"], -32600);
        assert_eq!(body["id"], 4);
    }

    #[tokio::test]
    async fn keepalive_starts_with_connected_then_heartbeats() {
        let mut events = Box::pin(heartbeat_stream("{}".into(), Duration::from_millis(10)));
        assert!(events.next().await.is_some());
        let beat = tokio::time::timeout(Duration::from_secs(5), events.next()).await;
        assert!(matches!(beat, Ok(Some(Ok(_)))));
    }
}
