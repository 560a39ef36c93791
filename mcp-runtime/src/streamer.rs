//! Framing of tool results as one aggregate response or as a sequence of
//! partial-result frames.

use std::time::Duration;

use futures::Stream;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";
pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EmissionMode {
    Aggregate,
    Streaming,
}

impl EmissionMode {
    /// Streaming unless the client asked for plain JSON and did not also
    /// accept NDJSON.
    pub fn from_accept(accept: Option<&str>) -> Self {
        let Some(accept) = accept else {
            return Self::Streaming;
        };
        let accept = accept.to_ascii_lowercase();
        if accept.contains(NDJSON_CONTENT_TYPE) {
            Self::Streaming
        } else if accept.contains(JSON_CONTENT_TYPE) {
            Self::Aggregate
        } else {
            Self::Streaming
        }
    }
}

/// Delay inserted between consecutive frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pacing {
    Immediate,
    Fixed(Duration),
}

impl Pacing {
    pub fn from_interval(interval: Duration) -> Self {
        if interval.is_zero() {
            Self::Immediate
        } else {
            Self::Fixed(interval)
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ResultStreamer {
    pacing: Pacing,
}

impl ResultStreamer {
    pub fn new(pacing: Pacing) -> Self {
        Self { pacing }
    }

    /// A single response carrying the whole record list as one text block.
    pub fn aggregate(&self, id: Value, records: &[Value]) -> Value {
        let text = serde_json::to_string_pretty(records).unwrap_or_else(|_| "[]".to_string());
        json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "content": [{ "type": "text", "text": text }]
            }
        })
    }

    pub fn stream(&self, id: Value, records: Vec<Value>) -> FrameStream {
        FrameStream {
            id,
            total: records.len(),
            emitted: 0,
            records: records.into_iter(),
            pacing: self.pacing,
            cancel: CancellationToken::new(),
        }
    }
}

/// Lazily produced partial-result frames for one request.
///
/// One frame per record, all sharing the request id; only the last one has
/// `isFinal: true`. An empty record list yields no frames at all.
#[derive(Debug)]
pub struct FrameStream {
    id: Value,
    total: usize,
    emitted: usize,
    records: std::vec::IntoIter<Value>,
    pacing: Pacing,
    cancel: CancellationToken,
}

impl FrameStream {
    pub fn len(&self) -> usize {
        self.total
    }

    pub fn is_empty(&self) -> bool {
        self.total == 0
    }

    /// Cancelling this token (for instance when the client disconnects)
    /// ends the stream before its next frame.
    pub fn cancellation(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn next_frame(&mut self) -> Option<Value> {
        if self.cancel.is_cancelled() || self.emitted == self.total {
            return None;
        }
        if let (true, Pacing::Fixed(interval)) = (self.emitted > 0, self.pacing) {
            tokio::select! {
                _ = tokio::time::sleep(interval) => {}
                _ = self.cancel.cancelled() => return None,
            }
        }
        if self.cancel.is_cancelled() {
            return None;
        }
        let record = self.records.next()?;
        self.emitted += 1;
        Some(frame(&self.id, record, self.emitted == self.total))
    }

    pub fn into_stream(self) -> impl Stream<Item = Value> + Send {
        futures::stream::unfold(self, |mut frames| async move {
            frames.next_frame().await.map(|frame| (frame, frames))
        })
    }

    /// Drains every remaining frame.
    pub async fn collect_frames(mut self) -> Vec<Value> {
        let mut out = Vec::with_capacity(self.total - self.emitted);
        while let Some(frame) = self.next_frame().await {
            out.push(frame);
        }
        out
    }
}

fn frame(id: &Value, record: Value, is_final: bool) -> Value {
    let text = serde_json::to_string(&record).unwrap_or_else(|_| "{}".to_string());
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "result": {
            "content": [{ "type": "text", "text": text }],
            "isFinal": is_final
        }
    })
}

/// One newline-terminated line of an NDJSON body.
pub fn ndjson_line(frame: &Value) -> String {
    let mut line = frame.to_string();
    line.push('\n');
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn records(n: usize) -> Vec<Value> {
        (0..n).map(|i| json!({"id": format!("r{i}")})).collect()
    }

    #[tokio::test]
    async fn one_frame_per_record_with_final_flag_on_last() {
        let streamer = ResultStreamer::new(Pacing::Immediate);
        let frames = streamer.stream(json!(7), records(3)).collect_frames().await;

        assert_eq!(frames.len(), 3);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame["id"], 7);
            assert_eq!(frame["result"]["isFinal"], i == 2);
            let text = frame["result"]["content"][0]["text"].as_str().unwrap();
            let record: Value = serde_json::from_str(text).unwrap();
            assert_eq!(record["id"], format!("r{i}"));
        }
    }

    #[tokio::test]
    async fn empty_records_emit_no_frames() {
        let streamer = ResultStreamer::new(Pacing::Immediate);
        let mut frames = streamer.stream(json!("abc"), Vec::new());
        assert!(frames.is_empty());
        assert!(frames.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_stops_before_next_frame() {
        let streamer = ResultStreamer::new(Pacing::Immediate);
        let mut frames = streamer.stream(json!(1), records(4));
        let cancel = frames.cancellation();

        assert!(frames.next_frame().await.is_some());
        cancel.cancel();
        assert!(frames.next_frame().await.is_none());
    }

    #[tokio::test]
    async fn cancellation_interrupts_pacing_delay() {
        let streamer = ResultStreamer::new(Pacing::Fixed(Duration::from_secs(60)));
        let mut frames = streamer.stream(json!(1), records(2));
        let cancel = frames.cancellation();
        assert!(frames.next_frame().await.is_some());

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        });
        let next = tokio::time::timeout(Duration::from_secs(5), frames.next_frame())
            .await
            .expect("pacing should be interrupted by cancellation");
        assert!(next.is_none());
    }

    #[tokio::test]
    async fn stream_adapter_yields_all_frames() {
        let streamer = ResultStreamer::new(Pacing::Fixed(Duration::from_millis(1)));
        let frames: Vec<Value> = streamer.stream(json!(2), records(2)).into_stream().collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1]["result"]["isFinal"], true);
    }

    #[test]
    fn aggregate_wraps_full_list() {
        let streamer = ResultStreamer::new(Pacing::Immediate);
        let response = streamer.aggregate(json!(5), &records(2));
        let text = response["result"]["content"][0]["text"].as_str().unwrap();
        let decoded: Vec<Value> = serde_json::from_str(text).unwrap();
        assert_eq!(decoded, records(2));
        assert_eq!(response["id"], 5);
    }

    #[test]
    fn accept_header_selects_mode() {
        assert_eq!(EmissionMode::from_accept(None), EmissionMode::Streaming);
        assert_eq!(EmissionMode::from_accept(Some("*/*")), EmissionMode::Streaming);
        assert_eq!(
            EmissionMode::from_accept(Some("application/json")),
            EmissionMode::Aggregate
        );
        assert_eq!(
            EmissionMode::from_accept(Some("application/json, application/x-ndjson")),
            EmissionMode::Streaming
        );
        assert_eq!(
            EmissionMode::from_accept(Some("application/json, text/event-stream")),
            EmissionMode::Aggregate
        );
    }

    #[test]
    fn ndjson_lines_are_newline_terminated() {
        assert_eq!(ndjson_line(&json!({"a": 1})), "{\"a\":1}\n");
    }
}
