//! Workflow-run stream events.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::decode::{decode_as, parse_frame, without, Disposition, Protocol};
use crate::error::StreamError;

/// One decoded event of a workflow-run stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WorkflowEvent {
    /// Task ID, usable to stop the run.
    pub task_id: String,
    /// Workflow run ID.
    pub workflow_run_id: Option<String>,
    /// Position of the run within the app's history.
    pub sequence_number: Option<i64>,
    /// Creation time, seconds since the Unix epoch (0 when absent).
    ///
    /// Taken from `data.created_at`, else the top-level field. Passed through
    /// as reported; ordering across events is not checked.
    pub created_at: i64,
    /// Event-specific payload.
    pub kind: WorkflowEventKind,
}

/// Top-level fields every workflow event carries.
#[derive(Deserialize)]
struct WorkflowHeader {
    task_id: String,
    workflow_run_id: Option<String>,
    sequence_number: Option<i64>,
    created_at: Option<i64>,
}

/// Fields consumed by [`WorkflowHeader`], dropped from unmodelled payloads.
const HEADER_FIELDS: &[&str] = &[
    "event",
    "task_id",
    "workflow_run_id",
    "sequence_number",
    "created_at",
];

/// Wire shape of the event-specific fields. Most events nest them in `data`,
/// which may be absent or `null`.
#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WireKind {
    WorkflowStarted {
        #[serde(default, deserialize_with = "null_as_default")]
        data: WorkflowStarted,
    },
    NodeStarted {
        #[serde(default, deserialize_with = "null_as_default")]
        data: NodeStarted,
    },
    NodeFinished {
        #[serde(default, deserialize_with = "null_as_default")]
        data: NodeFinished,
    },
    WorkflowFinished {
        #[serde(default, deserialize_with = "null_as_default")]
        data: WorkflowFinished,
    },
    TextChunk {
        #[serde(default, deserialize_with = "null_as_default")]
        data: TextChunkData,
    },
    TtsMessage {
        #[serde(default)]
        audio: String,
    },
    TtsMessageEnd {
        #[serde(default)]
        audio: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct TextChunkData {
    text: String,
}

/// Payload of a workflow event, keyed by the wire `event` name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WorkflowEventKind {
    /// The run started.
    WorkflowStarted(WorkflowStarted),
    /// A node started executing.
    NodeStarted(NodeStarted),
    /// A node finished executing.
    NodeFinished(NodeFinished),
    /// The run finished; always the last event of a stream.
    WorkflowFinished(WorkflowFinished),
    /// Streamed text output.
    TextChunk {
        /// Text delta.
        text: String,
    },
    /// A chunk of synthesized speech.
    TtsMessage {
        /// Base64-encoded audio.
        audio: String,
    },
    /// The last chunk of synthesized speech.
    TtsMessageEnd {
        /// Base64-encoded audio, usually empty.
        audio: String,
    },
    /// An event this client does not model.
    Other {
        /// Wire event name.
        #[serde(rename = "name")]
        event: String,
        /// Remaining payload fields.
        payload: Value,
    },
}

/// Execution status of a run or node.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
    Stopped,
    Exception,
    PartialSucceeded,
    #[default]
    #[serde(other)]
    Unknown,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RunStatus::Running => "running",
            RunStatus::Succeeded => "succeeded",
            RunStatus::Failed => "failed",
            RunStatus::Stopped => "stopped",
            RunStatus::Exception => "exception",
            RunStatus::PartialSucceeded => "partial-succeeded",
            RunStatus::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// `data` of a `workflow_started` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowStarted {
    pub id: String,
    pub workflow_id: String,
    pub sequence_number: Option<i64>,
    pub created_at: i64,
}

/// `data` of a `node_started` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeStarted {
    pub id: String,
    pub node_id: String,
    pub node_type: String,
    pub title: String,
    pub index: u32,
    pub predecessor_node_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub inputs: HashMap<String, Value>,
    pub created_at: i64,
}

/// `data` of a `node_finished` event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeFinished {
    pub id: String,
    pub node_id: String,
    pub node_type: String,
    pub title: String,
    pub index: u32,
    pub predecessor_node_id: Option<String>,
    #[serde(deserialize_with = "null_as_default")]
    pub inputs: HashMap<String, Value>,
    pub process_data: Option<Value>,
    pub outputs: Option<Value>,
    pub status: RunStatus,
    pub error: Option<String>,
    pub elapsed_time: f64,
    pub execution_metadata: Option<ExecutionMetadata>,
    pub created_at: i64,
}

/// Token and cost accounting for a node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionMetadata {
    pub total_tokens: Option<u64>,
    /// Reported as a decimal string by some versions of the service.
    #[serde(deserialize_with = "lenient_f64")]
    pub total_price: Option<f64>,
    pub currency: Option<String>,
}

/// `data` of a `workflow_finished` event, also the result of a blocking run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowFinished {
    pub id: String,
    pub workflow_id: String,
    pub status: RunStatus,
    pub outputs: Option<Value>,
    pub error: Option<String>,
    pub elapsed_time: f64,
    pub total_tokens: u64,
    pub total_steps: u32,
    pub created_at: i64,
    pub finished_at: i64,
}

impl WorkflowEvent {
    /// Wire name of the event.
    pub fn event_name(&self) -> &str {
        match &self.kind {
            WorkflowEventKind::WorkflowStarted(_) => "workflow_started",
            WorkflowEventKind::NodeStarted(_) => "node_started",
            WorkflowEventKind::NodeFinished(_) => "node_finished",
            WorkflowEventKind::WorkflowFinished(_) => "workflow_finished",
            WorkflowEventKind::TextChunk { .. } => "text_chunk",
            WorkflowEventKind::TtsMessage { .. } => "tts_message",
            WorkflowEventKind::TtsMessageEnd { .. } => "tts_message_end",
            WorkflowEventKind::Other { event, .. } => event,
        }
    }

    /// Creation time as a UTC timestamp.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }

    /// Whether this event ends the run.
    pub fn is_finished(&self) -> bool {
        matches!(self.kind, WorkflowEventKind::WorkflowFinished(_))
    }
}

/// Workflow-run stream protocol (`/v1/workflows/run`).
///
/// `workflow_finished` is delivered and then closes the session. Empty `data`
/// objects are legitimate mid-stream and never end it.
#[derive(Debug, Clone, Copy)]
pub struct WorkflowProtocol;

impl Protocol for WorkflowProtocol {
    type Event = WorkflowEvent;

    const NAME: &'static str = "workflow";

    fn decode(payload: &[u8]) -> Result<WorkflowEvent, StreamError> {
        let frame = parse_frame(payload)?;

        let data_created_at = match frame.value.get("data") {
            None | Some(Value::Null) => None,
            Some(Value::Object(data)) => data.get("created_at").and_then(Value::as_i64),
            Some(_) => return Err(StreamError::malformed("`data` is not an object", payload)),
        };

        let header: WorkflowHeader = decode_as(&frame.value, "workflow event", payload)?;
        let wire: WireKind = decode_as(&frame.value, "workflow event", payload)?;

        let kind = match wire {
            WireKind::WorkflowStarted { data } => WorkflowEventKind::WorkflowStarted(data),
            WireKind::NodeStarted { data } => WorkflowEventKind::NodeStarted(data),
            WireKind::NodeFinished { data } => WorkflowEventKind::NodeFinished(data),
            WireKind::WorkflowFinished { data } => WorkflowEventKind::WorkflowFinished(data),
            WireKind::TextChunk { data } => WorkflowEventKind::TextChunk { text: data.text },
            WireKind::TtsMessage { audio } => WorkflowEventKind::TtsMessage { audio },
            WireKind::TtsMessageEnd { audio } => WorkflowEventKind::TtsMessageEnd { audio },
            WireKind::Unknown => WorkflowEventKind::Other {
                event: frame.event,
                payload: without(frame.value, HEADER_FIELDS),
            },
        };

        Ok(WorkflowEvent {
            task_id: header.task_id,
            workflow_run_id: header.workflow_run_id,
            sequence_number: header.sequence_number,
            created_at: data_created_at.or(header.created_at).unwrap_or(0),
            kind,
        })
    }

    fn disposition(event: &WorkflowEvent) -> Disposition {
        if event.is_finished() {
            Disposition::DeliverThenClose
        } else {
            Disposition::Continue
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => Ok(n.as_f64()),
        Some(Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected number, got {}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(payload: &str) -> WorkflowEvent {
        WorkflowProtocol::decode(payload.as_bytes()).unwrap()
    }

    #[test]
    fn test_decode_workflow_started() {
        let event = decode(
            r#"{"event":"workflow_started","task_id":"t1","workflow_run_id":"r1","data":{"id":"r1","workflow_id":"w1","sequence_number":7,"created_at":1700000000}}"#,
        );
        assert_eq!(event.workflow_run_id.as_deref(), Some("r1"));
        assert_eq!(event.created_at, 1700000000);
        match &event.kind {
            WorkflowEventKind::WorkflowStarted(data) => {
                assert_eq!(data.workflow_id, "w1");
                assert_eq!(data.sequence_number, Some(7));
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(WorkflowProtocol::disposition(&event), Disposition::Continue);
    }

    #[test]
    fn test_decode_node_finished() {
        let event = decode(
            r#"{"event":"node_finished","task_id":"t1","workflow_run_id":"r1","data":{
                "id":"e1","node_id":"n1","node_type":"llm","title":"LLM","index":2,
                "predecessor_node_id":"start","inputs":null,"outputs":{"text":"done"},
                "status":"succeeded","elapsed_time":1.5,
                "execution_metadata":{"total_tokens":30,"total_price":"0.0012","currency":"USD"},
                "created_at":1700000001}}"#,
        );
        match &event.kind {
            WorkflowEventKind::NodeFinished(node) => {
                assert_eq!(node.node_type, "llm");
                assert_eq!(node.index, 2);
                assert!(node.inputs.is_empty());
                assert_eq!(node.status, RunStatus::Succeeded);
                assert_eq!(node.outputs.as_ref().unwrap()["text"], "done");
                let meta = node.execution_metadata.as_ref().unwrap();
                assert_eq!(meta.total_tokens, Some(30));
                assert_eq!(meta.total_price, Some(0.0012));
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_workflow_finished_delivers_then_closes() {
        let event = decode(
            r#"{"event":"workflow_finished","task_id":"t1","workflow_run_id":"r1","data":{"id":"r1","workflow_id":"w1","status":"failed","error":"boom","outputs":null,"elapsed_time":0.2,"total_tokens":0,"total_steps":3,"created_at":1,"finished_at":2}}"#,
        );
        assert!(event.is_finished());
        match &event.kind {
            WorkflowEventKind::WorkflowFinished(data) => {
                assert_eq!(data.status, RunStatus::Failed);
                assert_eq!(data.error.as_deref(), Some("boom"));
                assert_eq!(data.total_steps, 3);
            }
            other => panic!("unexpected kind {:?}", other),
        }
        assert_eq!(
            WorkflowProtocol::disposition(&event),
            Disposition::DeliverThenClose
        );
    }

    #[test]
    fn test_empty_data_is_not_terminal() {
        let event = decode(r#"{"event":"node_started","task_id":"t1","data":{}}"#);
        assert_eq!(event.kind, WorkflowEventKind::NodeStarted(NodeStarted::default()));
        assert_eq!(WorkflowProtocol::disposition(&event), Disposition::Continue);

        let event = decode(r#"{"event":"text_chunk","task_id":"t1"}"#);
        assert_eq!(
            event.kind,
            WorkflowEventKind::TextChunk {
                text: String::new()
            }
        );
        assert_eq!(WorkflowProtocol::disposition(&event), Disposition::Continue);

        let event = decode(r#"{"event":"workflow_started","task_id":"t1","data":null}"#);
        assert_eq!(
            event.kind,
            WorkflowEventKind::WorkflowStarted(WorkflowStarted::default())
        );
    }

    #[test]
    fn test_text_chunk_and_tts() {
        let event = decode(
            r#"{"event":"text_chunk","task_id":"t1","created_at":9,"data":{"text":"Hel","from_variable_selector":["llm","text"]}}"#,
        );
        assert_eq!(
            event.kind,
            WorkflowEventKind::TextChunk {
                text: "Hel".into()
            }
        );
        assert_eq!(event.created_at, 9);

        let event = decode(r#"{"event":"tts_message","task_id":"t1","audio":"UklGRg=="}"#);
        assert_eq!(
            event.kind,
            WorkflowEventKind::TtsMessage {
                audio: "UklGRg==".into()
            }
        );
    }

    #[test]
    fn test_mistyped_data_field_is_malformed() {
        let err = WorkflowProtocol::decode(
            br#"{"event":"node_started","task_id":"t1","data":{"index":"first"}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, StreamError::MalformedPayload { .. }));
    }

    #[test]
    fn test_unknown_status_and_event() {
        let event = decode(
            r#"{"event":"node_finished","task_id":"t1","data":{"status":"paused"}}"#,
        );
        match &event.kind {
            WorkflowEventKind::NodeFinished(node) => assert_eq!(node.status, RunStatus::Unknown),
            other => panic!("unexpected kind {:?}", other),
        }

        let event = decode(
            r#"{"event":"iteration_started","task_id":"t1","workflow_run_id":"r1","data":{"id":"i1"}}"#,
        );
        assert_eq!(event.event_name(), "iteration_started");
        match &event.kind {
            WorkflowEventKind::Other { payload, .. } => {
                assert_eq!(payload["data"]["id"], "i1");
                assert!(payload.get("workflow_run_id").is_none());
            }
            other => panic!("unexpected kind {:?}", other),
        }
    }

    #[test]
    fn test_data_must_be_object() {
        let err = WorkflowProtocol::decode(br#"{"event":"node_started","task_id":"t1","data":[]}"#)
            .unwrap_err();
        assert!(matches!(err, StreamError::MalformedPayload { .. }));
    }
}
