//! Streaming event decoder.
//!
//! Turns a chunked `text/event-stream` response body into an ordered,
//! cancellable sequence of typed events:
//!
//! ```text
//! bytes ─▶ FrameReader ─▶ classify ─▶ Protocol::decode ─▶ pump task ─▶ EventStream
//! ```
//!
//! Each stream gets its own pump task. The task owns the response body, hands
//! outcomes to the consumer through a single-slot channel (so it never runs
//! more than one outcome ahead), and stops on the first terminal condition:
//! a protocol end marker, a decode failure, a transport error, end of input,
//! or cancellation. Failures are delivered as the last item of the stream;
//! clean ends simply close it.
//!
//! # Example
//!
//! ```no_run
//! use dify_client::stream::{decode_chat_stream, ChatEventKind};
//! use futures::StreamExt;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example(response: reqwest::Response) -> dify_client::Result<()> {
//! let mut events = decode_chat_stream(response.bytes_stream(), &CancellationToken::new());
//! while let Some(outcome) = events.next().await {
//!     if let ChatEventKind::Message { answer } = outcome?.kind {
//!         print!("{}", answer);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod chat;
mod classify;
mod decode;
mod pump;
mod reader;
mod workflow;

use std::fmt::Display;

use bytes::Bytes;
use futures::Stream;
use tokio_util::sync::CancellationToken;

pub use chat::{AgentThought, ChatEvent, ChatEventKind, ChatProtocol, MessageFile};
pub use classify::{classify, ClassifiedFrame, DATA_PREFIX};
pub use decode::{Disposition, Protocol};
pub use pump::{spawn_pump, EventStream, StreamOutcome};
pub use reader::FrameReader;
pub use workflow::{
    ExecutionMetadata, NodeFinished, NodeStarted, RunStatus, WorkflowEvent, WorkflowEventKind,
    WorkflowFinished, WorkflowProtocol, WorkflowStarted,
};

/// Decode a chat-message event stream.
pub fn decode_chat_stream<S, E>(source: S, cancel: &CancellationToken) -> EventStream<ChatEvent>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    spawn_pump::<ChatProtocol, _, _>(source, cancel)
}

/// Decode a workflow-run event stream.
pub fn decode_workflow_stream<S, E>(
    source: S,
    cancel: &CancellationToken,
) -> EventStream<WorkflowEvent>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    spawn_pump::<WorkflowProtocol, _, _>(source, cancel)
}
