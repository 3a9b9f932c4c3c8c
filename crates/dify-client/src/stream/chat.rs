//! Chat-message stream events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::decode::{decode_as, parse_frame, without, Disposition, Protocol};
use crate::error::StreamError;

/// One decoded event of a chat-message stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatEvent {
    /// Task ID, usable to stop the generation.
    pub task_id: String,
    /// Message ID (`id` or `message_id` on the wire).
    pub message_id: Option<String>,
    /// Conversation ID.
    pub conversation_id: Option<String>,
    /// Creation time, seconds since the Unix epoch (0 when absent).
    ///
    /// Passed through as reported; ordering across events is not checked.
    pub created_at: i64,
    /// Event-specific payload.
    pub kind: ChatEventKind,
}

/// Top-level fields every chat event carries.
#[derive(Deserialize)]
struct ChatHeader {
    task_id: String,
    message_id: Option<String>,
    id: Option<String>,
    conversation_id: Option<String>,
    created_at: Option<i64>,
}

/// Fields consumed by [`ChatHeader`], dropped from unmodelled payloads.
const HEADER_FIELDS: &[&str] = &[
    "event",
    "task_id",
    "message_id",
    "id",
    "conversation_id",
    "created_at",
];

/// Wire shape of the event-specific fields.
#[derive(Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WireKind {
    Message {
        #[serde(default)]
        answer: String,
    },
    AgentMessage {
        #[serde(default)]
        answer: String,
    },
    AgentThought(AgentThought),
    MessageFile(MessageFile),
    MessageReplace {
        #[serde(default)]
        answer: String,
    },
    MessageEnd {
        #[serde(default)]
        metadata: Value,
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

/// Payload of a chat event, keyed by the wire `event` name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ChatEventKind {
    /// Answer text delta.
    Message {
        /// Text delta.
        answer: String,
    },
    /// Answer text delta from an agent app.
    AgentMessage {
        /// Text delta.
        answer: String,
    },
    /// An agent reasoning/tool step.
    AgentThought(AgentThought),
    /// A file attached to the message.
    MessageFile(MessageFile),
    /// Moderation replaced the whole answer.
    MessageReplace {
        /// Replacement answer.
        answer: String,
    },
    /// The message is complete.
    MessageEnd {
        /// Usage and retrieval metadata.
        metadata: Value,
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

/// An agent reasoning step.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentThought {
    /// Thought ID.
    pub id: String,
    /// Position of the thought within the message.
    pub position: u32,
    /// What the model is thinking.
    pub thought: String,
    /// Tool response.
    pub observation: String,
    /// Tools called, `;`-separated.
    pub tool: String,
    /// Tool input as JSON text.
    pub tool_input: String,
    /// IDs of files produced by this step.
    pub message_files: Vec<String>,
}

/// A file attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageFile {
    /// File ID.
    pub id: String,
    /// File type, e.g. `image`.
    #[serde(rename = "type")]
    pub file_type: String,
    /// Who the file belongs to (`user` or `assistant`).
    pub belongs_to: String,
    /// Remote URL of the file.
    pub url: String,
}

impl ChatEvent {
    /// Wire name of the event.
    pub fn event_name(&self) -> &str {
        match &self.kind {
            ChatEventKind::Message { .. } => "message",
            ChatEventKind::AgentMessage { .. } => "agent_message",
            ChatEventKind::AgentThought(_) => "agent_thought",
            ChatEventKind::MessageFile(_) => "message_file",
            ChatEventKind::MessageReplace { .. } => "message_replace",
            ChatEventKind::MessageEnd { .. } => "message_end",
            ChatEventKind::TtsMessage { .. } => "tts_message",
            ChatEventKind::TtsMessageEnd { .. } => "tts_message_end",
            ChatEventKind::Other { event, .. } => event,
        }
    }

    /// Answer text delta, for events that carry one.
    pub fn answer(&self) -> Option<&str> {
        match &self.kind {
            ChatEventKind::Message { answer }
            | ChatEventKind::AgentMessage { answer }
            | ChatEventKind::MessageReplace { answer } => Some(answer),
            _ => None,
        }
    }

    /// Creation time as a UTC timestamp.
    pub fn created_at_utc(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.created_at, 0)
    }
}

/// Chat-message stream protocol (`/v1/chat-messages`).
///
/// An answer delta or replacement with empty text marks the end of the
/// answer: the session closes without delivering it. `message_end` is delivered and then closes
/// the session.
#[derive(Debug, Clone, Copy)]
pub struct ChatProtocol;

impl Protocol for ChatProtocol {
    type Event = ChatEvent;

    const NAME: &'static str = "chat";

    fn decode(payload: &[u8]) -> Result<ChatEvent, StreamError> {
        let frame = parse_frame(payload)?;
        let header: ChatHeader = decode_as(&frame.value, "chat event", payload)?;
        let wire: WireKind = decode_as(&frame.value, "chat event", payload)?;

        let kind = match wire {
            WireKind::Message { answer } => ChatEventKind::Message { answer },
            WireKind::AgentMessage { answer } => ChatEventKind::AgentMessage { answer },
            WireKind::AgentThought(thought) => ChatEventKind::AgentThought(thought),
            WireKind::MessageFile(file) => ChatEventKind::MessageFile(file),
            WireKind::MessageReplace { answer } => ChatEventKind::MessageReplace { answer },
            WireKind::MessageEnd { metadata } => ChatEventKind::MessageEnd { metadata },
            WireKind::TtsMessage { audio } => ChatEventKind::TtsMessage { audio },
            WireKind::TtsMessageEnd { audio } => ChatEventKind::TtsMessageEnd { audio },
            WireKind::Unknown => ChatEventKind::Other {
                event: frame.event,
                payload: without(frame.value, HEADER_FIELDS),
            },
        };

        // Thoughts and files carry their own `id`; other events use it for the message.
        let message_id = match kind {
            ChatEventKind::AgentThought(_) | ChatEventKind::MessageFile(_) => header.message_id,
            _ => header.message_id.or(header.id),
        };

        Ok(ChatEvent {
            task_id: header.task_id,
            message_id,
            conversation_id: header.conversation_id,
            created_at: header.created_at.unwrap_or(0),
            kind,
        })
    }

    fn disposition(event: &ChatEvent) -> Disposition {
        match &event.kind {
            ChatEventKind::Message { answer }
            | ChatEventKind::AgentMessage { answer }
            | ChatEventKind::MessageReplace { answer }
                if answer.is_empty() =>
            {
                Disposition::CloseSilently
            }
            ChatEventKind::MessageEnd { .. } => Disposition::DeliverThenClose,
            _ => Disposition::Continue,
        }
    }
}
