//! Request and response types for the Dify app API.
//!
//! These types mirror the service's API contract.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::stream::WorkflowFinished;

/// Default page size for conversation listings.
pub const DEFAULT_CONVERSATION_LIMIT: u32 = 20;

/// How the service should return a generation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseMode {
    /// Wait for the full result.
    #[default]
    Blocking,
    /// Stream events as they are produced.
    Streaming,
}

// ─────────────────────────────────────────────────────────────────────────────
// Chat
// ─────────────────────────────────────────────────────────────────────────────

/// Request to create a chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChatMessageRequest {
    /// Values for the app's input variables.
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    /// The user's message.
    pub query: String,
    /// Set by the API call; callers need not fill it in.
    #[serde(default)]
    pub response_mode: ResponseMode,
    /// Continue an existing conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<String>,
    /// End-user identifier, unique within the app.
    pub user: String,
}

impl ChatMessageRequest {
    /// Create a request for a new conversation.
    pub fn new(query: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            user: user.into(),
            ..Default::default()
        }
    }

    /// Continue an existing conversation.
    pub fn with_conversation(mut self, conversation_id: impl Into<String>) -> Self {
        self.conversation_id = Some(conversation_id.into());
        self
    }

    /// Set an input variable.
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }
}

/// Response to a blocking chat message.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatMessageResponse {
    /// Message ID.
    pub id: String,
    /// Message ID, as reported by newer service versions.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    /// Task ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,
    /// Complete answer.
    pub answer: String,
    /// Conversation ID.
    pub conversation_id: String,
    /// Usage and retrieval metadata.
    #[serde(skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
    /// Creation time, seconds since the Unix epoch.
    pub created_at: i64,
}

// ─────────────────────────────────────────────────────────────────────────────
// Messages
// ─────────────────────────────────────────────────────────────────────────────

/// End-user rating of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Like,
    Dislike,
}

impl std::str::FromStr for Rating {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Rating::Like),
            "dislike" => Ok(Rating::Dislike),
            other => Err(format!("unknown rating '{}' (expected like or dislike)", other)),
        }
    }
}

/// Request to rate a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageFeedbackRequest {
    /// The rating; `None` revokes a previous rating.
    pub rating: Option<Rating>,
    /// End-user identifier.
    pub user: String,
}

/// Generic `{"result": "success"}` acknowledgement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResultResponse {
    /// Result string, normally `success`.
    #[serde(default)]
    pub result: String,
}

/// Query parameters for listing messages of a conversation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListMessagesQuery {
    /// Conversation to list.
    pub conversation_id: String,
    /// End-user identifier.
    pub user: String,
    /// ID of the first message on the current page, to fetch the previous one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_id: Option<String>,
    /// Page size; omitted when unset or zero.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl ListMessagesQuery {
    /// Create a query for the newest page of a conversation.
    pub fn new(conversation_id: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            user: user.into(),
            ..Default::default()
        }
    }
}

/// A message in a conversation's history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    pub id: String,
    pub conversation_id: String,
    pub inputs: HashMap<String, Value>,
    pub query: String,
    pub answer: String,
    /// The user's rating, if any.
    pub feedback: Option<Value>,
    pub created_at: i64,
}

/// A page of messages, newest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListMessagesResponse {
    pub limit: u32,
    pub has_more: bool,
    pub data: Vec<Message>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Conversations
// ─────────────────────────────────────────────────────────────────────────────

/// Query parameters for listing conversations.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ListConversationsQuery {
    /// ID of the last conversation on the current page.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_id: Option<String>,
    /// Page size; 0 means [`DEFAULT_CONVERSATION_LIMIT`].
    pub limit: u32,
    /// End-user identifier (required).
    pub user: String,
}

impl ListConversationsQuery {
    /// Create a query for the first page of a user's conversations.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }
}

/// Summary of a conversation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Conversation {
    pub id: String,
    pub name: String,
    pub inputs: HashMap<String, Value>,
    pub status: String,
    pub created_at: i64,
}

/// A page of conversations.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConversationsResponse {
    pub limit: u32,
    pub has_more: bool,
    pub data: Vec<Conversation>,
}

/// Request to rename a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameConversationRequest {
    /// New name.
    pub name: String,
    /// End-user identifier.
    pub user: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parameters
// ─────────────────────────────────────────────────────────────────────────────

/// An on/off feature switch.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureToggle {
    pub enabled: bool,
}

/// The app's configured input form and features.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ParametersResponse {
    /// Greeting shown at the start of a conversation.
    pub opening_statement: String,
    /// Suggested opening questions.
    pub suggested_questions: Vec<Value>,
    /// Whether follow-up questions are suggested after each answer.
    pub suggested_questions_after_answer: FeatureToggle,
    /// Whether "more like this" is enabled.
    pub more_like_this: FeatureToggle,
    /// Input form controls, each keyed by control type (`text-input`, `select`, ...).
    pub user_input_form: Vec<HashMap<String, Value>>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Workflows
// ─────────────────────────────────────────────────────────────────────────────

/// Request to run a workflow.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WorkflowRunRequest {
    /// Values for the workflow's input variables.
    #[serde(default)]
    pub inputs: HashMap<String, Value>,
    /// Set by the API call; callers need not fill it in.
    #[serde(default)]
    pub response_mode: ResponseMode,
    /// End-user identifier.
    pub user: String,
}

impl WorkflowRunRequest {
    /// Create a request with no inputs.
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            ..Default::default()
        }
    }

    /// Set an input variable.
    pub fn with_input(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.inputs.insert(name.into(), value.into());
        self
    }
}

/// Result of a blocking workflow run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowRunResponse {
    pub workflow_run_id: String,
    pub task_id: String,
    pub data: WorkflowFinished,
}
