//! API route templates, relative to the configured host.

/// Create a chat message (blocking or streaming).
pub const CHAT_MESSAGES: &str = "v1/chat-messages";

/// Rate a message.
pub const MESSAGE_FEEDBACKS: &str = "v1/messages/{message_id}/feedbacks";

/// List the messages of a conversation.
pub const MESSAGES: &str = "v1/messages";

/// List a user's conversations.
pub const CONVERSATIONS: &str = "v1/conversations";

/// Rename a conversation.
pub const CONVERSATION_NAME: &str = "v1/conversations/{conversation_id}/name";

/// Fetch the app's input form and feature switches.
pub const PARAMETERS: &str = "v1/parameters";

/// Run a workflow (blocking or streaming).
pub const WORKFLOWS_RUN: &str = "v1/workflows/run";

/// Substitute `{name}` in a route template with a percent-encoded value.
pub fn expand(template: &str, name: &str, value: &str) -> String {
    template.replace(&format!("{{{}}}", name), &urlencoding::encode(value))
}
