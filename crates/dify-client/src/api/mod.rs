//! API endpoint implementations.

mod chat;
mod conversations;
mod messages;
mod parameters;
mod workflows;

pub use chat::ChatApi;
pub use conversations::ConversationsApi;
pub use messages::MessagesApi;
pub use parameters::ParametersApi;
pub use workflows::WorkflowsApi;
