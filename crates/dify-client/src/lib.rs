//! HTTP client SDK for Dify chat and workflow apps.
//!
//! This crate provides a typed client for the Dify app API, including a
//! streaming decoder that turns `text/event-stream` responses into typed
//! events.
//!
//! # Example
//!
//! ```no_run
//! use dify_client::{ChatMessageRequest, DifyClient, Result};
//! use futures::StreamExt;
//!
//! # async fn example() -> Result<()> {
//! let client = DifyClient::builder()
//!     .host("https://api.dify.ai")
//!     .api_secret("app-secret")
//!     .build()?;
//!
//! // Blocking mode
//! let response = client
//!     .chat()
//!     .send(ChatMessageRequest::new("Hello!", "user-1"))
//!     .await?;
//! println!("{}", response.answer);
//!
//! // Streaming mode
//! let mut events = client
//!     .chat()
//!     .stream(ChatMessageRequest::new("Tell me a story", "user-1"))
//!     .await?;
//! while let Some(event) = events.next().await {
//!     if let Some(text) = event?.answer() {
//!         print!("{}", text);
//!     }
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # API Coverage
//!
//! - **Chat**: send messages (blocking), stream answers
//! - **Messages**: list history, rate messages
//! - **Conversations**: list, rename
//! - **Parameters**: app input form and features
//! - **Workflows**: run (blocking), stream node progress

pub mod api;
pub mod client;
pub mod error;
pub mod routes;
pub mod stream;
pub mod types;

pub use client::{ClientBuilder, DifyClient};
pub use error::{Error, Result, StreamError, UpstreamError};
pub use stream::{
    AgentThought, ChatEvent, ChatEventKind, EventStream, MessageFile, NodeFinished, NodeStarted,
    RunStatus, StreamOutcome, WorkflowEvent, WorkflowEventKind, WorkflowFinished, WorkflowStarted,
};
pub use types::*;

pub use tokio_util::sync::CancellationToken;
