//! Chat API.

use tokio_util::sync::CancellationToken;

use crate::client::DifyClient;
use crate::error::Result;
use crate::routes;
use crate::stream::{decode_chat_stream, ChatEvent, EventStream};
use crate::types::{ChatMessageRequest, ChatMessageResponse, ResponseMode};

/// Chat API client.
pub struct ChatApi {
    client: DifyClient,
}

impl ChatApi {
    pub(crate) fn new(client: DifyClient) -> Self {
        Self { client }
    }

    /// Send a chat message and wait for the complete answer.
    pub async fn send(&self, mut request: ChatMessageRequest) -> Result<ChatMessageResponse> {
        request.response_mode = ResponseMode::Blocking;
        self.client.post(routes::CHAT_MESSAGES, &request).await
    }

    /// Stream a chat answer.
    ///
    /// The stream ends after the last answer delta; a failure, if any, is its
    /// final item.
    pub async fn stream(&self, request: ChatMessageRequest) -> Result<EventStream<ChatEvent>> {
        self.stream_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Stream a chat answer, stopping early when `cancel` fires.
    pub async fn stream_with_cancel(
        &self,
        request: ChatMessageRequest,
        cancel: &CancellationToken,
    ) -> Result<EventStream<ChatEvent>> {
        let response = self.stream_raw(request).await?;
        Ok(decode_chat_stream(response.bytes_stream(), cancel))
    }

    /// Open a streaming chat request and return the raw response.
    ///
    /// The status has already been checked; the body is an event stream.
    pub async fn stream_raw(&self, mut request: ChatMessageRequest) -> Result<reqwest::Response> {
        request.response_mode = ResponseMode::Streaming;
        self.client.post_stream(routes::CHAT_MESSAGES, &request).await
    }
}
