//! Messages API.

use crate::client::DifyClient;
use crate::error::{Error, Result};
use crate::routes;
use crate::types::{ListMessagesQuery, ListMessagesResponse, MessageFeedbackRequest, ResultResponse};

/// Messages API client.
pub struct MessagesApi {
    client: DifyClient,
}

impl MessagesApi {
    pub(crate) fn new(client: DifyClient) -> Self {
        Self { client }
    }

    /// Rate a message on behalf of an end user.
    pub async fn feedback(
        &self,
        message_id: &str,
        request: MessageFeedbackRequest,
    ) -> Result<ResultResponse> {
        if message_id.is_empty() {
            return Err(Error::InvalidRequest("message_id is required".to_string()));
        }
        let route = routes::expand(routes::MESSAGE_FEEDBACKS, "message_id", message_id);
        self.client.post(&route, &request).await
    }

    /// List a page of a conversation's messages, newest first.
    pub async fn list(&self, mut query: ListMessagesQuery) -> Result<ListMessagesResponse> {
        if query.conversation_id.is_empty() {
            return Err(Error::InvalidRequest(
                "conversation_id is required".to_string(),
            ));
        }
        if query.limit == Some(0) {
            query.limit = None;
        }
        if query.first_id.as_deref() == Some("") {
            query.first_id = None;
        }
        self.client.get_with_query(routes::MESSAGES, &query).await
    }
}
