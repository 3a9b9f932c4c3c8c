//! Conversations API.

use crate::client::DifyClient;
use crate::error::{Error, Result};
use crate::routes;
use crate::types::{
    ListConversationsQuery, ListConversationsResponse, RenameConversationRequest, ResultResponse,
    DEFAULT_CONVERSATION_LIMIT,
};

/// Conversations API client.
pub struct ConversationsApi {
    client: DifyClient,
}

impl ConversationsApi {
    pub(crate) fn new(client: DifyClient) -> Self {
        Self { client }
    }

    /// List a user's conversations, most recent first.
    pub async fn list(&self, mut query: ListConversationsQuery) -> Result<ListConversationsResponse> {
        if query.user.is_empty() {
            return Err(Error::InvalidRequest("user is required".to_string()));
        }
        if query.limit == 0 {
            query.limit = DEFAULT_CONVERSATION_LIMIT;
        }
        self.client
            .get_with_query(routes::CONVERSATIONS, &query)
            .await
    }

    /// Rename a conversation.
    pub async fn rename(
        &self,
        conversation_id: &str,
        request: RenameConversationRequest,
    ) -> Result<ResultResponse> {
        if conversation_id.is_empty() {
            return Err(Error::InvalidRequest(
                "conversation_id is required".to_string(),
            ));
        }
        let route = routes::expand(routes::CONVERSATION_NAME, "conversation_id", conversation_id);
        self.client.post(&route, &request).await
    }
}
