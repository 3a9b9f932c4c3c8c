//! Workflows API.

use tokio_util::sync::CancellationToken;

use crate::client::DifyClient;
use crate::error::Result;
use crate::routes;
use crate::stream::{decode_workflow_stream, EventStream, WorkflowEvent};
use crate::types::{ResponseMode, WorkflowRunRequest, WorkflowRunResponse};

/// Workflows API client.
pub struct WorkflowsApi {
    client: DifyClient,
}

impl WorkflowsApi {
    pub(crate) fn new(client: DifyClient) -> Self {
        Self { client }
    }

    /// Run the workflow and wait for its result.
    pub async fn run(&self, mut request: WorkflowRunRequest) -> Result<WorkflowRunResponse> {
        request.response_mode = ResponseMode::Blocking;
        self.client.post(routes::WORKFLOWS_RUN, &request).await
    }

    /// Run the workflow, streaming node progress.
    ///
    /// The stream ends after `workflow_finished`.
    pub async fn stream(&self, request: WorkflowRunRequest) -> Result<EventStream<WorkflowEvent>> {
        self.stream_with_cancel(request, &CancellationToken::new())
            .await
    }

    /// Run the workflow, streaming node progress until `cancel` fires.
    pub async fn stream_with_cancel(
        &self,
        mut request: WorkflowRunRequest,
        cancel: &CancellationToken,
    ) -> Result<EventStream<WorkflowEvent>> {
        request.response_mode = ResponseMode::Streaming;
        let response = self
            .client
            .post_stream(routes::WORKFLOWS_RUN, &request)
            .await?;
        Ok(decode_workflow_stream(response.bytes_stream(), cancel))
    }
}
