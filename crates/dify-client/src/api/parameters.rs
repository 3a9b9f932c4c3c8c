//! Parameters API.

use crate::client::DifyClient;
use crate::error::{Error, Result};
use crate::routes;
use crate::types::ParametersResponse;

/// Parameters API client.
pub struct ParametersApi {
    client: DifyClient,
}

#[derive(serde::Serialize)]
struct UserQuery<'a> {
    user: &'a str,
}

impl ParametersApi {
    pub(crate) fn new(client: DifyClient) -> Self {
        Self { client }
    }

    /// Get the app's input form, opening statement and feature switches.
    pub async fn get(&self, user: &str) -> Result<ParametersResponse> {
        if user.is_empty() {
            return Err(Error::InvalidRequest("user is required".to_string()));
        }
        self.client
            .get_with_query(routes::PARAMETERS, &UserQuery { user })
            .await
    }
}
