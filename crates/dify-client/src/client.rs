//! Main client implementation.

use std::sync::Arc;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE};
use reqwest::RequestBuilder;
use url::Url;

use crate::api::{ChatApi, ConversationsApi, MessagesApi, ParametersApi, WorkflowsApi};
use crate::error::{Error, Result, UpstreamError};

/// Default timeout for requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for streaming requests.
const DEFAULT_STREAM_TIMEOUT: Duration = Duration::from_secs(300);

/// Dify app API client.
///
/// Cheap to clone; clones share the underlying connection pool.
///
/// # Example
///
/// ```no_run
/// use dify_client::DifyClient;
///
/// # async fn example() -> dify_client::Result<()> {
/// let client = DifyClient::builder()
///     .host("https://api.dify.ai")
///     .api_secret("app-secret")
///     .build()?;
///
/// let params = client.parameters().get("user-1").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DifyClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
    /// Secret overriding the configured one for this handle.
    api_secret: Option<Arc<str>>,
}

/// Inner client state (shared across clones).
pub(crate) struct ClientInner {
    /// HTTP client.
    pub(crate) http: reqwest::Client,
    /// Base URL for API requests.
    pub(crate) base_url: Url,
    /// Default API secret.
    pub(crate) api_secret: Option<String>,
    /// Request timeout.
    pub(crate) timeout: Duration,
    /// Streaming timeout.
    pub(crate) stream_timeout: Duration,
}

impl std::fmt::Debug for DifyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DifyClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("timeout", &self.inner.timeout)
            .field("stream_timeout", &self.inner.stream_timeout)
            .finish_non_exhaustive()
    }
}

impl DifyClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client for a host with a single API secret.
    pub fn new(host: impl Into<String>, api_secret: impl Into<String>) -> Result<Self> {
        Self::builder().host(host).api_secret(api_secret).build()
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Return a handle that authenticates with a different app secret.
    ///
    /// Useful when one process talks to several apps on the same host.
    pub fn with_api_secret(&self, api_secret: impl Into<String>) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            api_secret: Some(Arc::from(api_secret.into())),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // API accessors
    // ─────────────────────────────────────────────────────────────────────────

    /// Access the chat API.
    pub fn chat(&self) -> ChatApi {
        ChatApi::new(self.clone())
    }

    /// Access the messages API.
    pub fn messages(&self) -> MessagesApi {
        MessagesApi::new(self.clone())
    }

    /// Access the conversations API.
    pub fn conversations(&self) -> ConversationsApi {
        ConversationsApi::new(self.clone())
    }

    /// Access the parameters API.
    pub fn parameters(&self) -> ParametersApi {
        ParametersApi::new(self.clone())
    }

    /// Access the workflows API.
    pub fn workflows(&self) -> WorkflowsApi {
        WorkflowsApi::new(self.clone())
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internal HTTP methods
    // ─────────────────────────────────────────────────────────────────────────

    /// Build a URL for a route.
    pub(crate) fn url(&self, route: &str) -> Result<Url> {
        let route = route.trim_start_matches('/');
        self.inner.base_url.join(route).map_err(Error::from)
    }

    /// Attach the bearer secret for this handle.
    fn authorize(&self, request: RequestBuilder) -> Result<RequestBuilder> {
        let secret = self
            .api_secret
            .as_deref()
            .or(self.inner.api_secret.as_deref())
            .ok_or_else(|| Error::Config("no API secret configured".to_string()))?;

        let value = HeaderValue::from_str(&format!("Bearer {}", secret))
            .map_err(|_| Error::Config("Invalid API secret".to_string()))?;
        Ok(request.header(AUTHORIZATION, value))
    }

    /// Make a GET request with query parameters.
    pub(crate) async fn get_with_query<T, Q>(&self, route: &str, query: &Q) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        Q: serde::Serialize + ?Sized,
    {
        let url = self.url(route)?;
        tracing::debug!(method = "GET", %url, "sending request");
        let request = self
            .inner
            .http
            .get(url)
            .query(query)
            .timeout(self.inner.timeout);
        let response = self.authorize(request)?.send().await?;
        self.handle_response(response).await
    }

    /// Make a POST request.
    pub(crate) async fn post<T, B>(&self, route: &str, body: &B) -> Result<T>
    where
        T: serde::de::DeserializeOwned,
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(route)?;
        tracing::debug!(method = "POST", %url, "sending request");
        let request = self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.timeout);
        let response = self.authorize(request)?.send().await?;
        self.handle_response(response).await
    }

    /// Make a POST request for streaming (returns the response directly).
    ///
    /// Fails with the decoded error body if the status is not a success, so a
    /// returned response is always an open event stream.
    pub(crate) async fn post_stream<B>(&self, route: &str, body: &B) -> Result<reqwest::Response>
    where
        B: serde::Serialize + ?Sized,
    {
        let url = self.url(route)?;
        tracing::debug!(method = "POST", %url, "opening stream");
        let request = self
            .inner
            .http
            .post(url)
            .json(body)
            .timeout(self.inner.stream_timeout);
        let response = self.authorize(request)?.send().await?;

        if !response.status().is_success() {
            return Err(self.extract_error(response).await);
        }

        Ok(response)
    }

    /// Handle a response, extracting the body or error.
    async fn handle_response<T: serde::de::DeserializeOwned>(
        &self,
        response: reqwest::Response,
    ) -> Result<T> {
        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(self.extract_error(response).await)
        }
    }

    /// Extract an error from a failed response.
    async fn extract_error(&self, response: reqwest::Response) -> Error {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        match serde_json::from_str::<UpstreamError>(&body) {
            Ok(err) => {
                tracing::debug!(status, code = %err.code, message = %err.message, "API error");
                if status == 404 {
                    Error::NotFound(err.message)
                } else if status == 401 {
                    Error::Auth(err.message)
                } else {
                    Error::Api {
                        status,
                        code: err.code,
                        message: err.message,
                    }
                }
            }
            Err(_) => Error::Api {
                status,
                code: "unknown".to_string(),
                message: if body.trim().is_empty() {
                    format!("HTTP {}", status)
                } else {
                    body
                },
            },
        }
    }
}

/// Builder for creating a DifyClient.
#[derive(Debug)]
pub struct ClientBuilder {
    host: Option<String>,
    api_secret: Option<String>,
    timeout: Duration,
    stream_timeout: Duration,
    user_agent: Option<String>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            host: None,
            api_secret: None,
            timeout: DEFAULT_TIMEOUT,
            stream_timeout: DEFAULT_STREAM_TIMEOUT,
            user_agent: None,
        }
    }

    /// Set the service host, e.g. `https://api.dify.ai`.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    /// Set the default app API secret.
    pub fn api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the streaming request timeout.
    ///
    /// Bounds the whole stream, body included.
    pub fn stream_timeout(mut self, timeout: Duration) -> Self {
        self.stream_timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Build the client.
    pub fn build(self) -> Result<DifyClient> {
        let host = self
            .host
            .ok_or_else(|| Error::Config("host is required".to_string()))?;

        // Parse and normalize base URL
        let mut base_url = Url::parse(&host)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/json; charset=utf-8"),
        );
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("dify-client/{}", env!("CARGO_PKG_VERSION")));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(user_agent)
            .build()?;

        Ok(DifyClient {
            inner: Arc::new(ClientInner {
                http,
                base_url,
                api_secret: self.api_secret.filter(|s| !s.is_empty()),
                timeout: self.timeout,
                stream_timeout: self.stream_timeout,
            }),
            api_secret: None,
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
