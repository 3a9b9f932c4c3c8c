//! Named connection contexts for Dify apps.
//!
//! A kubeconfig-style file where each context bundles a host, an app secret
//! and the end-user identity to act as:
//!
//! ```yaml
//! current-context: cloud
//!
//! contexts:
//!   - name: cloud
//!     host: https://api.dify.ai
//!     auth:
//!       type: api-key
//!       key-env: DIFY_API_KEY
//!     user: cli-user
//!     timeout: 60
//!   - name: local
//!     host: http://localhost:5001
//!     auth:
//!       type: api-key
//!       key-file: ~/.config/dify/keys/local.key
//!
//! defaults:
//!   timeout: 30
//!   stream-timeout: 300
//!   user: dify-cli
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

// ─────────────────────────────────────────────────────────────────────────────
// Client Config
// ─────────────────────────────────────────────────────────────────────────────

/// API version for the client config file format.
pub const API_VERSION: &str = "v1";

/// Kind identifier for client config files.
pub const KIND: &str = "ClientConfig";

/// Default config filename.
const CLIENT_CONFIG_FILE: &str = "client.yaml";

/// Application directory name under the platform config dir.
const APP_NAME: &str = "dify";

/// Environment variable overriding the config directory.
const CONFIG_DIR_ENV: &str = "DIFY_CONFIG_DIR";

/// Root client configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ClientConfig {
    /// API version (always "v1" currently).
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Config kind (always "ClientConfig").
    #[serde(default = "default_kind")]
    pub kind: String,

    /// Name of the current/default context.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_context: Option<String>,

    /// Named connection contexts.
    #[serde(default)]
    pub contexts: Vec<Context>,

    /// Settings applied where a context leaves them unset.
    #[serde(default)]
    pub defaults: ClientDefaults,
}

fn default_api_version() -> String {
    API_VERSION.to_string()
}

fn default_kind() -> String {
    KIND.to_string()
}

impl ClientConfig {
    /// Create an empty client config.
    pub fn new() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            ..Default::default()
        }
    }

    /// Parse from a YAML string.
    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        serde_yaml::from_str(yaml_str).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Serialize to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| ConfigError::ParseYaml(e.to_string()))
    }

    /// Get the current context, if set and valid.
    pub fn current(&self) -> Option<&Context> {
        self.current_context
            .as_ref()
            .and_then(|name| self.get_context(name))
    }

    /// Get a context by name.
    pub fn get_context(&self, name: &str) -> Option<&Context> {
        self.contexts.iter().find(|c| c.name == name)
    }

    /// Get a mutable context by name.
    pub fn get_context_mut(&mut self, name: &str) -> Option<&mut Context> {
        self.contexts.iter_mut().find(|c| c.name == name)
    }

    /// Add or update a context.
    pub fn set_context(&mut self, context: Context) {
        match self.get_context_mut(&context.name) {
            Some(existing) => *existing = context,
            None => self.contexts.push(context),
        }
    }

    /// Remove a context by name, clearing `current-context` if it pointed there.
    pub fn remove_context(&mut self, name: &str) -> Option<Context> {
        let pos = self.contexts.iter().position(|c| c.name == name)?;
        if self.current_context.as_deref() == Some(name) {
            self.current_context = None;
        }
        Some(self.contexts.remove(pos))
    }

    /// Set the current context by name.
    ///
    /// Returns an error if the context doesn't exist.
    pub fn use_context(&mut self, name: &str) -> Result<()> {
        if self.get_context(name).is_none() {
            return Err(ConfigError::ContextNotFound(name.to_string()));
        }
        self.current_context = Some(name.to_string());
        Ok(())
    }

    /// List all context names.
    pub fn context_names(&self) -> Vec<&str> {
        self.contexts.iter().map(|c| c.name.as_str()).collect()
    }

    /// Request timeout for a context, falling back to the defaults.
    pub fn effective_timeout(&self, context: &Context) -> Duration {
        Duration::from_secs(context.timeout.unwrap_or(self.defaults.timeout))
    }

    /// End-user identity for a context, falling back to the defaults.
    pub fn effective_user<'a>(&'a self, context: &'a Context) -> &'a str {
        context
            .user
            .as_deref()
            .filter(|u| !u.is_empty())
            .unwrap_or(&self.defaults.user)
    }

    /// Resolve everything needed to connect with a context.
    ///
    /// `name` selects a context explicitly; otherwise the current one is used.
    pub fn resolve(&self, name: Option<&str>) -> Result<ResolvedContext> {
        let context = match name {
            Some(name) => self
                .get_context(name)
                .ok_or_else(|| ConfigError::ContextNotFound(name.to_string()))?,
            None => self.current().ok_or(ConfigError::NoCurrentContext)?,
        };

        let api_key = match &context.auth {
            Some(auth) => auth.resolve()?,
            None => None,
        };

        Ok(ResolvedContext {
            name: context.name.clone(),
            host: context.host.clone(),
            api_key,
            user: self.effective_user(context).to_string(),
            timeout: self.effective_timeout(context),
            stream_timeout: Duration::from_secs(self.defaults.stream_timeout),
        })
    }
}

/// A context with defaults applied and its credential read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedContext {
    /// Context name.
    pub name: String,
    /// Service host.
    pub host: String,
    /// App secret, if one could be found.
    pub api_key: Option<String>,
    /// End-user identity.
    pub user: String,
    /// Request timeout.
    pub timeout: Duration,
    /// Streaming request timeout.
    pub stream_timeout: Duration,
}

// ─────────────────────────────────────────────────────────────────────────────
// Context
// ─────────────────────────────────────────────────────────────────────────────

/// A named connection context (host + app secret + user).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Context {
    /// Unique name for this context.
    pub name: String,

    /// Service host, e.g. `https://api.dify.ai`.
    pub host: String,

    /// Where to find the app secret.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<AuthConfig>,

    /// End-user identity override.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,

    /// Request timeout override (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,
}

impl Context {
    /// Create a context with just a name and host.
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            auth: None,
            user: None,
            timeout: None,
        }
    }

    /// Set the auth configuration.
    pub fn with_auth(mut self, auth: AuthConfig) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set the end-user identity.
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: u64) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Authentication
// ─────────────────────────────────────────────────────────────────────────────

/// Where a context's app secret comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum AuthConfig {
    /// No secret.
    None,

    /// App API key.
    #[serde(rename_all = "kebab-case")]
    ApiKey {
        /// Path to a file containing the key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_file: Option<PathBuf>,
        /// Environment variable containing the key.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key_env: Option<String>,
    },
}

impl AuthConfig {
    /// API key read from a file.
    pub fn api_key_file(path: impl Into<PathBuf>) -> Self {
        Self::ApiKey {
            key_file: Some(path.into()),
            key_env: None,
        }
    }

    /// API key read from an environment variable.
    pub fn api_key_env(var: impl Into<String>) -> Self {
        Self::ApiKey {
            key_file: None,
            key_env: Some(var.into()),
        }
    }

    /// Resolve the actual secret.
    ///
    /// The key file wins over the environment variable; a missing file or an
    /// unset variable is not an error. Blank values count as unset.
    pub fn resolve(&self) -> Result<Option<String>> {
        let AuthConfig::ApiKey { key_file, key_env } = self else {
            return Ok(None);
        };

        if let Some(path) = key_file {
            let expanded = expand_path(path);
            if expanded.exists() {
                let key = std::fs::read_to_string(&expanded).map_err(|e| ConfigError::ReadFile {
                    path: expanded.display().to_string(),
                    source: e,
                })?;
                let key = key.trim();
                if !key.is_empty() {
                    return Ok(Some(key.to_string()));
                }
            }
        }

        if let Some(var) = key_env
            && let Ok(key) = std::env::var(var)
            && !key.trim().is_empty()
        {
            return Ok(Some(key.trim().to_string()));
        }

        Ok(None)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults
// ─────────────────────────────────────────────────────────────────────────────

/// Settings applied where a context leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ClientDefaults {
    /// Request timeout in seconds.
    pub timeout: u64,

    /// Streaming request timeout in seconds.
    pub stream_timeout: u64,

    /// End-user identity.
    pub user: String,
}

impl Default for ClientDefaults {
    fn default() -> Self {
        Self {
            timeout: 30,
            stream_timeout: 300,
            user: "dify-cli".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Loading / Saving
// ─────────────────────────────────────────────────────────────────────────────

/// The config directory: `$DIFY_CONFIG_DIR`, else `<platform config dir>/dify`.
pub fn config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

/// Get the path to the client config file.
pub fn client_config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join(CLIENT_CONFIG_FILE))
}

/// Load the client configuration.
///
/// Returns an empty config if the file doesn't exist.
pub fn load_client_config() -> Result<ClientConfig> {
    load_client_config_from(client_config_path().as_deref())
}

/// Load client config from a specific path.
pub fn load_client_config_from(path: Option<&Path>) -> Result<ClientConfig> {
    let Some(path) = path else {
        return Ok(ClientConfig::new());
    };

    if !path.exists() {
        return Ok(ClientConfig::new());
    }

    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;

    ClientConfig::from_yaml(&contents)
}

/// Save the client configuration.
pub fn save_client_config(config: &ClientConfig) -> Result<()> {
    let path = client_config_path()
        .ok_or_else(|| ConfigError::Other("could not determine config directory".to_string()))?;
    save_client_config_to(config, &path)
}

/// Save client config to a specific path, creating parent directories.
pub fn save_client_config_to(config: &ClientConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::WriteFile {
            path: parent.display().to_string(),
            source: e,
        })?;
    }

    let contents = config.to_yaml()?;
    std::fs::write(path, contents).map_err(|e| ConfigError::WriteFile {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Expand `~/` to the home directory.
fn expand_path(path: &Path) -> PathBuf {
    if let Some(rest) = path.to_str().and_then(|s| s.strip_prefix("~/"))
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: &str = r#"
current-context: cloud

contexts:
  - name: cloud
    host: https://api.dify.ai
    auth:
      type: api-key
      key-env: DIFY_TEST_UNSET_KEY
    user: cli-user
    timeout: 60
  - name: local
    host: http://localhost:5001

defaults:
  timeout: 10
  stream-timeout: 120
  user: someone
"#;

    #[test]
    fn test_empty_config() {
        let config = ClientConfig::new();
        assert_eq!(config.api_version, API_VERSION);
        assert_eq!(config.kind, KIND);
        assert!(config.current_context.is_none());
        assert!(config.contexts.is_empty());
        assert_eq!(config.defaults, ClientDefaults::default());
    }

    #[test]
    fn test_parse_full_yaml() {
        let config = ClientConfig::from_yaml(FULL).unwrap();

        assert_eq!(config.current_context.as_deref(), Some("cloud"));
        assert_eq!(config.context_names(), vec!["cloud", "local"]);

        let cloud = config.current().unwrap();
        assert_eq!(cloud.host, "https://api.dify.ai");
        assert_eq!(cloud.user.as_deref(), Some("cli-user"));
        assert_eq!(cloud.timeout, Some(60));
        assert_eq!(
            cloud.auth,
            Some(AuthConfig::api_key_env("DIFY_TEST_UNSET_KEY"))
        );

        assert_eq!(config.defaults.timeout, 10);
        assert_eq!(config.defaults.stream_timeout, 120);
        assert_eq!(config.defaults.user, "someone");
    }

    #[test]
    fn test_partial_defaults() {
        let config = ClientConfig::from_yaml("defaults:\n  timeout: 5\n").unwrap();
        assert_eq!(config.defaults.timeout, 5);
        assert_eq!(config.defaults.stream_timeout, 300);
        assert_eq!(config.defaults.user, "dify-cli");
    }

    #[test]
    fn test_invalid_yaml() {
        let err = ClientConfig::from_yaml("contexts: [name: ").unwrap_err();
        assert!(matches!(err, ConfigError::ParseYaml(_)));
    }

    #[test]
    fn test_effective_values_fall_back_to_defaults() {
        let config = ClientConfig::from_yaml(FULL).unwrap();
        let cloud = config.get_context("cloud").unwrap();
        let local = config.get_context("local").unwrap();

        assert_eq!(config.effective_timeout(cloud), Duration::from_secs(60));
        assert_eq!(config.effective_timeout(local), Duration::from_secs(10));
        assert_eq!(config.effective_user(cloud), "cli-user");
        assert_eq!(config.effective_user(local), "someone");
    }

    #[test]
    fn test_resolve_context() {
        let config = ClientConfig::from_yaml(FULL).unwrap();

        let current = config.resolve(None).unwrap();
        assert_eq!(current.name, "cloud");
        assert_eq!(current.api_key, None);
        assert_eq!(current.stream_timeout, Duration::from_secs(120));

        let local = config.resolve(Some("local")).unwrap();
        assert_eq!(local.host, "http://localhost:5001");
        assert_eq!(local.user, "someone");

        assert!(matches!(
            config.resolve(Some("nope")),
            Err(ConfigError::ContextNotFound(_))
        ));
        assert!(matches!(
            ClientConfig::new().resolve(None),
            Err(ConfigError::NoCurrentContext)
        ));
    }

    #[test]
    fn test_set_context() {
        let mut config = ClientConfig::new();

        config.set_context(Context::new("local", "http://localhost:5001"));
        assert_eq!(config.contexts.len(), 1);

        config.set_context(Context::new("local", "http://localhost:8080"));
        assert_eq!(config.contexts.len(), 1);
        assert_eq!(config.contexts[0].host, "http://localhost:8080");
    }

    #[test]
    fn test_remove_context() {
        let mut config = ClientConfig::new();
        config.set_context(Context::new("local", "http://localhost:5001"));
        config.set_context(Context::new("cloud", "https://api.dify.ai"));
        config.use_context("local").unwrap();

        let removed = config.remove_context("cloud").unwrap();
        assert_eq!(removed.name, "cloud");
        assert_eq!(config.current_context.as_deref(), Some("local"));

        config.remove_context("local");
        assert!(config.current_context.is_none());
        assert!(config.remove_context("local").is_none());
    }

    #[test]
    fn test_use_context() {
        let mut config = ClientConfig::new();
        config.set_context(Context::new("local", "http://localhost:5001"));

        config.use_context("local").unwrap();
        assert_eq!(config.current_context.as_deref(), Some("local"));

        let err = config.use_context("nonexistent").unwrap_err();
        assert!(matches!(err, ConfigError::ContextNotFound(_)));
        assert_eq!(config.current_context.as_deref(), Some("local"));
    }

    #[test]
    fn test_roundtrip_yaml() {
        let mut config = ClientConfig::new();
        config.set_context(
            Context::new("local", "http://localhost:5001")
                .with_user("tester")
                .with_timeout(15),
        );
        config.set_context(
            Context::new("cloud", "https://api.dify.ai")
                .with_auth(AuthConfig::api_key_file("~/.config/dify/keys/cloud.key")),
        );
        config.use_context("local").unwrap();

        let yaml = config.to_yaml().unwrap();
        assert!(yaml.contains("current-context: local"));
        assert!(yaml.contains("key-file:"));

        let reparsed = ClientConfig::from_yaml(&yaml).unwrap();
        assert_eq!(reparsed.current_context, config.current_context);
        assert_eq!(reparsed.contexts, config.contexts);
    }

    #[test]
    fn test_auth_resolve_prefers_file() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("app.key");
        std::fs::write(&key_path, "app-from-file\n").unwrap();

        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("DIFY_TEST_KEY_BOTH", "app-from-env");
        }
        let auth = AuthConfig::ApiKey {
            key_file: Some(key_path),
            key_env: Some("DIFY_TEST_KEY_BOTH".to_string()),
        };
        assert_eq!(auth.resolve().unwrap(), Some("app-from-file".to_string()));
        // SAFETY: cleanup of the same test-only variable
        unsafe {
            std::env::remove_var("DIFY_TEST_KEY_BOTH");
        }
    }

    #[test]
    fn test_auth_resolve_env_when_file_missing() {
        // SAFETY: variable name is unique to this test
        unsafe {
            std::env::set_var("DIFY_TEST_KEY_ENV", "app-from-env");
        }
        let auth = AuthConfig::ApiKey {
            key_file: Some(PathBuf::from("/nonexistent/dify/app.key")),
            key_env: Some("DIFY_TEST_KEY_ENV".to_string()),
        };
        assert_eq!(auth.resolve().unwrap(), Some("app-from-env".to_string()));
        // SAFETY: cleanup of the same test-only variable
        unsafe {
            std::env::remove_var("DIFY_TEST_KEY_ENV");
        }
    }

    #[test]
    fn test_auth_none_resolve() {
        assert!(AuthConfig::None.resolve().unwrap().is_none());
        assert!(
            AuthConfig::api_key_env("DIFY_TEST_UNSET_KEY")
                .resolve()
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_load_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("client.yaml");

        let missing = load_client_config_from(Some(&path)).unwrap();
        assert!(missing.contexts.is_empty());

        let mut config = ClientConfig::new();
        config.set_context(Context::new("local", "http://localhost:5001"));
        config.use_context("local").unwrap();
        save_client_config_to(&config, &path).unwrap();

        let loaded = load_client_config_from(Some(&path)).unwrap();
        assert_eq!(loaded.current().unwrap().host, "http://localhost:5001");
    }

    #[test]
    fn test_expand_path() {
        let expanded = expand_path(Path::new("~/keys/app.key"));
        if dirs::home_dir().is_some() {
            assert!(!expanded.to_string_lossy().starts_with("~/"));
        }

        let absolute = PathBuf::from("/absolute/path");
        assert_eq!(expand_path(&absolute), absolute);
    }
}
