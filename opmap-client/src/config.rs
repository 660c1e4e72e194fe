//! Transport configuration.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use crate::error::ConfigError;
use crate::retry::RetryConfig;

/// Environment variable holding the base URL.
pub const ENV_BASE_URL: &str = "OPMAP_BASE_URL";
/// Environment variable holding the request timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "OPMAP_TIMEOUT_MS";
/// Environment variable holding the user agent.
pub const ENV_USER_AGENT: &str = "OPMAP_USER_AGENT";
/// Environment variable toggling errors for non-2xx responses.
pub const ENV_THROW_HTTP_ERRORS: &str = "OPMAP_THROW_HTTP_ERRORS";

/// Configuration for [`HttpTransport`](crate::HttpTransport).
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Base URL operation paths are resolved against.
    pub base_url: Option<String>,
    /// Default request timeout.
    pub timeout: Duration,
    /// Connection timeout.
    pub connect_timeout: Duration,
    /// Headers sent with every request; request headers win.
    pub default_headers: Vec<(String, String)>,
    /// User agent string.
    pub user_agent: String,
    /// Default retry policy; none retries nothing.
    pub retry: Option<RetryConfig>,
    /// Turn non-2xx responses into [`ClientError::Response`](crate::ClientError::Response).
    pub throw_http_errors: bool,
    /// Follow redirects.
    pub follow_redirects: bool,
    /// Maximum redirects to follow.
    pub max_redirects: usize,
    /// Enable gzip decompression.
    pub gzip: bool,
    /// Enable brotli decompression.
    pub brotli: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            default_headers: Vec::new(),
            user_agent: format!("opmap-client/{}", env!("CARGO_PKG_VERSION")),
            retry: None,
            throw_http_errors: false,
            follow_redirects: true,
            max_redirects: 10,
            gzip: true,
            brotli: true,
        }
    }
}

impl ClientConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Load from a `.json` or `.toml` file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        let content = std::fs::read_to_string(path)?;

        let file: ConfigFile = match ext.as_str() {
            "json" => serde_json::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("JSON parse error: {e}")))?,
            "toml" => toml::from_str(&content)
                .map_err(|e| ConfigError::Parse(format!("TOML parse error: {e}")))?,
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        Ok(file.into_config())
    }

    /// Load from `OPMAP_*` environment variables over the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load from a variable lookup function over the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(base_url) = lookup(ENV_BASE_URL) {
            config.base_url = Some(base_url);
        }
        if let Some(value) = lookup(ENV_TIMEOUT_MS) {
            let millis = value.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                name: ENV_TIMEOUT_MS,
                value: value.clone(),
            })?;
            config.timeout = Duration::from_millis(millis);
        }
        if let Some(user_agent) = lookup(ENV_USER_AGENT) {
            config.user_agent = user_agent;
        }
        if let Some(value) = lookup(ENV_THROW_HTTP_ERRORS) {
            config.throw_http_errors = parse_flag(&value).ok_or(ConfigError::InvalidEnv {
                name: ENV_THROW_HTTP_ERRORS,
                value,
            })?;
        }

        Ok(config)
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => None,
    }
}

/// On-disk configuration shape.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    base_url: Option<String>,
    timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    user_agent: Option<String>,
    throw_http_errors: Option<bool>,
    follow_redirects: Option<bool>,
    max_redirects: Option<usize>,
    headers: BTreeMap<String, String>,
    retry: Option<RetryFile>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RetryFile {
    max_attempts: u32,
    #[serde(default = "default_initial_delay_ms")]
    initial_delay_ms: u64,
    status_codes: Option<Vec<u16>>,
}

fn default_initial_delay_ms() -> u64 {
    100
}

impl ConfigFile {
    fn into_config(self) -> ClientConfig {
        let defaults = ClientConfig::default();

        let retry = self.retry.map(|r| {
            let config =
                RetryConfig::exponential(r.max_attempts, Duration::from_millis(r.initial_delay_ms));
            match r.status_codes {
                Some(codes) => config.with_status_codes(codes),
                None => config,
            }
        });

        ClientConfig {
            base_url: self.base_url,
            timeout: self
                .timeout_ms
                .map_or(defaults.timeout, Duration::from_millis),
            connect_timeout: self
                .connect_timeout_ms
                .map_or(defaults.connect_timeout, Duration::from_millis),
            default_headers: self.headers.into_iter().collect(),
            user_agent: self.user_agent.unwrap_or(defaults.user_agent),
            retry,
            throw_http_errors: self.throw_http_errors.unwrap_or(defaults.throw_http_errors),
            follow_redirects: self.follow_redirects.unwrap_or(defaults.follow_redirects),
            max_redirects: self.max_redirects.unwrap_or(defaults.max_redirects),
            gzip: defaults.gzip,
            brotli: defaults.brotli,
        }
    }
}

/// Builder for [`ClientConfig`].
#[derive(Debug, Default)]
pub struct ClientConfigBuilder {
    config: ClientConfig,
}

impl ClientConfigBuilder {
    /// Set the base URL.
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = Some(url.into());
        self
    }

    /// Set the default request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Set the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Add a header sent with every request.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.push((name.into(), value.into()));
        self
    }

    /// Set the user agent.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.config.user_agent = user_agent.into();
        self
    }

    /// Set the default retry policy.
    pub fn retry(mut self, retry: RetryConfig) -> Self {
        self.config.retry = Some(retry);
        self
    }

    /// Turn non-2xx responses into errors.
    pub fn throw_http_errors(mut self, enable: bool) -> Self {
        self.config.throw_http_errors = enable;
        self
    }

    /// Enable or disable following redirects.
    pub fn follow_redirects(mut self, enable: bool) -> Self {
        self.config.follow_redirects = enable;
        self
    }

    /// Set the maximum number of redirects.
    pub fn max_redirects(mut self, max: usize) -> Self {
        self.config.max_redirects = max;
        self
    }

    /// Build the configuration.
    pub fn build(self) -> ClientConfig {
        self.config
    }
}
