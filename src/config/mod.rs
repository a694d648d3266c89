//! Configuration management.
//!
//! Settings are resolved from, in increasing precedence: built-in defaults,
//! an optional TOML file, a `.env` file, and process environment variables.

use crate::{Error, Result};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Default backend host.
const DEFAULT_HOST: &str = "127.0.0.1";
/// Default backend port (Local REST API HTTPS listener).
const DEFAULT_PORT: u16 = 27124;
/// Default backend protocol.
const DEFAULT_PROTOCOL: &str = "https";
/// Default per-request HTTP timeout.
const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 5_000;
/// Default cap on response and request body sizes (50 MiB).
const DEFAULT_MAX_LENGTH: usize = 50 * 1024 * 1024;
/// Default rate limit window (15 minutes).
const DEFAULT_RATE_LIMIT_WINDOW_MS: u64 = 900_000;
/// Default maximum requests per window.
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u32 = 200;
/// Default token budget for a single response.
const DEFAULT_MAX_TOKENS: usize = 20_000;
/// Default tool execution timeout.
const DEFAULT_TOOL_TIMEOUT_MS: u64 = 60_000;
/// Smallest token budget that still leaves room for the truncation notice.
pub const MIN_MAX_TOKENS: usize = 32;

/// Main configuration for the server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Backend REST API settings.
    pub api: ApiConfig,
    /// Rate limiter settings.
    pub rate_limit: RateLimitConfig,
    /// Token ceiling for a single tool response.
    pub max_tokens: usize,
    /// Dispatch timeout for a single tool call.
    pub tool_timeout: Duration,
    /// Logging settings from the config file.
    pub logging: LoggingSettings,
}

/// Backend REST API configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API key sent as a bearer token.
    pub api_key: SecretString,
    /// Whether to verify TLS certificates (the plugin ships a self-signed one).
    pub verify_ssl: bool,
    /// URL scheme, `http` or `https`.
    pub protocol: String,
    /// Backend host.
    pub host: String,
    /// Backend port.
    pub port: u16,
    /// Per-request HTTP timeout.
    pub request_timeout: Duration,
    /// Largest response body accepted, in bytes.
    pub max_content_length: usize,
    /// Largest request body sent, in bytes.
    pub max_body_length: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: SecretString::from(String::new()),
            verify_ssl: false,
            protocol: DEFAULT_PROTOCOL.to_string(),
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            request_timeout: Duration::from_millis(DEFAULT_REQUEST_TIMEOUT_MS),
            max_content_length: DEFAULT_MAX_LENGTH,
            max_body_length: DEFAULT_MAX_LENGTH,
        }
    }
}

impl ApiConfig {
    /// Returns the backend base URL, e.g. `https://127.0.0.1:27124`.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.host, self.port)
    }

    /// Creates a config pointing at an explicit base URL.
    ///
    /// Used by tests and by callers that already know the full endpoint.
    #[must_use]
    pub fn for_base_url(base_url: &str, api_key: impl Into<String>) -> Self {
        let mut config = Self {
            api_key: SecretString::from(api_key.into()),
            ..Self::default()
        };
        let (protocol, rest) = base_url.split_once("://").unwrap_or(("http", base_url));
        config.protocol = protocol.to_string();
        let rest = rest.trim_end_matches('/');
        match rest.rsplit_once(':') {
            Some((host, port)) if port.parse::<u16>().is_ok() => {
                config.host = host.to_string();
                config.port = port.parse().unwrap_or(DEFAULT_PORT);
            },
            _ => {
                config.host = rest.to_string();
                config.port = if protocol == "https" { 443 } else { 80 };
            },
        }
        config
    }
}

/// Rate limit configuration.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u32,
    /// Window duration.
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: DEFAULT_RATE_LIMIT_MAX_REQUESTS,
            window: Duration::from_millis(DEFAULT_RATE_LIMIT_WINDOW_MS),
        }
    }
}

impl RateLimitConfig {
    /// Sets maximum requests per window.
    #[must_use]
    pub const fn with_max_requests(mut self, max: u32) -> Self {
        self.max_requests = max;
        self
    }

    /// Sets window duration.
    #[must_use]
    pub const fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Logging settings as read from the config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoggingSettings {
    /// Output format: `pretty` or `json`.
    pub format: Option<String>,
    /// `EnvFilter` directive, e.g. `obsidian_mcp=debug`.
    pub filter: Option<String>,
    /// Log file path; stderr when unset.
    pub file: Option<PathBuf>,
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Backend section.
    pub api: Option<ConfigFileApi>,
    /// Rate limit section.
    pub rate_limit: Option<ConfigFileRateLimit>,
    /// Server section.
    pub server: Option<ConfigFileServer>,
    /// Logging section.
    pub logging: Option<LoggingSettings>,
}

/// `[api]` section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileApi {
    /// API key.
    pub key: Option<String>,
    /// Verify TLS certificates.
    pub verify_ssl: Option<bool>,
    /// Protocol.
    pub protocol: Option<String>,
    /// Host.
    pub host: Option<String>,
    /// Port.
    pub port: Option<u16>,
    /// Request timeout in milliseconds.
    pub timeout_ms: Option<u64>,
    /// Max response length in bytes.
    pub max_content_length: Option<usize>,
    /// Max request length in bytes.
    pub max_body_length: Option<usize>,
}

/// `[rate_limit]` section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileRateLimit {
    /// Window in milliseconds.
    pub window_ms: Option<u64>,
    /// Max requests per window.
    pub max_requests: Option<u32>,
}

/// `[server]` section in config file.
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ConfigFileServer {
    /// Token budget.
    pub max_tokens: Option<usize>,
    /// Tool timeout in milliseconds.
    pub tool_timeout_ms: Option<u64>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig::default(),
            rate_limit: RateLimitConfig::default(),
            max_tokens: DEFAULT_MAX_TOKENS,
            tool_timeout: Duration::from_millis(DEFAULT_TOOL_TIMEOUT_MS),
            logging: LoggingSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from all sources and validates it.
    ///
    /// `path` overrides the config file location; otherwise
    /// `OBSIDIAN_MCP_CONFIG_PATH` and then the platform config directory are
    /// consulted. A missing default file is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if an explicit config file cannot be read or parsed,
    /// an environment value is malformed, or the API key is missing.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        // A missing .env file is the common case.
        let _ = dotenvy::dotenv();

        let mut config = match resolve_config_path(path) {
            Some(file) => Self::load_from_file(&file)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a TOML file without env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file))
    }

    /// Converts a `ConfigFile` to `ServerConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(api) = file.api {
            if let Some(key) = api.key {
                config.api.api_key = SecretString::from(key);
            }
            if let Some(verify) = api.verify_ssl {
                config.api.verify_ssl = verify;
            }
            if let Some(protocol) = api.protocol {
                config.api.protocol = protocol;
            }
            if let Some(host) = api.host {
                config.api.host = host;
            }
            if let Some(port) = api.port {
                config.api.port = port;
            }
            if let Some(ms) = api.timeout_ms {
                config.api.request_timeout = Duration::from_millis(ms);
            }
            if let Some(len) = api.max_content_length {
                config.api.max_content_length = len;
            }
            if let Some(len) = api.max_body_length {
                config.api.max_body_length = len;
            }
        }

        if let Some(rate_limit) = file.rate_limit {
            if let Some(ms) = rate_limit.window_ms {
                config.rate_limit.window = Duration::from_millis(ms);
            }
            if let Some(max) = rate_limit.max_requests {
                config.rate_limit.max_requests = max;
            }
        }

        if let Some(server) = file.server {
            if let Some(tokens) = server.max_tokens {
                config.max_tokens = tokens;
            }
            if let Some(ms) = server.tool_timeout_ms {
                config.tool_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(logging) = file.logging {
            config.logging = logging;
        }

        config
    }

    /// Applies environment overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if a numeric or boolean variable does
    /// not parse.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OBSIDIAN_API_KEY") {
            self.api.api_key = SecretString::from(key);
        }
        if let Some(verify) = get("OBSIDIAN_VERIFY_SSL") {
            self.api.verify_ssl = parse_bool("OBSIDIAN_VERIFY_SSL", &verify)?;
        }
        if let Some(protocol) = get("OBSIDIAN_PROTOCOL") {
            self.api.protocol = protocol.to_lowercase();
        }
        if let Some(host) = get("OBSIDIAN_HOST") {
            self.api.host = host;
        }
        if let Some(port) = get("OBSIDIAN_PORT") {
            self.api.port = parse_num("OBSIDIAN_PORT", &port)?;
        }
        if let Some(ms) = get("OBSIDIAN_TIMEOUT_MS") {
            self.api.request_timeout = Duration::from_millis(parse_num("OBSIDIAN_TIMEOUT_MS", &ms)?);
        }
        if let Some(len) = get("OBSIDIAN_MAX_CONTENT_LENGTH") {
            self.api.max_content_length = parse_num("OBSIDIAN_MAX_CONTENT_LENGTH", &len)?;
        }
        if let Some(len) = get("OBSIDIAN_MAX_BODY_LENGTH") {
            self.api.max_body_length = parse_num("OBSIDIAN_MAX_BODY_LENGTH", &len)?;
        }
        if let Some(ms) = get("RATE_LIMIT_WINDOW_MS") {
            self.rate_limit.window = Duration::from_millis(parse_num("RATE_LIMIT_WINDOW_MS", &ms)?);
        }
        if let Some(max) = get("RATE_LIMIT_MAX_REQUESTS") {
            self.rate_limit.max_requests = parse_num("RATE_LIMIT_MAX_REQUESTS", &max)?;
        }
        if let Some(tokens) = get("MAX_TOKENS") {
            self.max_tokens = parse_num("MAX_TOKENS", &tokens)?;
        }
        if let Some(ms) = get("TOOL_TIMEOUT_MS") {
            self.tool_timeout = Duration::from_millis(parse_num("TOOL_TIMEOUT_MS", &ms)?);
        }
        if let Some(format) = get("OBSIDIAN_MCP_LOG_FORMAT") {
            self.logging.format = Some(format);
        }
        if let Some(file) = get("OBSIDIAN_MCP_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }

        Ok(())
    }

    /// Checks required settings and value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the offending setting.
    pub fn validate(&self) -> Result<()> {
        if self.api.api_key.expose_secret().trim().is_empty() {
            return Err(Error::InvalidInput(
                "OBSIDIAN_API_KEY is required but not set".to_string(),
            ));
        }
        if !matches!(self.api.protocol.as_str(), "http" | "https") {
            return Err(Error::InvalidInput(format!(
                "OBSIDIAN_PROTOCOL must be http or https, got '{}'",
                self.api.protocol
            )));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(Error::InvalidInput(
                "RATE_LIMIT_MAX_REQUESTS must be at least 1".to_string(),
            ));
        }
        if self.max_tokens < MIN_MAX_TOKENS {
            return Err(Error::InvalidInput(format!(
                "MAX_TOKENS must be at least {MIN_MAX_TOKENS}"
            )));
        }
        Ok(())
    }

    /// Renders the configuration for display with the API key redacted.
    #[must_use]
    pub fn redacted_summary(&self) -> String {
        let key_state = if self.api.api_key.expose_secret().is_empty() {
            "(not set)"
        } else {
            "********"
        };
        format!(
            "Backend URL: {}\nAPI Key: {key_state}\nVerify SSL: {}\nRequest Timeout: {:?}\n\
             Max Content Length: {}\nMax Body Length: {}\nRate Limit: {} requests per {:?}\n\
             Max Tokens: {}\nTool Timeout: {:?}",
            self.api.base_url(),
            self.api.verify_ssl,
            self.api.request_timeout,
            self.api.max_content_length,
            self.api.max_body_length,
            self.rate_limit.max_requests,
            self.rate_limit.window,
            self.max_tokens,
            self.tool_timeout,
        )
    }
}

/// Picks the config file to read, if any.
fn resolve_config_path(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var("OBSIDIAN_MCP_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let dirs = directories::ProjectDirs::from("", "", "obsidian-mcp")?;
    let candidate = dirs.config_dir().join("config.toml");
    candidate.exists().then_some(candidate)
}

fn parse_num<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidInput(format!("{key} must be a number, got '{value}'")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(Error::InvalidInput(format!(
            "{key} must be a boolean, got '{value}'"
        ))),
    }
}
