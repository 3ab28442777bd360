use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

/// How the process talks to the outside world. The MCP protocol itself always
/// runs over stdio; `Http` additionally starts the health/metrics listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    #[default]
    Stdio,
    Http,
}

impl std::fmt::Display for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    18791
}

fn default_shutdown_grace_secs() -> f64 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub transport: Transport,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_shutdown_grace_secs", rename = "shutdownGraceSecs")]
    pub shutdown_grace_secs: f64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: Transport::Stdio,
            host: default_host(),
            port: default_port(),
            shutdown_grace_secs: default_shutdown_grace_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Security caps
// ---------------------------------------------------------------------------

fn default_max_args_len() -> usize {
    2048
}

fn default_max_stdout_bytes() -> usize {
    1_048_576
}

fn default_max_stderr_bytes() -> usize {
    262_144
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    #[serde(default = "default_max_args_len", rename = "maxArgsLen")]
    pub max_args_len: usize,
    #[serde(default = "default_max_stdout_bytes", rename = "maxStdoutBytes")]
    pub max_stdout_bytes: usize,
    #[serde(default = "default_max_stderr_bytes", rename = "maxStderrBytes")]
    pub max_stderr_bytes: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_args_len: default_max_args_len(),
            max_stdout_bytes: default_max_stdout_bytes(),
            max_stderr_bytes: default_max_stderr_bytes(),
        }
    }
}

// ---------------------------------------------------------------------------
// Circuit breaker
// ---------------------------------------------------------------------------

fn default_failure_threshold() -> u32 {
    5
}

fn default_recovery_timeout_secs() -> u64 {
    60
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_failure_threshold", rename = "failureThreshold")]
    pub failure_threshold: u32,
    #[serde(
        default = "default_recovery_timeout_secs",
        rename = "recoveryTimeoutSecs"
    )]
    pub recovery_timeout_secs: u64,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: default_failure_threshold(),
            recovery_timeout_secs: default_recovery_timeout_secs(),
        }
    }
}

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// "text" or "json".
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool defaults and registry filters
// ---------------------------------------------------------------------------

fn default_timeout_secs() -> u64 {
    300
}

fn default_concurrency() -> usize {
    2
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    #[serde(default = "default_timeout_secs", rename = "defaultTimeoutSecs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_concurrency", rename = "defaultConcurrency")]
    pub default_concurrency: usize,
    /// When non-empty, only the named tools are registered.
    #[serde(default)]
    pub include: Vec<String>,
    /// Tools to leave out of the registry entirely.
    #[serde(default)]
    pub exclude: Vec<String>,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_timeout_secs(),
            default_concurrency: default_concurrency(),
            include: Vec::new(),
            exclude: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub security: SecurityConfig,
    #[serde(default, rename = "circuitBreaker", alias = "circuit_breaker")]
    pub circuit_breaker: CircuitBreakerConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub tool: ToolConfig,
}

impl Config {
    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), crate::errors::RangekitError> {
        self.validate_server()?;
        self.validate_security()?;
        self.validate_breaker()?;
        self.validate_logging()?;
        self.validate_tool()?;
        Ok(())
    }

    fn validate_server(&self) -> Result<(), crate::errors::RangekitError> {
        use crate::errors::RangekitError;
        let s = &self.server;

        if s.shutdown_grace_secs.is_nan()
            || s.shutdown_grace_secs.is_infinite()
            || s.shutdown_grace_secs < 0.0
        {
            return Err(RangekitError::Config(
                "server.shutdownGraceSecs must be a finite number >= 0".into(),
            ));
        }
        if s.host.is_empty() {
            return Err(RangekitError::Config("server.host must not be empty".into()));
        }
        Ok(())
    }

    fn validate_security(&self) -> Result<(), crate::errors::RangekitError> {
        use crate::errors::RangekitError;
        let s = &self.security;

        if s.max_args_len == 0 || s.max_args_len > 1_048_576 {
            return Err(RangekitError::Config(
                "security.maxArgsLen must be between 1 and 1048576".into(),
            ));
        }
        if s.max_stdout_bytes == 0 {
            return Err(RangekitError::Config(
                "security.maxStdoutBytes must be > 0".into(),
            ));
        }
        if s.max_stderr_bytes == 0 {
            return Err(RangekitError::Config(
                "security.maxStderrBytes must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_breaker(&self) -> Result<(), crate::errors::RangekitError> {
        use crate::errors::RangekitError;
        let b = &self.circuit_breaker;

        if b.failure_threshold == 0 {
            return Err(RangekitError::Config(
                "circuitBreaker.failureThreshold must be > 0".into(),
            ));
        }
        if b.recovery_timeout_secs == 0 {
            return Err(RangekitError::Config(
                "circuitBreaker.recoveryTimeoutSecs must be > 0".into(),
            ));
        }
        Ok(())
    }

    fn validate_logging(&self) -> Result<(), crate::errors::RangekitError> {
        use crate::errors::RangekitError;

        if !matches!(self.logging.format.as_str(), "text" | "json") {
            return Err(RangekitError::Config(
                "logging.format must be 'text' or 'json'".into(),
            ));
        }
        Ok(())
    }

    fn validate_tool(&self) -> Result<(), crate::errors::RangekitError> {
        use crate::errors::RangekitError;
        let t = &self.tool;

        if t.default_timeout_secs == 0 {
            return Err(RangekitError::Config(
                "tool.defaultTimeoutSecs must be > 0".into(),
            ));
        }
        if t.default_concurrency == 0 || t.default_concurrency > 64 {
            return Err(RangekitError::Config(
                "tool.defaultConcurrency must be between 1 and 64".into(),
            ));
        }
        Ok(())
    }

    /// Serialize the configuration for a diagnostic echo, masking anything
    /// that looks like a credential and stripping userinfo from URL values.
    pub fn redacted_echo(&self) -> serde_json::Value {
        let value = serde_json::to_value(self).unwrap_or_default();
        redact_value(value, "")
    }
}

const SENSITIVE_KEY_MARKERS: &[&str] = &["secret", "token", "password", "apikey", "api_key"];

fn redact_value(value: serde_json::Value, key: &str) -> serde_json::Value {
    let key_lower = key.to_ascii_lowercase();
    match value {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| {
                    let redacted = redact_value(v, &k);
                    (k, redacted)
                })
                .collect(),
        ),
        serde_json::Value::Array(arr) => serde_json::Value::Array(
            arr.into_iter().map(|v| redact_value(v, key)).collect(),
        ),
        serde_json::Value::String(s) => {
            if SENSITIVE_KEY_MARKERS.iter().any(|m| key_lower.contains(m)) {
                return serde_json::Value::String("[REDACTED]".to_string());
            }
            serde_json::Value::String(strip_url_userinfo(&s))
        }
        other => other,
    }
}

/// Strip `user:pass@` from URL-shaped strings so credential-bearing URLs
/// never land in logs verbatim.
fn strip_url_userinfo(s: &str) -> String {
    if !s.contains("://") {
        return s.to_string();
    }
    match url::Url::parse(s) {
        Ok(mut u) if !u.username().is_empty() || u.password().is_some() => {
            let _ = u.set_username("");
            let _ = u.set_password(None);
            u.to_string()
        }
        _ => s.to_string(),
    }
}

#[cfg(test)]
mod tests;
