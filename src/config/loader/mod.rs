use crate::config::schema::{Config, Transport};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Environment variable naming the config file when `--config` is not given.
pub const CONFIG_PATH_ENV: &str = "RANGEKIT_CONFIG";

pub fn get_config_path() -> Option<PathBuf> {
    std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from)
}

/// Load configuration: file (YAML or JSON) merged onto defaults, then
/// environment overrides merged on top, then validation.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    let env_path = get_config_path();
    let path = config_path.or(env_path.as_deref());

    let mut config = match path {
        Some(p) if p.exists() => parse_config_file(p)?,
        Some(p) => {
            anyhow::bail!("config file {} does not exist", p.display());
        }
        None => Config::default(),
    };

    apply_env_overrides(&mut config);

    config
        .validate()
        .with_context(|| "Configuration validation failed")?;

    Ok(config)
}

fn parse_config_file(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;

    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config JSON from {}", path.display()))
    } else {
        // YAML is the default; it also accepts JSON content.
        serde_yaml_ng::from_str(&content)
            .with_context(|| format!("Failed to parse config YAML from {}", path.display()))
    }
}

/// Environment overrides. Unparseable values are logged and skipped rather
/// than aborting startup.
pub fn apply_env_overrides(config: &mut Config) {
    if let Ok(raw) = std::env::var("MCP_TRANSPORT") {
        match raw.to_ascii_lowercase().as_str() {
            "stdio" => config.server.transport = Transport::Stdio,
            "http" => config.server.transport = Transport::Http,
            other => warn!("ignoring MCP_TRANSPORT={}: expected stdio or http", other),
        }
    }

    override_parsed(
        "SHUTDOWN_GRACE",
        &mut config.server.shutdown_grace_secs,
    );
    override_parsed("MCP_MAX_ARGS_LEN", &mut config.security.max_args_len);
    override_parsed(
        "MCP_MAX_STDOUT_BYTES",
        &mut config.security.max_stdout_bytes,
    );
    override_parsed(
        "MCP_MAX_STDERR_BYTES",
        &mut config.security.max_stderr_bytes,
    );
    override_parsed(
        "MCP_DEFAULT_TIMEOUT_SEC",
        &mut config.tool.default_timeout_secs,
    );
    override_parsed(
        "MCP_DEFAULT_CONCURRENCY",
        &mut config.tool.default_concurrency,
    );

    if let Ok(raw) = std::env::var("TOOL_INCLUDE") {
        config.tool.include = parse_csv(&raw);
    }
    if let Ok(raw) = std::env::var("TOOL_EXCLUDE") {
        config.tool.exclude = parse_csv(&raw);
    }

    if let Ok(raw) = std::env::var("LOG_LEVEL")
        && !raw.is_empty()
    {
        config.logging.level = raw;
    }
    if let Ok(raw) = std::env::var("LOG_FORMAT")
        && !raw.is_empty()
    {
        config.logging.format = raw.to_ascii_lowercase();
    }
}

fn override_parsed<T: std::str::FromStr>(var: &str, slot: &mut T) {
    if let Ok(raw) = std::env::var(var) {
        match raw.parse::<T>() {
            Ok(v) => *slot = v,
            Err(_) => warn!("ignoring {}={}: not a valid value", var, raw),
        }
    }
}

fn parse_csv(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests;
