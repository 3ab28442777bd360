//! gobuster profile: content, DNS, and vhost discovery.
//!
//! gobuster is the one tool here that takes a mode subcommand, so its
//! argument shape differs from the scanners: the mode leads the argv and the
//! target travels through `-u` (dir/vhost) or `-d` (dns) instead of a
//! trailing positional.

use crate::safety::target::is_lab_target;
use crate::tools::base::{Rejection, ToolDescriptor, ToolInput, ToolProfile};
use async_trait::async_trait;
use std::time::Duration;

const MODES: &[&str] = &["dir", "dns", "vhost"];

const ALLOWED_FLAGS: &[&str] = &[
    "-u",
    "-d",
    "-w",
    "-t",
    "-s",
    "-b",
    "-x",
    "-o",
    "-k",
    "-q",
    "-z",
    "-r",
    "--wordlist",
    "--threads",
    "--timeout",
    "--delay",
    "--no-error",
    "--status-codes",
    "--status-codes-blacklist",
    "--useragent",
    "--username",
    "--password",
    "--extensions",
    "--expanded",
    "--follow-redirect",
    "--no-tls-validation",
    "--append-domain",
    "--wildcard",
];

pub struct GobusterTool {
    descriptor: ToolDescriptor,
}

impl GobusterTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "gobuster",
                command: "gobuster",
                description: "Content and name discovery. extra_args must start with a \
                              mode (dir, dns, vhost); dir/vhost take an http(s) lab URL \
                              target, dns takes a lab hostname.",
                allowed_flags: ALLOWED_FLAGS,
                default_timeout: Some(Duration::from_secs(1200)),
                concurrency: Some(1),
                failure_threshold: None,
                recovery_timeout: None,
                allowed_modes: MODES,
            },
        }
    }

    fn mode_of(tokens: &[String]) -> Option<&str> {
        tokens
            .first()
            .map(String::as_str)
            .filter(|m| MODES.contains(m))
    }
}

impl Default for GobusterTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Authorize an http(s) URL whose host is a lab address or `.lab.internal`
/// name. Shared with the sqlmap profile.
pub(crate) fn ensure_lab_url(target: &str) -> Result<url::Url, Rejection> {
    let parsed = url::Url::parse(target).map_err(|e| {
        Rejection::new(
            format!("target '{}' is not a valid URL: {}", target, e),
            "pass a full http(s) URL, e.g. http://10.0.0.5/",
        )
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(Rejection::new(
            format!("URL scheme '{}' is not allowed", parsed.scheme()),
            "only http and https targets are supported",
        ));
    }
    let Some(host) = parsed.host_str() else {
        return Err(Rejection::new(
            format!("target '{}' has no host", target),
            "pass a full http(s) URL, e.g. http://10.0.0.5/",
        ));
    };
    if !is_lab_target(host) {
        return Err(Rejection::new(
            format!("URL host '{}' is not an authorized lab target", host),
            "use an RFC1918 or loopback IPv4 address or a .lab.internal hostname",
        ));
    }
    Ok(parsed)
}

#[async_trait]
impl ToolProfile for GobusterTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn preflight(&self, input: &ToolInput) -> Result<(), Rejection> {
        let tokens = crate::safety::args::tokenize(&input.extra_args).map_err(|e| {
            Rejection::new(e, "fix the quoting or characters in extra_args")
        })?;

        let Some(mode) = Self::mode_of(&tokens) else {
            return Err(Rejection::new(
                "extra_args must start with a gobuster mode".to_string(),
                "lead extra_args with one of: dir, dns, vhost",
            ));
        };
        if tokens[1..].iter().any(|t| MODES.contains(&t.as_str())) {
            return Err(Rejection::new(
                "multiple gobuster modes supplied".to_string(),
                "pass exactly one of dir, dns, vhost",
            ));
        }

        match mode {
            "dns" => {
                if input.target.contains("://") {
                    return Err(Rejection::new(
                        "dns mode takes a bare domain, not a URL".to_string(),
                        "pass a .lab.internal hostname as the target",
                    ));
                }
                if !is_lab_target(&input.target) {
                    return Err(Rejection::new(
                        format!(
                            "target '{}' is not an authorized lab domain",
                            input.target
                        ),
                        "use a .lab.internal hostname",
                    ));
                }
            }
            _ => {
                // dir and vhost enumerate an HTTP server
                ensure_lab_url(&input.target)?;
            }
        }
        Ok(())
    }

    /// Inject the target flag and per-mode thread/status defaults after the
    /// mode token, ahead of the user's own flags.
    fn optimize(&self, tokens: Vec<String>, target: &str) -> Vec<String> {
        let Some(mode) = Self::mode_of(&tokens).map(str::to_string) else {
            return tokens; // preflight already refused this shape
        };
        let rest = &tokens[1..];

        let mut optimized = vec![mode.clone()];
        let target_flag = if mode == "dns" { "-d" } else { "-u" };
        if !rest.iter().any(|t| t == target_flag) {
            optimized.push(target_flag.to_string());
            optimized.push(target.to_string());
        }
        if !rest
            .iter()
            .any(|t| t == "-t" || t.starts_with("--threads"))
        {
            optimized.push("-t".to_string());
            optimized.push(if mode == "dns" { "20" } else { "40" }.to_string());
        }
        if mode == "dir"
            && !rest.iter().any(|t| {
                t == "-s" || t == "-b" || t.starts_with("--status-codes")
            })
        {
            optimized.push("-b".to_string());
            optimized.push("404".to_string());
        }
        optimized.extend(rest.iter().cloned());
        optimized
    }

    /// The target was injected as a flag; nothing is appended positionally.
    fn assemble(&self, tokens: Vec<String>, _target: &str) -> Vec<String> {
        tokens
    }
}

#[cfg(test)]
mod tests;
