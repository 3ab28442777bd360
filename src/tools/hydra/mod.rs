//! hydra profile: online credential tester.
//!
//! The target grammar is richer than the scanners': `host:service`,
//! `host:port:service`, or `service://host[:port]`, normalized to the
//! `service://` form before spawning. Credential material must be supplied
//! by the caller — the substrate never fabricates logins — and wordlists
//! are size-capped so a stray file cannot turn one invocation into a
//! multi-day brute force.

use crate::safety::target::is_lab_target;
use crate::tools::base::{Rejection, ToolDescriptor, ToolInput, ToolProfile};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncBufReadExt;
use tracing::warn;

const SERVICES: &[&str] = &[
    "ssh",
    "ftp",
    "telnet",
    "http",
    "https",
    "smb",
    "ldap",
    "rdp",
    "mysql",
    "postgresql",
    "vnc",
];

/// Parallel task ceiling; `-t` values above this are clamped.
const MAX_THREADS: u32 = 16;
/// Largest password list accepted, in lines.
const MAX_PASSWORD_LINES: usize = 10_000;
/// Largest login list accepted, in bytes.
const MAX_LOGIN_BYTES: u64 = 1_048_576;

const ALLOWED_FLAGS: &[&str] = &[
    "-l", "-L", "-p", "-P", "-t", "-s", "-S", "-f", "-e", "-u", "-v", "-V", "-w", "-W", "-o",
    "-I",
];

#[derive(Debug, PartialEq, Eq)]
struct HydraTarget {
    host: String,
    port: Option<u16>,
    service: String,
}

impl HydraTarget {
    fn canonical(&self) -> String {
        match self.port {
            Some(port) => format!("{}://{}:{}", self.service, self.host, port),
            None => format!("{}://{}", self.service, self.host),
        }
    }
}

fn parse_target(target: &str) -> Result<HydraTarget, Rejection> {
    let shape_hint = "use host:service, host:port:service, or service://host[:port]";

    let (host, port, service) = if let Some((service, rest)) = target.split_once("://") {
        match rest.split_once(':') {
            Some((host, port)) => {
                let port = port.parse::<u16>().map_err(|_| {
                    Rejection::new(format!("invalid port in target '{}'", target), shape_hint)
                })?;
                (host.to_string(), Some(port), service.to_string())
            }
            None => (rest.to_string(), None, service.to_string()),
        }
    } else {
        let parts: Vec<&str> = target.split(':').collect();
        match parts.as_slice() {
            [host, service] => (host.to_string(), None, service.to_string()),
            [host, port, service] => {
                let port = port.parse::<u16>().map_err(|_| {
                    Rejection::new(format!("invalid port in target '{}'", target), shape_hint)
                })?;
                (host.to_string(), Some(port), service.to_string())
            }
            _ => {
                return Err(Rejection::new(
                    format!("target '{}' does not name a service", target),
                    shape_hint,
                ));
            }
        }
    };

    if !SERVICES.contains(&service.as_str()) {
        return Err(Rejection::new(
            format!("service '{}' is not supported", service),
            format!("supported services: {}", SERVICES.join(", ")),
        ));
    }
    if host.is_empty() {
        return Err(Rejection::new(
            format!("target '{}' has no host", target),
            shape_hint,
        ));
    }
    Ok(HydraTarget {
        host,
        port,
        service,
    })
}

/// Value token following `flag`, if the flag is present.
fn flag_value<'a>(tokens: &'a [String], flag: &str) -> Option<&'a str> {
    tokens
        .iter()
        .position(|t| t == flag)
        .and_then(|i| tokens.get(i + 1))
        .map(String::as_str)
}

async fn check_password_file(path: &str) -> Result<(), Rejection> {
    let file = tokio::fs::File::open(path).await.map_err(|e| {
        Rejection::new(
            format!("cannot read password file '{}': {}", path, e),
            "pass a password list readable by the server process",
        )
    })?;
    let mut lines = tokio::io::BufReader::new(file).lines();
    let mut count = 0usize;
    while lines.next_line().await.map_err(|e| {
        Rejection::new(
            format!("cannot read password file '{}': {}", path, e),
            "pass a valid text file",
        )
    })?
    .is_some()
    {
        count += 1;
        if count > MAX_PASSWORD_LINES {
            return Err(Rejection::new(
                format!(
                    "password file '{}' exceeds {} lines",
                    path, MAX_PASSWORD_LINES
                ),
                "trim the wordlist or split it across invocations",
            ));
        }
    }
    Ok(())
}

async fn check_login_file(path: &str) -> Result<(), Rejection> {
    let meta = tokio::fs::metadata(path).await.map_err(|e| {
        Rejection::new(
            format!("cannot read login file '{}': {}", path, e),
            "pass a login list readable by the server process",
        )
    })?;
    if meta.len() > MAX_LOGIN_BYTES {
        return Err(Rejection::new(
            format!(
                "login file '{}' is {} bytes, limit is {}",
                path,
                meta.len(),
                MAX_LOGIN_BYTES
            ),
            "trim the login list below 1 MiB",
        ));
    }
    Ok(())
}

pub struct HydraTool {
    descriptor: ToolDescriptor,
}

impl HydraTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "hydra",
                command: "hydra",
                description: "Online credential tester against a lab service \
                              (host:service, host:port:service, or service://host[:port]). \
                              Requires -l/-L and/or -p/-P credential arguments.",
                allowed_flags: ALLOWED_FLAGS,
                default_timeout: Some(Duration::from_secs(1200)),
                concurrency: Some(1),
                failure_threshold: None,
                recovery_timeout: None,
                allowed_modes: &[],
            },
        }
    }
}

impl Default for HydraTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolProfile for HydraTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn preflight(&self, input: &ToolInput) -> Result<(), Rejection> {
        let parsed = parse_target(&input.target)?;
        if !is_lab_target(&parsed.host) {
            return Err(Rejection::new(
                format!("host '{}' is not an authorized lab target", parsed.host),
                "use an RFC1918 or loopback IPv4 address or a .lab.internal hostname",
            ));
        }

        let tokens = crate::safety::args::tokenize(&input.extra_args).map_err(|e| {
            Rejection::new(e, "fix the quoting or characters in extra_args")
        })?;

        if !tokens
            .iter()
            .any(|t| matches!(t.as_str(), "-l" | "-L" | "-p" | "-P"))
        {
            return Err(Rejection::new(
                "no credential arguments supplied".to_string(),
                "pass at least one of -l <login>, -L <file>, -p <password>, -P <file>",
            ));
        }

        if let Some(path) = flag_value(&tokens, "-P") {
            check_password_file(path).await?;
        }
        if let Some(path) = flag_value(&tokens, "-L") {
            check_login_file(path).await?;
        }
        Ok(())
    }

    /// Clamp `-t` to the thread ceiling. The flag itself is preserved;
    /// only an excessive value is lowered.
    fn optimize(&self, tokens: Vec<String>, _target: &str) -> Vec<String> {
        let mut optimized = tokens;
        let mut clamp_next = false;
        for token in &mut optimized {
            if clamp_next {
                clamp_next = false;
                if token.parse::<u32>().is_ok_and(|n| n > MAX_THREADS) {
                    warn!(tool = "hydra", "clamping -t {} to {}", token, MAX_THREADS);
                    *token = MAX_THREADS.to_string();
                }
                continue;
            }
            if token == "-t" {
                clamp_next = true;
            } else if let Some(rest) = token.strip_prefix("-t")
                && rest.parse::<u32>().is_ok_and(|n| n > MAX_THREADS)
            {
                warn!(tool = "hydra", "clamping {} to -t{}", token, MAX_THREADS);
                *token = format!("-t{}", MAX_THREADS);
            }
        }
        optimized
    }

    /// Append the normalized `service://host[:port]` form.
    fn assemble(&self, tokens: Vec<String>, target: &str) -> Vec<String> {
        let canonical = parse_target(target)
            .map_or_else(|_| target.to_string(), |t| t.canonical());
        let mut argv = tokens;
        argv.push(canonical);
        argv
    }
}

#[cfg(test)]
mod tests;
