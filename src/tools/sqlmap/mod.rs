//! sqlmap profile: SQL injection probe.

use crate::tools::base::{Rejection, ToolDescriptor, ToolInput, ToolProfile};
use crate::tools::gobuster::ensure_lab_url;
use async_trait::async_trait;
use std::time::Duration;

/// Ceilings for sqlmap's aggressiveness knobs. Values above are rejected,
/// not silently lowered, so the caller knows what actually ran.
const MAX_RISK: u32 = 2;
const MAX_LEVEL: u32 = 3;

const ALLOWED_FLAGS: &[&str] = &[
    "--batch",
    "--risk",
    "--level",
    "-p",
    "--technique",
    "--dbms",
    "--dbs",
    "--tables",
    "--columns",
    "--schema",
    "--dump",
    "--current-user",
    "--current-db",
    "--is-dba",
    "--users",
    "--cookie",
    "--data",
    "--method",
    "--random-agent",
    "--threads",
    "--time-sec",
    "--timeout",
    "--retries",
    "--forms",
    "--flush-session",
    "--fresh-queries",
];

/// Value of `--flag value` or `--flag=value`, if the flag is present.
fn flag_value<'a>(tokens: &'a [String], flag: &str) -> Option<&'a str> {
    for (i, token) in tokens.iter().enumerate() {
        if token == flag {
            return tokens.get(i + 1).map(String::as_str);
        }
        if let Some(rest) = token.strip_prefix(flag)
            && let Some(value) = rest.strip_prefix('=')
        {
            return Some(value);
        }
    }
    None
}

fn check_bounded_flag(
    tokens: &[String],
    flag: &str,
    max: u32,
) -> Result<(), Rejection> {
    let Some(raw) = flag_value(tokens, flag) else {
        if tokens.iter().any(|t| t == flag) {
            return Err(Rejection::new(
                format!("{} requires a numeric value", flag),
                format!("pass {} <n> with n <= {}", flag, max),
            ));
        }
        return Ok(());
    };
    match raw.parse::<u32>() {
        Ok(n) if n <= max => Ok(()),
        Ok(n) => Err(Rejection::new(
            format!("{} {} exceeds the ceiling of {}", flag, n, max),
            format!("lower {} to at most {}", flag, max),
        )),
        Err(_) => Err(Rejection::new(
            format!("{} value '{}' is not a number", flag, raw),
            format!("pass {} <n> with n <= {}", flag, max),
        )),
    }
}

pub struct SqlmapTool {
    descriptor: ToolDescriptor,
}

impl SqlmapTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "sqlmap",
                command: "sqlmap",
                description: "SQL injection probe against an http(s) lab URL. \
                              --risk is capped at 2 and --level at 3; runs batch mode.",
                allowed_flags: ALLOWED_FLAGS,
                default_timeout: Some(Duration::from_secs(1800)),
                concurrency: Some(1),
                failure_threshold: None,
                recovery_timeout: None,
                allowed_modes: &[],
            },
        }
    }
}

impl Default for SqlmapTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolProfile for SqlmapTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn preflight(&self, input: &ToolInput) -> Result<(), Rejection> {
        ensure_lab_url(&input.target)?;

        let tokens = crate::safety::args::tokenize(&input.extra_args).map_err(|e| {
            Rejection::new(e, "fix the quoting or characters in extra_args")
        })?;
        check_bounded_flag(&tokens, "--risk", MAX_RISK)?;
        check_bounded_flag(&tokens, "--level", MAX_LEVEL)?;
        Ok(())
    }

    /// Force non-interactive operation: sqlmap must never sit waiting for a
    /// keypress under the supervisor.
    fn optimize(&self, tokens: Vec<String>, _target: &str) -> Vec<String> {
        if tokens.iter().any(|t| t == "--batch") {
            return tokens;
        }
        let mut optimized = Vec::with_capacity(tokens.len() + 1);
        optimized.push("--batch".to_string());
        optimized.extend(tokens);
        optimized
    }

    /// sqlmap takes its target through `-u`.
    fn assemble(&self, tokens: Vec<String>, target: &str) -> Vec<String> {
        let mut argv = tokens;
        argv.push("-u".to_string());
        argv.push(target.to_string());
        argv
    }
}

#[cfg(test)]
mod tests;
