//! masscan profile: high-rate port scanner.

use crate::safety::target::parse_cidr;
use crate::tools::base::{Rejection, ToolDescriptor, ToolInput, ToolProfile, ensure_lab_target};
use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

/// Networks wider than /16 are allowed but logged — they are unusual even
/// for a lab sweep.
const WIDE_CIDR_PREFIX: u8 = 16;

const ALLOWED_FLAGS: &[&str] = &[
    "-p",
    "--ports",
    "--rate",
    "--wait",
    "--retries",
    "--banners",
    "--source-port",
    "--ttl",
    "--connection-timeout",
];

pub struct MasscanTool {
    descriptor: ToolDescriptor,
}

impl MasscanTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "masscan",
                command: "masscan",
                description: "Fast asynchronous port scanner for sweeping a lab host \
                              or private CIDR at a capped packet rate.",
                allowed_flags: ALLOWED_FLAGS,
                default_timeout: Some(Duration::from_secs(300)),
                concurrency: Some(1),
                failure_threshold: None,
                recovery_timeout: None,
                allowed_modes: &[],
            },
        }
    }
}

impl Default for MasscanTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolProfile for MasscanTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn preflight(&self, input: &ToolInput) -> Result<(), Rejection> {
        ensure_lab_target(&input.target)?;
        if let Some(net) = parse_cidr(&input.target)
            && net.prefix_len() < WIDE_CIDR_PREFIX
        {
            warn!(
                tool = "masscan",
                target = %input.target,
                "scanning a network wider than /{}",
                WIDE_CIDR_PREFIX
            );
        }
        Ok(())
    }

    /// Cap the packet rate and add an inter-packet wait unless the caller
    /// chose their own values.
    fn optimize(&self, tokens: Vec<String>, _target: &str) -> Vec<String> {
        let mut optimized = Vec::with_capacity(tokens.len() + 2);
        if !tokens.iter().any(|t| t.starts_with("--rate")) {
            optimized.push("--rate=1000".to_string());
        }
        if !tokens.iter().any(|t| t.starts_with("--wait")) {
            optimized.push("--wait=0.1".to_string());
        }
        optimized.extend(tokens);
        optimized
    }
}
