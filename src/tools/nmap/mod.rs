//! nmap profile: network scanner.

use crate::tools::base::{
    Rejection, ToolDescriptor, ToolInput, ToolProfile, ensure_lab_target,
};
use crate::safety::target::{address_count, parse_cidr};
use async_trait::async_trait;
use std::time::Duration;

/// Widest network a single scan may cover: /22 is 1024 addresses.
const MAX_CIDR_ADDRESSES: u64 = 1024;

/// Scan-type, host-discovery, timing, and output flags. Anything touching
/// input files, interface selection, or decoys stays out.
const ALLOWED_FLAGS: &[&str] = &[
    "-sS",
    "-sT",
    "-sU",
    "-sn",
    "-sV",
    "-sC",
    "-sL",
    "-p",
    "--top-ports",
    "--exclude-ports",
    "-T",
    "-Pn",
    "-PS",
    "-PA",
    "-PE",
    "-n",
    "-O",
    "-A",
    "-F",
    "-v",
    "--open",
    "--reason",
    "--max-parallelism",
    "--max-retries",
    "--min-rate",
    "--max-rate",
    "--host-timeout",
    "--scan-delay",
    "--version-intensity",
    "--script",
    "--script-args",
    "-oN",
    "-oX",
    "-oG",
];

pub struct NmapTool {
    descriptor: ToolDescriptor,
}

impl NmapTool {
    pub fn new() -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: "nmap",
                command: "nmap",
                description: "Network scanner: port discovery, service and version \
                              detection against a lab host or private CIDR (up to /22).",
                allowed_flags: ALLOWED_FLAGS,
                default_timeout: Some(Duration::from_secs(600)),
                concurrency: Some(1),
                failure_threshold: None,
                recovery_timeout: None,
                allowed_modes: &[],
            },
        }
    }
}

impl Default for NmapTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolProfile for NmapTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn preflight(&self, input: &ToolInput) -> Result<(), Rejection> {
        ensure_lab_target(&input.target)?;
        if let Some(net) = parse_cidr(&input.target) {
            let addresses = address_count(net);
            if addresses > MAX_CIDR_ADDRESSES {
                return Err(Rejection::new(
                    format!(
                        "CIDR {} covers {} addresses, limit is {}",
                        input.target, addresses, MAX_CIDR_ADDRESSES
                    ),
                    "split the range into /22 or smaller networks",
                ));
            }
        }
        Ok(())
    }

    /// Inject conservative timing defaults ahead of the user's arguments.
    /// Nothing the user supplied is removed or overridden.
    fn optimize(&self, tokens: Vec<String>, _target: &str) -> Vec<String> {
        let mut optimized = Vec::with_capacity(tokens.len() + 3);
        if !tokens.iter().any(|t| t.starts_with("-T")) {
            optimized.push("-T4".to_string());
        }
        if !tokens.iter().any(|t| t.starts_with("--max-parallelism")) {
            optimized.push("--max-parallelism=10".to_string());
        }
        if !tokens.iter().any(|t| t == "-Pn") {
            optimized.push("-Pn".to_string());
        }
        optimized.extend(tokens);
        optimized
    }
}
