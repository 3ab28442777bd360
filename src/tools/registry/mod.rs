//! Tool registry.
//!
//! Tools are declared in an explicit registration table and instantiated at
//! startup — there is no runtime discovery. Each entry owns the pieces an
//! invocation needs (breaker, concurrency gate, resolved timeout), created
//! once at registration and shared by reference afterwards.

use crate::breaker::CircuitBreaker;
use crate::config::Config;
use crate::tools::base::{self, ExecutionLimits, ToolDescriptor, ToolInput, ToolOutput, ToolProfile};
use crate::tools::gobuster::GobusterTool;
use crate::tools::hydra::HydraTool;
use crate::tools::masscan::MasscanTool;
use crate::tools::nmap::NmapTool;
use crate::tools::sqlmap::SqlmapTool;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info};

/// The registration table. Adding a tool to the server means adding a
/// constructor here.
fn builtin_profiles() -> Vec<Arc<dyn ToolProfile>> {
    vec![
        Arc::new(NmapTool::new()),
        Arc::new(MasscanTool::new()),
        Arc::new(GobusterTool::new()),
        Arc::new(HydraTool::new()),
        Arc::new(SqlmapTool::new()),
    ]
}

/// One registered tool and everything its invocations share.
pub struct ToolEntry {
    profile: Arc<dyn ToolProfile>,
    breaker: Option<Arc<CircuitBreaker>>,
    gate: Arc<Semaphore>,
    timeout: Duration,
    concurrency: usize,
    enabled: AtomicBool,
}

impl ToolEntry {
    fn new(profile: Arc<dyn ToolProfile>, config: &Config) -> Self {
        let desc = profile.descriptor();
        let breaker = config.circuit_breaker.enabled.then(|| {
            let threshold = desc
                .failure_threshold
                .unwrap_or(config.circuit_breaker.failure_threshold);
            let recovery = desc.recovery_timeout.unwrap_or(Duration::from_secs(
                config.circuit_breaker.recovery_timeout_secs,
            ));
            Arc::new(CircuitBreaker::new(desc.name, threshold, recovery))
        });
        let concurrency = desc.concurrency.unwrap_or(config.tool.default_concurrency);
        let timeout = desc
            .default_timeout
            .unwrap_or(Duration::from_secs(config.tool.default_timeout_secs));

        Self {
            profile,
            breaker,
            gate: Arc::new(Semaphore::new(concurrency)),
            timeout,
            concurrency,
            enabled: AtomicBool::new(true),
        }
    }

    pub fn name(&self) -> &'static str {
        self.profile.descriptor().name
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        self.profile.descriptor()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Run one invocation through the execution pipeline.
    pub async fn run(&self, input: ToolInput, limits: &ExecutionLimits) -> ToolOutput {
        base::execute(
            self.profile.as_ref(),
            self.breaker.as_deref(),
            &self.gate,
            limits,
            self.timeout,
            input,
        )
        .await
    }

    pub async fn metadata(&self) -> ToolMetadata {
        let desc = self.profile.descriptor();
        let breaker = match &self.breaker {
            Some(b) => {
                let snap = b.snapshot().await;
                Some(BreakerMetadata {
                    state: snap.state,
                    consecutive_failures: snap.consecutive_failures,
                    failure_threshold: snap.failure_threshold,
                    recovery_timeout_secs: snap.recovery_timeout.as_secs(),
                })
            }
            None => None,
        };
        ToolMetadata {
            name: desc.name,
            command: desc.command,
            description: desc.description,
            concurrency: self.concurrency,
            timeout_secs: self.timeout.as_secs(),
            allowed_flags: desc.allowed_flags,
            breaker,
            enabled: self.is_enabled(),
        }
    }
}

/// Metadata view published over the HTTP surface and used for MCP listings.
#[derive(Debug, Clone, Serialize)]
pub struct ToolMetadata {
    pub name: &'static str,
    pub command: &'static str,
    pub description: &'static str,
    pub concurrency: usize,
    pub timeout_secs: u64,
    pub allowed_flags: &'static [&'static str],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaker: Option<BreakerMetadata>,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct BreakerMetadata {
    pub state: String,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: u64,
}

pub struct Registry {
    entries: BTreeMap<&'static str, Arc<ToolEntry>>,
    limits: ExecutionLimits,
}

impl Registry {
    /// Build the registry from the registration table, honoring the
    /// configured include/exclude filters (case-insensitive tool names).
    pub fn from_config(config: &Config) -> Self {
        let include: Vec<String> = config
            .tool
            .include
            .iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();
        let exclude: Vec<String> = config
            .tool
            .exclude
            .iter()
            .map(|s| s.to_ascii_lowercase())
            .collect();

        let mut entries = BTreeMap::new();
        for profile in builtin_profiles() {
            let name = profile.descriptor().name;
            if !include.is_empty() && !include.iter().any(|s| s == name) {
                debug!("tool '{}' skipped: not in include list", name);
                continue;
            }
            if exclude.iter().any(|s| s == name) {
                info!("tool '{}' excluded by configuration", name);
                continue;
            }
            entries.insert(name, Arc::new(ToolEntry::new(profile, config)));
        }

        Self {
            entries,
            limits: ExecutionLimits {
                max_args_len: config.security.max_args_len,
                max_stdout_bytes: config.security.max_stdout_bytes,
                max_stderr_bytes: config.security.max_stderr_bytes,
            },
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<ToolEntry>> {
        self.entries.get(name).cloned()
    }

    /// Sorted names of every registered tool, enabled or not.
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ToolEntry>> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limits(&self) -> &ExecutionLimits {
        &self.limits
    }

    /// Enable or disable a tool without unregistering it. Disabled tools
    /// stay listed but refuse invocation.
    pub fn set_enabled(&self, name: &str, enabled: bool) -> bool {
        match self.entries.get(name) {
            Some(entry) => {
                entry.enabled.store(enabled, Ordering::Relaxed);
                info!(
                    "tool '{}' {}",
                    name,
                    if enabled { "enabled" } else { "disabled" }
                );
                true
            }
            None => false,
        }
    }

    pub async fn metadata(&self) -> Vec<ToolMetadata> {
        let mut out = Vec::with_capacity(self.entries.len());
        for entry in self.entries.values() {
            out.push(entry.metadata().await);
        }
        out
    }
}
