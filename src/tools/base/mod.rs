//! The tool execution pipeline.
//!
//! Every invocation, regardless of binary, runs the same fourteen steps:
//! resolve, preflight, breaker gate, concurrency gate, argument hygiene,
//! default injection, assembly, scrubbed spawn, timeout supervision, capped
//! capture, classification, breaker report, metrics, and structured output.
//! Failures never propagate as `Err` — they are packaged into the returned
//! [`ToolOutput`] so the transport always has something well-formed to send.

use crate::breaker::CircuitBreaker;
use crate::safety::args::{enforce_allow_list, tokenize, validate_extra_args};
use crate::safety::target::is_lab_target;
use crate::utils::subprocess::{read_capped, scrubbed_command, shutdown_child};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{info, warn};
use uuid::Uuid;

/// Return code reported when the supervisor killed a timed-out subprocess.
pub const TIMEOUT_RETURNCODE: i32 = 124;
/// Return code reported when the binary is not on PATH.
pub const NOT_FOUND_RETURNCODE: i32 = 127;

/// Grace between SIGTERM and SIGKILL when tearing down a timed-out child.
const TERM_GRACE: Duration = Duration::from_secs(2);

/// Floor for reported execution times.
const MIN_EXECUTION_TIME: f64 = 0.001;

// ---------------------------------------------------------------------------
// Data model
// ---------------------------------------------------------------------------

/// One tool invocation as received from the client.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolInput {
    /// Host, IPv4 address, or CIDR. Must be a lab target.
    pub target: String,
    /// Raw argument blob, tokenized and checked against the allow list.
    #[serde(default)]
    pub extra_args: String,
    /// Override of the tool's default timeout, in seconds.
    #[serde(default)]
    pub timeout_sec: Option<f64>,
    /// Opaque id threaded through logs and metrics; generated when absent.
    #[serde(default)]
    pub correlation_id: Option<String>,
}

/// Classification of an invocation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    ValidationError,
    NotFound,
    Timeout,
    ExecutionError,
    ResourceExhausted,
    CircuitBreakerOpen,
    Unknown,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::ResourceExhausted => "RESOURCE_EXHAUSTED",
            Self::CircuitBreakerOpen => "CIRCUIT_BREAKER_OPEN",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether this failure reflects the health of the wrapped binary and
    /// should therefore count against the circuit breaker.
    pub fn counts_as_breaker_failure(self) -> bool {
        matches!(
            self,
            Self::Timeout | Self::ExecutionError | Self::ResourceExhausted | Self::Unknown
        )
    }

    fn default_returncode(self) -> i32 {
        match self {
            Self::NotFound => NOT_FOUND_RETURNCODE,
            Self::Timeout => TIMEOUT_RETURNCODE,
            _ => 1,
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// The result of one invocation, successful or not.
#[derive(Debug, Clone, Serialize)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub returncode: i32,
    pub truncated_stdout: bool,
    pub truncated_stderr: bool,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<ErrorKind>,
    pub execution_time: f64,
    pub correlation_id: String,
    pub metadata: HashMap<String, Value>,
}

impl ToolOutput {
    fn success(correlation_id: String, execution_time: f64) -> Self {
        Self {
            stdout: String::new(),
            stderr: String::new(),
            returncode: 0,
            truncated_stdout: false,
            truncated_stderr: false,
            timed_out: false,
            error: None,
            error_type: None,
            execution_time: execution_time.max(MIN_EXECUTION_TIME),
            correlation_id,
            metadata: HashMap::new(),
        }
    }
}

/// Canonical failure shape, rendered into a [`ToolOutput`] before leaving
/// the pipeline.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    pub kind: ErrorKind,
    pub message: String,
    pub recovery_suggestion: String,
    pub timestamp: DateTime<Utc>,
    pub tool_name: String,
    pub target: String,
    pub metadata: HashMap<String, Value>,
}

impl ErrorContext {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        recovery_suggestion: impl Into<String>,
        tool_name: &str,
        target: &str,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            recovery_suggestion: recovery_suggestion.into(),
            timestamp: Utc::now(),
            tool_name: tool_name.to_string(),
            target: target.to_string(),
            metadata: HashMap::new(),
        }
    }

    fn into_output(self, correlation_id: String, execution_time: f64) -> ToolOutput {
        let mut metadata = self.metadata;
        metadata.insert(
            "recovery_suggestion".to_string(),
            Value::String(self.recovery_suggestion),
        );
        metadata.insert(
            "timestamp".to_string(),
            Value::String(self.timestamp.to_rfc3339()),
        );
        ToolOutput {
            stdout: String::new(),
            stderr: String::new(),
            returncode: self.kind.default_returncode(),
            truncated_stdout: false,
            truncated_stderr: false,
            timed_out: self.kind == ErrorKind::Timeout,
            error: Some(self.message),
            error_type: Some(self.kind),
            execution_time: execution_time.max(MIN_EXECUTION_TIME),
            correlation_id,
            metadata,
        }
    }
}

/// A refused input: what was wrong and what the caller can do about it.
/// Returned by validation hooks; rendered as `VALIDATION_ERROR`.
#[derive(Debug, Clone)]
pub struct Rejection {
    pub message: String,
    pub suggestion: String,
}

impl Rejection {
    pub fn new(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Authorize a bare host/address/CIDR target. Profiles whose targets carry
/// extra shape (URLs, `host:service`) extract the host first and call this
/// on the extracted part.
pub fn ensure_lab_target(target: &str) -> Result<(), Rejection> {
    if is_lab_target(target) {
        Ok(())
    } else {
        Err(Rejection::new(
            format!("target '{}' is not an authorized lab target", target),
            "use an RFC1918 or loopback IPv4 address, a private CIDR, or a .lab.internal hostname",
        ))
    }
}

/// Immutable per-binary configuration. One instance per profile, created at
/// registration and never mutated.
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub command: &'static str,
    pub description: &'static str,
    /// Permitted flag prefixes; empty means unrestricted.
    pub allowed_flags: &'static [&'static str],
    /// `None` falls back to the configured tool default.
    pub default_timeout: Option<Duration>,
    /// `None` falls back to the configured tool default.
    pub concurrency: Option<usize>,
    /// Per-tool breaker overrides; `None` falls back to the global config.
    pub failure_threshold: Option<u32>,
    pub recovery_timeout: Option<Duration>,
    /// Leading mode subcommands, for tools that take one (gobuster).
    pub allowed_modes: &'static [&'static str],
}

/// Capability interface implemented by each wrapped binary.
///
/// Profiles are declarative: a descriptor plus optional hooks. They never
/// spawn anything themselves — the pipeline owns execution.
#[async_trait]
pub trait ToolProfile: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    /// Target and argument requirements, checked before the breaker and the
    /// concurrency gate. Failures become validation errors and never count
    /// against the breaker. The default authorizes a bare lab target;
    /// overrides must still lab-authorize whatever host they extract.
    async fn preflight(&self, input: &ToolInput) -> Result<(), Rejection> {
        ensure_lab_target(&input.target)
    }

    /// Inject safe defaults. Implementations may only add tokens — user
    /// flags are never removed or rewritten, and the result is re-checked
    /// against the allow list.
    fn optimize(&self, tokens: Vec<String>, _target: &str) -> Vec<String> {
        tokens
    }

    /// Final argument vector, excluding the resolved binary path. The
    /// default appends the target positionally; profiles that pass the
    /// target through a flag or reshape it override this.
    fn assemble(&self, tokens: Vec<String>, target: &str) -> Vec<String> {
        let mut argv = tokens;
        argv.push(target.to_string());
        argv
    }
}

/// Process-wide capture and argument caps, from the `security` config.
#[derive(Debug, Clone)]
pub struct ExecutionLimits {
    pub max_args_len: usize,
    pub max_stdout_bytes: usize,
    pub max_stderr_bytes: usize,
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_args_len: 2048,
            max_stdout_bytes: 1_048_576,
            max_stderr_bytes: 262_144,
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

fn validation_output(
    profile: &dyn ToolProfile,
    input: &ToolInput,
    correlation_id: &str,
    message: String,
    suggestion: &str,
    started: Instant,
) -> ToolOutput {
    let name = profile.descriptor().name;
    warn!(
        tool = name,
        error_type = ErrorKind::ValidationError.label(),
        target = %input.target,
        correlation_id = correlation_id,
        "{}",
        message
    );
    crate::metrics::record_execution(name, "error", ErrorKind::ValidationError.label());
    ErrorContext::new(
        ErrorKind::ValidationError,
        message,
        suggestion,
        name,
        &input.target,
    )
    .into_output(correlation_id.to_string(), started.elapsed().as_secs_f64())
}

/// Run one invocation through the full pipeline.
///
/// `breaker` is `None` when circuit breaking is disabled by configuration.
/// `default_timeout` is the effective per-tool timeout resolved by the
/// registry (descriptor override or configured default).
pub async fn execute(
    profile: &dyn ToolProfile,
    breaker: Option<&CircuitBreaker>,
    gate: &Arc<Semaphore>,
    limits: &ExecutionLimits,
    default_timeout: Duration,
    input: ToolInput,
) -> ToolOutput {
    let desc = profile.descriptor();
    let name = desc.name;
    let correlation_id = input
        .correlation_id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let started = Instant::now();

    // 1. Resolve the binary on PATH.
    let Ok(resolved) = which::which(desc.command) else {
        let message = format!("command '{}' not found on PATH", desc.command);
        warn!(
            tool = name,
            error_type = ErrorKind::NotFound.label(),
            target = %input.target,
            correlation_id = %correlation_id,
            "{}",
            message
        );
        crate::metrics::record_execution(name, "error", ErrorKind::NotFound.label());
        return ErrorContext::new(
            ErrorKind::NotFound,
            message,
            format!("install {} or adjust PATH for the server process", desc.command),
            name,
            &input.target,
        )
        .into_output(correlation_id, started.elapsed().as_secs_f64());
    };

    // 2. Target authorization and tool-specific preflight.
    if let Some(t) = input.timeout_sec
        && (!t.is_finite() || t <= 0.0)
    {
        return validation_output(
            profile,
            &input,
            &correlation_id,
            format!("timeout_sec must be > 0, got {}", t),
            "omit timeout_sec or pass a positive number of seconds",
            started,
        );
    }
    let timeout = input
        .timeout_sec
        .map_or(default_timeout, Duration::from_secs_f64);

    if let Err(rejection) = profile.preflight(&input).await {
        return validation_output(
            profile,
            &input,
            &correlation_id,
            rejection.message,
            &rejection.suggestion,
            started,
        );
    }

    // 3. Circuit breaker gate.
    if let Some(b) = breaker
        && let Err(denied) = b.allow_call().await
    {
        let message = format!("{}", denied);
        warn!(
            tool = name,
            error_type = ErrorKind::CircuitBreakerOpen.label(),
            target = %input.target,
            correlation_id = %correlation_id,
            "{}",
            message
        );
        crate::metrics::record_execution(name, "error", ErrorKind::CircuitBreakerOpen.label());
        return ErrorContext::new(
            ErrorKind::CircuitBreakerOpen,
            message,
            "wait for the recovery timeout to elapse before retrying",
            name,
            &input.target,
        )
        .into_output(correlation_id, started.elapsed().as_secs_f64());
    }

    // 4. Concurrency gate. Wait time here is excluded from execution_time.
    let permit = match gate.clone().acquire_owned().await {
        Ok(permit) => permit,
        Err(_) => {
            if let Some(b) = breaker {
                b.on_failure().await;
            }
            crate::metrics::record_execution(name, "error", ErrorKind::ResourceExhausted.label());
            return ErrorContext::new(
                ErrorKind::ResourceExhausted,
                format!("concurrency gate for '{}' is closed", name),
                "the server is shutting down; retry against a live instance",
                name,
                &input.target,
            )
            .into_output(correlation_id, started.elapsed().as_secs_f64());
        }
    };
    let gated = Instant::now();

    // 5. Argument hygiene, then 6. safe-default injection (re-checked).
    let args_result = validate_extra_args(&input.extra_args, limits.max_args_len)
        .and_then(|()| tokenize(&input.extra_args))
        .and_then(|tokens| {
            enforce_allow_list(&tokens, desc.allowed_flags)?;
            let optimized = profile.optimize(tokens, &input.target);
            enforce_allow_list(&optimized, desc.allowed_flags)?;
            Ok(optimized)
        });
    let tokens = match args_result {
        Ok(tokens) => tokens,
        Err(message) => {
            if let Some(b) = breaker {
                b.abort_probe().await;
            }
            drop(permit);
            return validation_output(
                profile,
                &input,
                &correlation_id,
                message,
                "remove the offending characters or flags from extra_args",
                gated,
            );
        }
    };

    // 7. Assembly.
    let argv = profile.assemble(tokens, &input.target);

    crate::metrics::execution_started(name);

    // 8. Spawn with a scrubbed environment, no stdin, piped output.
    let mut cmd = scrubbed_command(&resolved);
    cmd.args(&argv);
    let spawn_started = Instant::now();
    let mut child = match cmd.spawn() {
        Ok(child) => child,
        Err(e) => {
            crate::metrics::execution_finished(name);
            if let Some(b) = breaker {
                b.on_failure().await;
            }
            crate::metrics::record_execution(name, "error", ErrorKind::ExecutionError.label());
            warn!(
                tool = name,
                error_type = ErrorKind::ExecutionError.label(),
                target = %input.target,
                correlation_id = %correlation_id,
                "failed to spawn {}: {}",
                desc.command,
                e
            );
            drop(permit);
            return ErrorContext::new(
                ErrorKind::ExecutionError,
                format!("failed to spawn {}: {}", desc.command, e),
                "check that the binary is executable by the server process",
                name,
                &input.target,
            )
            .into_output(correlation_id, gated.elapsed().as_secs_f64());
        }
    };

    // 9/10. Supervise with timeout while draining both pipes under their caps.
    let stdout_task = child.stdout.take().map(|pipe| {
        let cap = limits.max_stdout_bytes;
        tokio::spawn(async move { read_capped(pipe, cap).await })
    });
    let stderr_task = child.stderr.take().map(|pipe| {
        let cap = limits.max_stderr_bytes;
        tokio::spawn(async move { read_capped(pipe, cap).await })
    });

    let (timed_out, status) = match tokio::time::timeout(timeout, child.wait()).await {
        Ok(Ok(status)) => (false, Some(status)),
        Ok(Err(e)) => {
            warn!(
                tool = name,
                correlation_id = %correlation_id,
                "failed to reap subprocess: {}",
                e
            );
            (false, None)
        }
        Err(_) => {
            shutdown_child(&mut child, TERM_GRACE).await;
            (true, None)
        }
    };

    let (stdout_bytes, truncated_stdout) = match stdout_task {
        Some(task) => task.await.unwrap_or((Vec::new(), false)),
        None => (Vec::new(), false),
    };
    let (stderr_bytes, truncated_stderr) = match stderr_task {
        Some(task) => task.await.unwrap_or((Vec::new(), false)),
        None => (Vec::new(), false),
    };

    let execution_time = spawn_started.elapsed().as_secs_f64().max(MIN_EXECUTION_TIME);
    drop(permit);

    // 11. Classify.
    let mut output = ToolOutput::success(correlation_id, execution_time);
    output.stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
    output.stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();
    output.truncated_stdout = truncated_stdout;
    output.truncated_stderr = truncated_stderr;

    if timed_out {
        output.timed_out = true;
        output.returncode = TIMEOUT_RETURNCODE;
        output.error = Some(format!(
            "{} timed out after {:.1}s and was killed",
            desc.command,
            timeout.as_secs_f64()
        ));
        output.error_type = Some(ErrorKind::Timeout);
        output.metadata.insert(
            "recovery_suggestion".to_string(),
            Value::String("narrow the scan scope or raise timeout_sec".to_string()),
        );
    } else {
        match status {
            Some(s) if s.success() => {}
            other => {
                let returncode = other.and_then(|s| s.code()).unwrap_or(1);
                output.returncode = returncode;
                output.error = Some(format!(
                    "{} exited with status {}",
                    desc.command, returncode
                ));
                output.error_type = Some(ErrorKind::ExecutionError);
                output.metadata.insert(
                    "recovery_suggestion".to_string(),
                    Value::String(
                        "inspect stderr for the tool's own diagnostics".to_string(),
                    ),
                );
            }
        }
    }

    // 12. Breaker report: timeouts and execution failures count, successes reset.
    if let Some(b) = breaker {
        match output.error_type {
            None => b.on_success().await,
            Some(kind) if kind.counts_as_breaker_failure() => b.on_failure().await,
            Some(_) => {}
        }
    }

    // 13. Metrics.
    crate::metrics::execution_finished(name);
    crate::metrics::record_duration(name, execution_time);
    match output.error_type {
        None => {
            crate::metrics::record_execution(name, "success", "none");
            info!(
                tool = name,
                returncode = output.returncode,
                execution_time = output.execution_time,
                truncated_stdout = output.truncated_stdout,
                truncated_stderr = output.truncated_stderr,
                correlation_id = %output.correlation_id,
                "tool execution completed"
            );
        }
        Some(kind) => {
            crate::metrics::record_execution(name, "error", kind.label());
            warn!(
                tool = name,
                error_type = kind.label(),
                target = %input.target,
                correlation_id = %output.correlation_id,
                "tool execution failed: {}",
                output.error.as_deref().unwrap_or("unknown")
            );
        }
    }

    // 14. Done.
    output
}
