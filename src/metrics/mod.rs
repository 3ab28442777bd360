//! Metrics sink for the invocation substrate.
//!
//! Built on the `metrics` facade: when the Prometheus recorder is installed
//! the counters/histograms/gauges below are exported, and when metrics are
//! disabled the macros dispatch to the global no-op recorder, so call sites
//! never branch on availability.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::warn;

pub const EXECUTIONS_TOTAL: &str = "rangekit_tool_executions_total";
pub const EXECUTION_SECONDS: &str = "rangekit_tool_execution_seconds";
pub const ACTIVE_EXECUTIONS: &str = "rangekit_tool_active_executions";

/// Durations are clamped to this floor before recording, matching the
/// `execution_time` floor in tool output.
pub const MIN_DURATION_SECS: f64 = 0.001;

/// Install the Prometheus recorder and register metric descriptions.
///
/// Returns `None` (and keeps running) if the recorder cannot be installed —
/// the substrate then degrades to no-op metrics rather than failing startup.
pub fn init() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            describe_counter!(
                EXECUTIONS_TOTAL,
                "Tool executions by tool, status and error type"
            );
            describe_histogram!(EXECUTION_SECONDS, "Tool execution wall time in seconds");
            describe_gauge!(ACTIVE_EXECUTIONS, "Currently running tool subprocesses");
            Some(handle)
        }
        Err(e) => {
            warn!("failed to install metrics recorder, continuing without: {}", e);
            None
        }
    }
}

pub fn record_execution(tool: &str, status: &'static str, error_type: &str) {
    counter!(
        EXECUTIONS_TOTAL,
        "tool" => tool.to_string(),
        "status" => status,
        "error_type" => error_type.to_string()
    )
    .increment(1);
}

pub fn record_duration(tool: &str, seconds: f64) {
    histogram!(EXECUTION_SECONDS, "tool" => tool.to_string())
        .record(seconds.max(MIN_DURATION_SECS));
}

pub fn execution_started(tool: &str) {
    gauge!(ACTIVE_EXECUTIONS, "tool" => tool.to_string()).increment(1.0);
}

pub fn execution_finished(tool: &str) {
    gauge!(ACTIVE_EXECUTIONS, "tool" => tool.to_string()).decrement(1.0);
}
