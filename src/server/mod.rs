//! MCP server: a thin routing layer over the registry.
//!
//! The handler owns no subprocess, breaker, or semaphore — it looks tools up
//! by name, parses the input, and delegates to the entry's pipeline. The
//! serialized [`ToolOutput`](crate::tools::ToolOutput) travels back as a
//! single text content block, including when the tool-level result is a
//! failure: transport errors are reserved for protocol faults.

use crate::config::{Config, Transport};
use crate::errors::RangekitError;
use crate::tools::{Registry, ToolInput};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Content, ErrorCode, ErrorData, Implementation,
    ListToolsResult, PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
    Tool,
};
use rmcp::service::RequestContext;
use rmcp::transport::stdio;
use rmcp::{RoleServer, ServerHandler, ServiceExt};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// State shared between the MCP handler, the HTTP surface, and the
/// shutdown task.
pub struct ServerState {
    registry: Arc<Registry>,
    transport: Transport,
    draining: AtomicBool,
    in_flight: AtomicUsize,
}

impl ServerState {
    pub fn new(registry: Arc<Registry>, transport: Transport) -> Self {
        Self {
            registry,
            transport,
            draining: AtomicBool::new(false),
            in_flight: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn transport(&self) -> Transport {
        self.transport
    }

    pub fn begin_drain(&self) {
        self.draining.store(true, Ordering::SeqCst);
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Decrements the in-flight count however the invocation ends.
struct InFlightGuard(Arc<ServerState>);

impl InFlightGuard {
    fn enter(state: &Arc<ServerState>) -> Self {
        state.in_flight.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(state))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Input schema advertised for every tool: the substrate's contract is
/// uniform, only the per-tool semantics differ.
fn input_schema() -> serde_json::Map<String, serde_json::Value> {
    json!({
        "type": "object",
        "properties": {
            "target": {
                "type": "string",
                "description": "Lab target: RFC1918/loopback IPv4, private CIDR, or .lab.internal hostname (tool-specific shapes like URLs or host:service build on this)"
            },
            "extra_args": {
                "type": "string",
                "description": "Additional arguments, checked against this tool's flag allow-list"
            },
            "timeout_sec": {
                "type": "number",
                "description": "Override of the tool's default timeout, in seconds"
            }
        },
        "required": ["target"]
    })
    .as_object()
    .cloned()
    .unwrap_or_default()
}

#[derive(Clone)]
pub struct RangekitServer {
    state: Arc<ServerState>,
}

impl RangekitServer {
    pub fn new(state: Arc<ServerState>) -> Self {
        Self { state }
    }

    fn tool_listing(&self) -> Vec<Tool> {
        self.state
            .registry
            .iter()
            .map(|entry| {
                let desc = entry.descriptor();
                Tool::new(desc.name, desc.description, Arc::new(input_schema()))
            })
            .collect()
    }

    async fn invoke(
        &self,
        name: &str,
        arguments: Option<serde_json::Map<String, serde_json::Value>>,
    ) -> Result<CallToolResult, ErrorData> {
        if self.state.is_draining() {
            return Err(ErrorData::new(
                ErrorCode::INVALID_REQUEST,
                "server is shutting down and no longer accepts invocations",
                None,
            ));
        }

        let Some(entry) = self.state.registry.get(name) else {
            return Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("tool '{}' is not registered", name),
                None,
            ));
        };
        if !entry.is_enabled() {
            return Err(ErrorData::new(
                ErrorCode::METHOD_NOT_FOUND,
                format!("tool '{}' is disabled", name),
                None,
            ));
        }

        let arguments = arguments.unwrap_or_default();
        let input: ToolInput = serde_json::from_value(serde_json::Value::Object(arguments))
            .map_err(|e| {
                ErrorData::new(
                    ErrorCode::INVALID_PARAMS,
                    format!("invalid tool arguments: {}", e),
                    None,
                )
            })?;

        let _guard = InFlightGuard::enter(&self.state);
        let output = entry.run(input, self.state.registry.limits()).await;

        let payload = serde_json::to_string(&output).map_err(|e| {
            ErrorData::new(
                ErrorCode::INTERNAL_ERROR,
                format!("failed to serialize tool output: {}", e),
                None,
            )
        })?;
        Ok(CallToolResult::success(vec![Content::text(payload)]))
    }
}

impl ServerHandler for RangekitServer {
    fn get_info(&self) -> ServerInfo {
        let instructions = format!(
            "rangekit exposes security assessment tools ({}) restricted to lab \
             targets: RFC1918/loopback IPv4 addresses, private CIDRs, and \
             .lab.internal hostnames. Every call takes {{target, extra_args?, \
             timeout_sec?}} and returns a JSON payload with stdout, stderr, \
             returncode, truncation flags, and error details. Arguments are \
             checked against per-tool allow-lists; shell metacharacters are \
             rejected.",
            self.state.registry.tool_names().join(", ")
        );

        let mut server_info = Implementation::default();
        server_info.name = "rangekit".to_string();
        server_info.version = crate::VERSION.to_string();

        let mut info = ServerInfo::default();
        info.protocol_version = ProtocolVersion::default();
        info.server_info = server_info;
        info.capabilities = ServerCapabilities::builder().enable_tools().build();
        info.instructions = Some(instructions);
        info
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, ErrorData> {
        Ok(ListToolsResult {
            next_cursor: None,
            tools: self.tool_listing(),
            ..Default::default()
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, ErrorData> {
        let name = request.name.to_string();
        self.invoke(&name, request.arguments).await
    }
}

/// Serve MCP over stdio until the client disconnects or a shutdown signal
/// lands. On signal: stop accepting invocations, wait up to the grace
/// period for in-flight calls, then cancel the transport (which reaps any
/// remaining children via `kill_on_drop`).
pub async fn serve(config: &Config, state: Arc<ServerState>) -> Result<(), RangekitError> {
    let handler = RangekitServer::new(Arc::clone(&state));
    let ct = CancellationToken::new();

    let service = handler
        .serve_with_ct(stdio(), ct.child_token())
        .await
        .map_err(|e| RangekitError::Transport(format!("failed to start MCP transport: {}", e)))?;

    let grace = Duration::from_secs_f64(config.server.shutdown_grace_secs);
    tokio::spawn(shutdown_watcher(Arc::clone(&state), ct, grace));

    service
        .waiting()
        .await
        .map_err(|e| RangekitError::Transport(format!("MCP transport failed: {}", e)))?;
    info!("transport closed, server exiting");
    Ok(())
}

async fn shutdown_watcher(state: Arc<ServerState>, ct: CancellationToken, grace: Duration) {
    wait_for_signal().await;
    info!(
        "shutdown signal received, draining up to {:.1}s",
        grace.as_secs_f64()
    );
    state.begin_drain();

    let deadline = Instant::now() + grace;
    while state.in_flight() > 0 && Instant::now() < deadline {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    let remaining = state.in_flight();
    if remaining > 0 {
        warn!(
            "grace period elapsed with {} invocation(s) in flight, cancelling",
            remaining
        );
    }
    ct.cancel();
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {}", e);
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
