//! Per-tool circuit breaker.
//!
//! Each registered tool owns one breaker shared by all of its invocations.
//! The breaker wraps only subprocess execution — validation failures are
//! caller faults and never reach it.

use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CircuitState {
    Closed,
    Open { since: Instant },
    HalfOpen { probing: bool },
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open { .. } => write!(f, "open"),
            Self::HalfOpen { .. } => write!(f, "half_open"),
        }
    }
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: u32,
}

/// Why a call was refused without running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallDenied {
    /// The circuit is open; `remaining` is the cooldown left.
    Open { remaining: Duration },
    /// The circuit is half-open and its single recovery probe is in flight.
    ProbeInFlight,
}

impl std::fmt::Display for CallDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Open { remaining } => write!(
                f,
                "circuit breaker is open ({}s remaining)",
                remaining.as_secs()
            ),
            Self::ProbeInFlight => {
                write!(f, "circuit breaker is half-open with a probe in flight")
            }
        }
    }
}

/// Point-in-time view for the registry metadata endpoint.
#[derive(Debug, Clone)]
pub struct BreakerSnapshot {
    pub state: String,
    pub consecutive_failures: u32,
    pub failure_threshold: u32,
    pub recovery_timeout: Duration,
}

pub struct CircuitBreaker {
    tool: String,
    failure_threshold: u32,
    recovery_timeout: Duration,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(tool: &str, failure_threshold: u32, recovery_timeout: Duration) -> Self {
        Self {
            tool: tool.to_string(),
            failure_threshold,
            recovery_timeout,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    /// Gate a call. In `Open`, the call is refused until the recovery timeout
    /// elapses, at which point the breaker moves to `HalfOpen` and admits a
    /// single probe; concurrent arrivals during the probe are refused as if
    /// the circuit were still open.
    pub async fn allow_call(&self) -> Result<(), CallDenied> {
        let mut inner = self.inner.lock().await;
        match inner.state {
            CircuitState::Closed => Ok(()),
            CircuitState::HalfOpen { probing } => {
                if probing {
                    Err(CallDenied::ProbeInFlight)
                } else {
                    inner.state = CircuitState::HalfOpen { probing: true };
                    Ok(())
                }
            }
            CircuitState::Open { since } => {
                let elapsed = since.elapsed();
                if elapsed >= self.recovery_timeout {
                    info!(
                        tool = %self.tool,
                        "circuit breaker transitioning open -> half_open after {}s",
                        elapsed.as_secs()
                    );
                    inner.state = CircuitState::HalfOpen { probing: true };
                    Ok(())
                } else {
                    Err(CallDenied::Open {
                        remaining: self.recovery_timeout - elapsed,
                    })
                }
            }
        }
    }

    /// Release an admitted call without recording an outcome. Used when the
    /// pipeline bails for a caller fault (validation) after `allow_call`
    /// already granted the half-open probe slot.
    pub async fn abort_probe(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state == (CircuitState::HalfOpen { probing: true }) {
            inner.state = CircuitState::HalfOpen { probing: false };
        }
    }

    pub async fn on_success(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures = 0;
        if matches!(inner.state, CircuitState::HalfOpen { .. }) {
            info!(tool = %self.tool, "circuit breaker probe succeeded: half_open -> closed");
            inner.state = CircuitState::Closed;
        }
    }

    pub async fn on_failure(&self) {
        let mut inner = self.inner.lock().await;
        inner.consecutive_failures += 1;
        let failures = inner.consecutive_failures;

        match inner.state {
            CircuitState::Closed => {
                if failures >= self.failure_threshold {
                    warn!(
                        tool = %self.tool,
                        "circuit breaker tripped after {} consecutive failures: closed -> open",
                        failures
                    );
                    inner.state = CircuitState::Open {
                        since: Instant::now(),
                    };
                }
            }
            CircuitState::HalfOpen { .. } => {
                warn!(tool = %self.tool, "circuit breaker probe failed: half_open -> open");
                inner.state = CircuitState::Open {
                    since: Instant::now(),
                };
            }
            CircuitState::Open { .. } => {}
        }
    }

    pub async fn snapshot(&self) -> BreakerSnapshot {
        let inner = self.inner.lock().await;
        BreakerSnapshot {
            state: inner.state.to_string(),
            consecutive_failures: inner.consecutive_failures,
            failure_threshold: self.failure_threshold,
            recovery_timeout: self.recovery_timeout,
        }
    }
}
