use thiserror::Error;

/// Typed error hierarchy for rangekit startup and wiring.
///
/// Use at module boundaries (config validation, transport startup, registry
/// construction). Internal/leaf functions can continue using `anyhow::Result`
/// — the `Internal` variant allows seamless conversion via the `?` operator.
///
/// Tool-level failures never travel through this type: the execution
/// pipeline packages them into a `ToolOutput` instead of returning `Err`.
#[derive(Debug, Error)]
pub enum RangekitError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests;
