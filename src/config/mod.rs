pub mod loader;
pub mod schema;

pub use loader::load_config;
pub use schema::{
    CircuitBreakerConfig, Config, LoggingConfig, MetricsConfig, SecurityConfig, ServerConfig,
    ToolConfig, Transport,
};
