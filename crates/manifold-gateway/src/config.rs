//! Gateway configuration.

use std::collections::HashMap;

/// Default WebSocket listener port.
pub const DEFAULT_PORT: u16 = 8000;

/// Startup configuration, assembled by the CLI.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// WebSocket listener port. Health checks are served on `port + 1`.
    /// Port 0 binds ephemeral ports for both listeners (tests).
    pub port: u16,
    /// Command and argv that launch the stdio MCP server.
    pub command: Vec<String>,
    /// Extra environment variables for the server process, layered on
    /// top of the inherited environment.
    pub env: HashMap<String, String>,
}

impl GatewayConfig {
    pub fn new(port: u16, command: Vec<String>) -> Self {
        Self {
            port,
            command,
            env: HashMap::new(),
        }
    }
}

/// Resolve the effective port: a `PORT` environment value overrides the
/// `--port` flag when present and parseable.
pub fn resolve_port(flag: u16, env_port: Option<&str>) -> u16 {
    env_port
        .and_then(|v| v.trim().parse().ok())
        .unwrap_or(flag)
}
