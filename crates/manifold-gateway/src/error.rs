//! Error types for the gateway.

use thiserror::Error;

/// Errors from gateway startup and supervision.
///
/// Only `EmptyCommand`, `Spawn`, and `ServerExited` are fatal to the
/// gateway process; everything else is contained and logged where it
/// occurs.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("no server command provided")]
    EmptyCommand,

    #[error("Failed to spawn MCP server '{command}': {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("MCP server exited: {status}")]
    ServerExited { status: std::process::ExitStatus },

    #[error("server stdin closed")]
    StdinClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
