//! Manifold gateway — bridges one stdio MCP server to many WebSocket clients.
//!
//! The wrapped server speaks newline-delimited JSON-RPC 2.0 over a single
//! stdin/stdout pair, so every client shares one conversation. The gateway
//! rewrites correlation ids on the way in (`<client>:<original>`), splits
//! them back apart on the way out to route each response to its true
//! sender, and broadcasts anything that carries no routable id. A slow
//! client is dropped rather than allowed to block the shared pipe, and any
//! exit of the wrapped server brings the whole gateway down.

pub mod config;
pub mod correlate;
pub mod error;
pub mod events;
pub mod gateway;
pub mod jsonrpc;
pub mod process;
pub mod registry;
pub mod router;
pub mod server;
pub mod writer;

pub use config::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Gateway;
pub use jsonrpc::RpcMessage;
pub use registry::{Client, ClientId, Registry};
