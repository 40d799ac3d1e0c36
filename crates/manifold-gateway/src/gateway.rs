//! Gateway orchestration and subprocess supervision.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::net::TcpListener;
use tokio::process::Child;
use tokio::task::JoinHandle;

use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::events;
use crate::process;
use crate::registry::Registry;
use crate::router;
use crate::server::{self, WsState};
use crate::writer::ChildStdinWriter;

/// A running gateway: the spawned MCP server, its pipe tasks, the event
/// loop, and both listeners.
pub struct Gateway {
    /// Bound WebSocket port.
    pub port: u16,
    /// Bound health port (`port + 1`, or ephemeral when port 0 was
    /// requested).
    pub health_port: u16,
    child: Child,
    exited: Arc<AtomicBool>,
    _tasks: Vec<JoinHandle<()>>,
}

impl Gateway {
    /// Spawn the MCP server and bring up every task and listener.
    ///
    /// Fatal here means fatal: a spawn or bind failure is returned to the
    /// caller, which exits non-zero.
    pub async fn start(config: GatewayConfig) -> Result<Self, GatewayError> {
        let spawned = process::spawn_server(&config.command, &config.env)?;
        let exited = Arc::new(AtomicBool::new(false));

        let registry = Arc::new(Registry::new());
        let (events_tx, event_loop) = events::start(Arc::clone(&registry));
        let (stdin, stdin_task) = ChildStdinWriter::start(spawned.stdin);
        let stderr_task = tokio::spawn(process::log_stderr(spawned.stderr));
        let router_task = tokio::spawn(router::run_router(
            spawned.stdout,
            Arc::clone(&registry),
            events_tx.clone(),
        ));

        let ws_listener = TcpListener::bind(("0.0.0.0", config.port)).await?;
        let port = ws_listener.local_addr()?.port();
        let health_request = if config.port == 0 { 0 } else { port + 1 };
        let health_listener = TcpListener::bind(("0.0.0.0", health_request)).await?;
        let health_port = health_listener.local_addr()?.port();

        let ws_state = WsState {
            events: events_tx,
            stdin,
        };
        let ws_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(ws_listener, server::ws_app(ws_state)).await {
                tracing::error!("websocket listener failed: {e}");
            }
        });
        let health_state = Arc::clone(&exited);
        let health_task = tokio::spawn(async move {
            if let Err(e) = axum::serve(health_listener, server::health_app(health_state)).await {
                tracing::error!("health listener failed: {e}");
            }
        });

        tracing::info!(port, health_port, "gateway listening");

        Ok(Self {
            port,
            health_port,
            child: spawned.child,
            exited,
            _tasks: vec![
                event_loop,
                stdin_task,
                stderr_task,
                router_task,
                ws_task,
                health_task,
            ],
        })
    }

    /// The flag the health endpoint reads.
    pub fn exited_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.exited)
    }

    /// Supervise until the MCP server exits or `shutdown` resolves.
    ///
    /// Any server exit — clean or not — is fatal to the gateway, by
    /// design: replacing a crashed server is the orchestration layer's
    /// job. A shutdown signal instead kills the server best-effort and
    /// returns cleanly. In-flight requests are not drained either way.
    pub async fn run<F>(mut self, shutdown: F) -> Result<(), GatewayError>
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            status = self.child.wait() => {
                self.exited.store(true, Ordering::Relaxed);
                let status = status?;
                tracing::error!(%status, "MCP server exited");
                Err(GatewayError::ServerExited { status })
            }
            () = shutdown => {
                self.exited.store(true, Ordering::Relaxed);
                tracing::info!("shutting down, stopping MCP server");
                let _ = self.child.kill().await;
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn echo_config() -> GatewayConfig {
        GatewayConfig::new(0, vec!["cat".into()])
    }

    #[tokio::test]
    async fn start_binds_both_listeners() {
        let gateway = Gateway::start(echo_config()).await.unwrap();
        assert_ne!(gateway.port, 0);
        assert_ne!(gateway.health_port, 0);
        assert_ne!(gateway.port, gateway.health_port);
    }

    #[tokio::test]
    async fn shutdown_returns_ok() {
        let gateway = Gateway::start(echo_config()).await.unwrap();
        let result = gateway.run(std::future::ready(())).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn server_exit_is_fatal() {
        // `true` exits immediately with status 0 — still fatal.
        let config = GatewayConfig::new(0, vec!["true".into()]);
        let gateway = Gateway::start(config).await.unwrap();
        let exited = gateway.exited_flag();

        let result = gateway.run(std::future::pending()).await;
        match result {
            Err(GatewayError::ServerExited { status }) => assert!(status.success()),
            other => panic!("expected ServerExited, got {other:?}"),
        }
        assert!(exited.load(Ordering::Relaxed));
    }

    #[tokio::test]
    async fn spawn_failure_propagates() {
        let config = GatewayConfig::new(0, vec!["this_command_does_not_exist_xyz123".into()]);
        let result = Gateway::start(config).await;
        assert!(matches!(result, Err(GatewayError::Spawn { .. })));
    }
}
