//! Serialized writer for the shared child stdin.
//!
//! Stdin is the one resource every client writes to, so all writes funnel
//! through a single task that owns the pipe: one bounded channel in, one
//! JSON line out, flushed per message. Interleaved partial writes are
//! impossible by construction, and FIFO order per sender is preserved by
//! the channel.

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::correlate;
use crate::error::GatewayError;
use crate::jsonrpc::RpcMessage;
use crate::registry::ClientId;

/// Depth of the shared stdin queue.
pub const STDIN_QUEUE_DEPTH: usize = 64;

/// Clone-able handle to the single stdin writer task.
#[derive(Clone)]
pub struct ChildStdinWriter {
    tx: mpsc::Sender<String>,
}

impl ChildStdinWriter {
    /// Start the writer task that owns the child's stdin.
    ///
    /// Generic over the sink so tests can use an in-memory pipe. The task
    /// exits when every handle is dropped or the pipe breaks.
    pub fn start<W>(writer: W) -> (Self, JoinHandle<()>)
    where
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<String>(STDIN_QUEUE_DEPTH);
        let handle = tokio::spawn(async move {
            let mut writer = writer;
            while let Some(line) = rx.recv().await {
                if writer.write_all(line.as_bytes()).await.is_err() {
                    break;
                }
                if writer.write_all(b"\n").await.is_err() {
                    break;
                }
                if writer.flush().await.is_err() {
                    break;
                }
            }
        });
        (Self { tx }, handle)
    }

    /// Rewrite the message id to its composite form, serialize, and
    /// enqueue one line for the child.
    ///
    /// Messages without an id (notifications) pass through unchanged.
    pub async fn send(&self, client: &ClientId, mut msg: RpcMessage) -> Result<(), GatewayError> {
        if let Some(id) = msg.id.take() {
            msg.id = Some(correlate::compose(client, &id));
        }
        let line = serde_json::to_string(&msg)?;
        tracing::debug!(client_id = %client, "client → server: {line}");
        self.tx
            .send(line)
            .await
            .map_err(|_| GatewayError::StdinClosed)
    }
}
