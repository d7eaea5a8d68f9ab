use fit_protocol::{FitCodec, Request, DEFAULT_MAX_PACK_SIZE};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{SyncError, SyncResult};
use crate::types::Remote;

/// One request/response exchange with a daemon.
///
/// Every exchange uses a fresh connection: the request header and payload
/// are written, the write half is closed, and whatever the daemon sends back
/// is read until it closes its side. Replies longer than the limit
/// (default [`DEFAULT_MAX_PACK_SIZE`]) fail with
/// [`SyncError::ReplyTooLarge`].
#[derive(Debug)]
pub struct Exchange {
    stream: TcpStream,
    remote: Remote,
    max_reply: u64,
}

impl Exchange {
    pub async fn connect(remote: &Remote) -> SyncResult<Self> {
        let stream = TcpStream::connect((remote.host.as_str(), remote.port))
            .await
            .map_err(|source| SyncError::Connect {
                remote: remote.to_string(),
                source,
            })?;
        debug!(remote = %remote, "connected");
        Ok(Self {
            stream,
            remote: remote.clone(),
            max_reply: DEFAULT_MAX_PACK_SIZE,
        })
    }

    pub fn with_max_reply(mut self, limit: u64) -> Self {
        self.max_reply = limit;
        self
    }

    /// Send `request` followed by `payload`, then collect the reply.
    pub async fn run(mut self, request: &Request, payload: &[u8]) -> SyncResult<Vec<u8>> {
        FitCodec::write_request(&mut self.stream, request).await?;
        self.stream.write_all(payload).await?;
        self.stream.shutdown().await?;

        let mut reply = Vec::new();
        (&mut self.stream)
            .take(self.max_reply.saturating_add(1))
            .read_to_end(&mut reply)
            .await?;
        if reply.len() as u64 > self.max_reply {
            return Err(SyncError::ReplyTooLarge {
                remote: self.remote.to_string(),
                limit: self.max_reply,
            });
        }
        debug!(
            remote = %self.remote,
            command = request.command().name(),
            sent = payload.len(),
            received = reply.len(),
            "exchange complete"
        );
        Ok(reply)
    }
}
