//! TCP accept loop.

use std::net::SocketAddr;
use std::sync::Arc;

use fit_refs::RefStore;
use fit_store::ObjectStore;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::{RepoService, Served};

/// The fit daemon. Connections are accepted and served one at a time.
#[derive(Debug)]
pub struct Daemon {
    listener: TcpListener,
    service: RepoService,
}

impl Daemon {
    /// Bind the listening socket described by `config`.
    pub async fn bind(
        config: &ServerConfig,
        store: Arc<dyn ObjectStore>,
        refs: Arc<dyn RefStore>,
    ) -> ServerResult<Self> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        info!("fit daemon listening on {}", listener.local_addr()?);
        Ok(Self {
            listener,
            service: RepoService::new(store, refs, config.max_pack_size),
        })
    }

    /// Address actually bound (useful with port 0).
    pub fn local_addr(&self) -> ServerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve connections forever. Failed connections are logged and dropped.
    pub async fn serve(&self) -> ServerResult<()> {
        loop {
            if let Err(e) = self.serve_one().await {
                warn!(error = %e, "connection failed");
            }
        }
    }

    /// Accept a single connection and handle its request.
    pub async fn serve_one(&self) -> ServerResult<Served> {
        let (mut stream, peer) = self.listener.accept().await?;
        debug!(%peer, "accepted connection");
        let served = self.service.handle(&mut stream).await?;
        match &served {
            Served::Received { objects, updated } => {
                info!(%peer, objects, updated = ?updated.as_ref().map(|(b, _)| b), "received pack")
            }
            Served::Sent {
                branch, objects, ..
            } => info!(%peer, branch = %branch, objects, "sent pack"),
        }
        Ok(served)
    }
}
