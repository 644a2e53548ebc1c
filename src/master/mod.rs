//! src/master/mod.rs
mod actor;
mod service;

pub use actor::{ActorGone, Address, MasterHandle, Progress};
pub use service::{
    CoordinationError, MapTask, MasterService, MasterServiceClient, ReduceTask, Work, WorkResponse,
};

use anyhow::Context;
use futures::{future, prelude::*};
use std::net::SocketAddr;
use tarpc::server::incoming::Incoming;
use tarpc::server::{self, Channel};
use tarpc::tokio_serde::formats::Json;
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;

impl From<ActorGone> for CoordinationError {
    fn from(_: ActorGone) -> Self {
        CoordinationError::CoordinatorStopped
    }
}

/// The worker-facing RPC front of the master actor.
#[derive(Clone)]
pub struct MasterServer {
    handle: MasterHandle,
}

impl MasterServer {
    pub fn new(handle: MasterHandle) -> Self {
        Self { handle }
    }

    /// An empty address would collide with the unassigned-slot sentinel in
    /// the actor's bookkeeping, so it is refused at the boundary.
    fn require_address(address: &str) -> Result<(), CoordinationError> {
        if address.trim().is_empty() {
            return Err(CoordinationError::BadRequest(
                "worker address is empty".into(),
            ));
        }
        Ok(())
    }

    #[tracing::instrument("MasterServer start", skip_all)]
    pub async fn start(
        &self,
        listen_addr: SocketAddr,
        shutdown_tx: &broadcast::Sender<()>,
    ) -> anyhow::Result<(SocketAddr, JoinHandle<anyhow::Result<()>>)> {
        let (addr_tx, addr_rx) = oneshot::channel::<SocketAddr>();

        let mut shutdown_rx = shutdown_tx.subscribe();
        let server = self.clone();
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = Self::run_until_stopped(listen_addr, addr_tx, server) => {
                    result
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("master RPC server shutting down");
                    Ok(())
                }
            }
        });
        let socket_addr = addr_rx.await.context("Failed to receive master address")?;
        tracing::info!("master RPC server listening on {socket_addr}");
        Ok((socket_addr, handle))
    }

    #[tracing::instrument("Run master until stopped", skip_all)]
    async fn run_until_stopped(
        listen_addr: SocketAddr,
        addr_tx: oneshot::Sender<SocketAddr>,
        master_server: MasterServer,
    ) -> anyhow::Result<()> {
        let mut listener = tarpc::serde_transport::tcp::listen(listen_addr, Json::default)
            .await
            .context("failed to bind master RPC listener")?;
        listener.config_mut().max_frame_length(usize::MAX);
        let socket_addr = listener.local_addr();
        let _ = addr_tx.send(socket_addr);
        listener
            // Ignore accept errors.
            .filter_map(|r| future::ready(r.ok()))
            .map(server::BaseChannel::with_defaults)
            // One channel per connection; workers share an IP on one host.
            .max_channels_per_key(1, |t| t.transport().peer_addr().unwrap())
            .map(|channel| {
                channel
                    .execute(master_server.clone().serve())
                    .for_each(spawn)
            })
            .buffer_unordered(32)
            .for_each(|_| async {})
            .await;
        Ok(())
    }
}

impl MasterService for MasterServer {
    #[tracing::instrument("Ping", skip_all, fields(worker = %address))]
    async fn ping(
        self,
        _: tarpc::context::Context,
        address: String,
    ) -> Result<String, CoordinationError> {
        Self::require_address(&address)?;
        Ok(self.handle.ping(address).await?)
    }

    #[tracing::instrument("Get work", skip_all, fields(worker = %address))]
    async fn get_work(
        self,
        _: tarpc::context::Context,
        address: String,
    ) -> Result<WorkResponse, CoordinationError> {
        Self::require_address(&address)?;
        Ok(self.handle.get_work(address).await?)
    }

    #[tracing::instrument("Finished work", skip_all, fields(worker = %address))]
    async fn finished_work(
        self,
        _: tarpc::context::Context,
        address: String,
    ) -> Result<(), CoordinationError> {
        Self::require_address(&address)?;
        Ok(self.handle.finished_work(address).await?)
    }
}

async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}
