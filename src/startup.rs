//! src/startup.rs
use crate::configuration::Settings;
use crate::fileserver::FileServer;
use crate::job::JobDriver;
use crate::master::{MasterHandle, MasterServer};
use anyhow::Context;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Each process owns one scratch directory; nothing else ever writes to it.
pub fn create_scratch_dir(root: &str) -> anyhow::Result<PathBuf> {
    let dir = PathBuf::from(root).join(format!("mapred.{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("failed to create scratch directory {}", dir.display()))?;
    Ok(dir)
}

/// The master process: the state actor, the RPC server workers dial, and a
/// file server exposing the scratch directory the input shards land in.
///
/// The RPC server binds the configured listen port. The file server binds an
/// OS-assigned port whose address only ever travels inside task descriptors,
/// so nothing needs to know it up front.
pub struct MasterNode {
    pub rpc_address: String,
    pub data_address: String,
    handle: MasterHandle,
    scratch_dir: PathBuf,
    poll_interval: std::time::Duration,
    handles: Vec<JoinHandle<anyhow::Result<()>>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl MasterNode {
    #[tracing::instrument("MasterNode build", skip_all)]
    pub async fn build(settings: &Settings, listen_port: u16) -> anyhow::Result<Self> {
        let scratch_dir = create_scratch_dir(&settings.node.scratch_root)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let handle = MasterHandle::spawn();

        let listen_addr: SocketAddr = format!("{}:{}", settings.node.host, listen_port)
            .parse()
            .context("node host must be an IP address")?;
        let server = MasterServer::new(handle.clone());
        let (rpc_addr, rpc_handle) = server.start(listen_addr, &shutdown_tx).await?;

        let file_server = FileServer::new(scratch_dir.clone(), settings.node.host.clone(), 0);
        let (data_addr, data_handle) = file_server.start(&shutdown_tx).await?;

        Ok(Self {
            rpc_address: format!("{}:{}", settings.node.host, rpc_addr.port()),
            data_address: format!("{}:{}", settings.node.host, data_addr.port()),
            handle,
            scratch_dir,
            poll_interval: settings.node.poll_interval(),
            handles: vec![rpc_handle, data_handle],
            shutdown_tx,
        })
    }

    pub fn handle(&self) -> &MasterHandle {
        &self.handle
    }

    pub fn driver(&self, map_tasks: usize, reduce_tasks: usize) -> JobDriver {
        JobDriver::new(
            self.handle.clone(),
            self.data_address.clone(),
            self.scratch_dir.clone(),
            map_tasks,
            reduce_tasks,
            self.poll_interval,
        )
    }

    /// Stops the RPC and file servers. The actor task ends with the process.
    #[tracing::instrument("MasterNode stop", skip_all)]
    pub async fn stop(self) -> anyhow::Result<()> {
        self.shutdown_tx.send(()).ok();
        for handle in self.handles {
            handle.await.context("server task panicked")??;
        }
        tracing::info!("all master services stopped");
        Ok(())
    }
}
