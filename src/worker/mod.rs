//! src/worker/mod.rs
use crate::configuration::Settings;
use crate::executors::{MapExecutor, ReduceExecutor};
use crate::fileserver::FileServer;
use crate::mappers::Mapper;
use crate::master::{MasterServiceClient, Work};
use crate::reducers::Reducer;
use crate::startup::create_scratch_dir;
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tarpc::tokio_serde::formats::Json;
use tarpc::{client, context};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

pub async fn connect_master(address: &str) -> anyhow::Result<MasterServiceClient> {
    let mut transport = tarpc::serde_transport::tcp::connect(address, Json::default);
    transport.config_mut().max_frame_length(usize::MAX);
    let transport = transport
        .await
        .with_context(|| format!("failed to connect to master at {address}"))?;
    Ok(MasterServiceClient::new(client::Config::default(), transport).spawn())
}

/// One worker process: a file server over its own scratch directory plus a
/// polling loop that pulls tasks from the master until shutdown.
///
/// The `host:port` of the file server doubles as the worker's identity; it
/// is the address reducers fetch this worker's partitions from, and the
/// address the master records against every task handed out.
pub struct WorkerNode {
    address: String,
    scratch_dir: PathBuf,
    master: MasterServiceClient,
    poll_interval: Duration,
    mapper: Arc<dyn Mapper>,
    reducer: Arc<dyn Reducer>,
    server_handle: JoinHandle<anyhow::Result<()>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl WorkerNode {
    pub async fn build(
        settings: &Settings,
        listen_port: u16,
        master_address: &str,
        mapper: Arc<dyn Mapper>,
        reducer: Arc<dyn Reducer>,
    ) -> anyhow::Result<Self> {
        let scratch_dir = create_scratch_dir(&settings.node.scratch_root)?;
        let (shutdown_tx, _) = broadcast::channel(1);
        let file_server = FileServer::new(
            scratch_dir.clone(),
            settings.node.host.clone(),
            listen_port,
        );
        let (socket_addr, server_handle) = file_server.start(&shutdown_tx).await?;
        let address = format!("{}:{}", settings.node.host, socket_addr.port());
        let master = connect_master(master_address).await?;
        Ok(Self {
            address,
            scratch_dir,
            master,
            poll_interval: settings.node.poll_interval(),
            mapper,
            reducer,
            server_handle,
            shutdown_tx,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Polls until the master reports shutdown. Any task failure is fatal:
    /// the error propagates and the process exits with a diagnostic.
    #[tracing::instrument("Worker run", skip_all, fields(address = %self.address))]
    pub async fn run(self) -> anyhow::Result<()> {
        loop {
            let response = self
                .master
                .get_work(context::current(), self.address.clone())
                .await
                .context("get_work call failed")??;
            match response.work {
                Work::Map(task) => {
                    tracing::info!("processing map task #{}", task.n);
                    MapExecutor::new(task, self.scratch_dir.clone(), self.mapper.clone())
                        .execute()
                        .await?;
                    self.report_finished().await?;
                }
                Work::Reduce(task) => {
                    tracing::info!("processing reduce task #{}", task.n);
                    ReduceExecutor::new(task, self.scratch_dir.clone(), self.reducer.clone())
                        .execute()
                        .await?;
                    self.report_finished().await?;
                }
                Work::None if response.shutdown => {
                    tracing::info!("master reports shutdown, leaving");
                    break;
                }
                Work::None => {
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
        // The driver has merged our outputs before it flips the shutdown
        // flag, so the file server has nothing left to serve.
        self.shutdown_tx.send(()).ok();
        self.server_handle
            .await
            .context("file server task panicked")??;
        Ok(())
    }

    async fn report_finished(&self) -> anyhow::Result<()> {
        self.master
            .finished_work(context::current(), self.address.clone())
            .await
            .context("finished_work call failed")??;
        Ok(())
    }
}
