//! src/fileserver.rs
use anyhow::Context;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::future::IntoFuture;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Read-only HTTP serving of one scratch directory under `/data/`.
///
/// This is the shuffle transport: mappers expose their partition files here
/// and reducers pull them with plain GETs. Only files directly inside the
/// scratch directory are reachable.
pub struct FileServer {
    dir: PathBuf,
    host: String,
    port: u16,
}

impl FileServer {
    pub fn new(dir: PathBuf, host: String, port: u16) -> Self {
        Self { dir, host, port }
    }

    #[tracing::instrument("FileServer start", skip_all, fields(dir = %self.dir.display()))]
    pub async fn start(
        &self,
        shutdown_tx: &broadcast::Sender<()>,
    ) -> anyhow::Result<(SocketAddr, JoinHandle<anyhow::Result<()>>)> {
        let app = Router::new()
            .route("/data/{filename}", get(serve_artifact))
            .with_state(Arc::new(self.dir.clone()));
        let listener = tokio::net::TcpListener::bind((self.host.as_str(), self.port))
            .await
            .with_context(|| format!("failed to bind {}:{}", self.host, self.port))?;
        let socket_addr = listener.local_addr().context("failed to read bound address")?;
        tracing::info!("file server listening on {socket_addr}");

        let mut shutdown_rx = shutdown_tx.subscribe();
        let handle = tokio::spawn(async move {
            tokio::select! {
                result = axum::serve(listener, app).into_future() => {
                    result.context("file server stopped unexpectedly")
                }
                _ = shutdown_rx.recv() => {
                    tracing::info!("file server shutting down");
                    Ok(())
                }
            }
        });
        Ok((socket_addr, handle))
    }
}

async fn serve_artifact(
    State(dir): State<Arc<PathBuf>>,
    Path(filename): Path<String>,
) -> Result<Vec<u8>, StatusCode> {
    // A single path segment is expected; anything that could escape the
    // scratch directory is treated as absent.
    if filename.contains(['/', '\\']) || filename.contains("..") {
        return Err(StatusCode::NOT_FOUND);
    }
    tokio::fs::read(dir.join(&filename))
        .await
        .map_err(|_| StatusCode::NOT_FOUND)
}
