//! src/bin/worker.rs
use anyhow::Context;
use clap::Parser;
use mapred::configuration::get_configuration;
use mapred::mappers::WordCounter;
use mapred::reducers::Adder;
use mapred::telemetry::init_tracing;
use mapred::worker::WorkerNode;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(about = "MapReduce worker: polls the master for tasks until shutdown")]
struct Args {
    /// Port the worker's file server listens on; host:port is the worker's
    /// identity
    listen_port: u16,
    /// host:port of the master's RPC server
    master_address: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("mapred-worker")?;
    let args = Args::parse();
    let settings = get_configuration().context("Failed to read configuration.")?;

    let worker = WorkerNode::build(
        &settings,
        args.listen_port,
        &args.master_address,
        Arc::new(WordCounter),
        Arc::new(Adder),
    )
    .await?;
    tracing::info!("worker up at {}", worker.address());

    worker.run().await
}
