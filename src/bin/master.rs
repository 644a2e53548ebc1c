//! src/bin/master.rs
use anyhow::Context;
use clap::Parser;
use mapred::configuration::get_configuration;
use mapred::startup::MasterNode;
use mapred::telemetry::init_tracing;
use std::path::Path;

#[derive(Parser, Debug)]
#[command(about = "MapReduce master: splits the input, coordinates workers, merges the result")]
struct Args {
    /// Port the RPC server listens on
    listen_port: u16,
    /// Number of map tasks
    map_tasks: usize,
    /// Number of reduce tasks
    reduce_tasks: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing("mapred-master")?;
    let args = Args::parse();
    let settings = get_configuration().context("Failed to read configuration.")?;

    let node = MasterNode::build(&settings, args.listen_port).await?;
    tracing::info!(
        "master up: rpc on {}, data on {}",
        node.rpc_address,
        node.data_address
    );

    let driver = node.driver(args.map_tasks, args.reduce_tasks);
    let report = driver.run(Path::new(&settings.job.input_path)).await?;
    tracing::info!("job complete: {}", report.output_path.display());

    node.stop().await?;
    Ok(())
}
