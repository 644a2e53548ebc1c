//! src/executors/map.rs
use crate::executors::CHANNEL_CAPACITY;
use crate::mappers::Mapper;
use crate::master::MapTask;
use crate::merger::download;
use crate::naming::{make_url, map_input_file, map_output_file, map_source_file};
use crate::partition::partition;
use crate::store::{Pair, RecordStore};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task;

/// Runs one map task: fetch the source shard, feed each row to the user
/// callback, and fan the emitted pairs out into R partition stores keyed by
/// `fnv1a32(key) % R`.
pub struct MapExecutor {
    task: MapTask,
    scratch_dir: PathBuf,
    mapper: Arc<dyn Mapper>,
}

impl MapExecutor {
    pub fn new(task: MapTask, scratch_dir: PathBuf, mapper: Arc<dyn Mapper>) -> Self {
        Self {
            task,
            scratch_dir,
            mapper,
        }
    }

    #[tracing::instrument("Map task execute", skip_all, fields(n = self.task.n))]
    pub async fn execute(&self) -> anyhow::Result<()> {
        let source_url = make_url(&self.task.source_host, &map_source_file(self.task.n));
        let input_path = self.scratch_dir.join(map_input_file(self.task.n));
        download(&source_url, &input_path)
            .await
            .context("failed to fetch map source shard")?;

        let mut outputs = Vec::with_capacity(self.task.r);
        for i in 0..self.task.r {
            let path = self.scratch_dir.join(map_output_file(self.task.n, i));
            outputs.push(
                RecordStore::create(&path)
                    .with_context(|| format!("failed to create partition {}", path.display()))?,
            );
        }

        // The SQLite cursor stays on a blocking thread; rows cross into the
        // async side over a bounded channel.
        let (rows_tx, mut rows_rx) = mpsc::channel::<Pair>(CHANNEL_CAPACITY);
        let scanner = task::spawn_blocking(move || -> anyhow::Result<()> {
            let source = RecordStore::open(&input_path)?;
            source.for_each(|pair| {
                rows_tx
                    .blocking_send(pair)
                    .map_err(|_| anyhow::anyhow!("row consumer hung up"))
            })?;
            source.close()
        });

        // One callback invocation per row, one fresh channel per invocation.
        // The writer hands the partition stores back when the callback closes
        // its channel, so the callback never gets more than a row ahead of
        // the inserts.
        let reduce_tasks = self.task.r;
        while let Some(row) = rows_rx.recv().await {
            let (pairs_tx, pairs_rx) = mpsc::channel::<Pair>(CHANNEL_CAPACITY);
            let writer = tokio::spawn(write_partitions(pairs_rx, outputs, reduce_tasks));
            let mapped = self.mapper.map(row.key, row.value, pairs_tx).await;
            outputs = writer.await.context("partition writer panicked")??;
            mapped.context("map callback failed")?;
        }
        scanner.await.context("source scanner panicked")??;

        for output in outputs {
            output.close().context("failed to close partition store")?;
        }
        Ok(())
    }
}

async fn write_partitions(
    mut pairs: mpsc::Receiver<Pair>,
    outputs: Vec<RecordStore>,
    reduce_tasks: usize,
) -> anyhow::Result<Vec<RecordStore>> {
    while let Some(pair) = pairs.recv().await {
        let index = partition(&pair.key, reduce_tasks);
        outputs[index].insert(&pair.key, &pair.value)?;
    }
    Ok(outputs)
}
