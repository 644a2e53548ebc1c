//! src/executors/reduce.rs
use crate::executors::CHANNEL_CAPACITY;
use crate::master::ReduceTask;
use crate::merger::merge_stores;
use crate::naming::{reduce_input_file, reduce_output_file, reduce_temp_file};
use crate::reducers::Reducer;
use crate::store::{Pair, RecordStore};
use anyhow::Context;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};

/// Runs one reduce task: gather the M intermediate shards into a single
/// local store, scan it ordered by `(key, value)`, and stream each run of
/// equal keys through the user callback into the output store.
pub struct ReduceExecutor {
    task: ReduceTask,
    scratch_dir: PathBuf,
    reducer: Arc<dyn Reducer>,
}

/// One in-flight reduce invocation: the values feed, the running callback,
/// and the sink that owns the output store until the group drains.
struct Group {
    key: String,
    values: mpsc::Sender<String>,
    callback: JoinHandle<anyhow::Result<()>>,
    sink: JoinHandle<anyhow::Result<RecordStore>>,
}

impl ReduceExecutor {
    pub fn new(task: ReduceTask, scratch_dir: PathBuf, reducer: Arc<dyn Reducer>) -> Self {
        Self {
            task,
            scratch_dir,
            reducer,
        }
    }

    #[tracing::instrument("Reduce task execute", skip_all, fields(n = self.task.n))]
    pub async fn execute(&self) -> anyhow::Result<()> {
        let input_path = self.scratch_dir.join(reduce_input_file(self.task.n));
        let temp_path = self.scratch_dir.join(reduce_temp_file(self.task.n));
        merge_stores(&self.task.source_hosts, &input_path, &temp_path)
            .await
            .context("failed to gather intermediate shards")?;

        let output = RecordStore::create(&self.scratch_dir.join(reduce_output_file(self.task.n)))
            .context("failed to create reduce output store")?;

        let (rows_tx, mut rows_rx) = mpsc::channel::<Pair>(CHANNEL_CAPACITY);
        let scanner = task::spawn_blocking(move || -> anyhow::Result<()> {
            let input = RecordStore::open(&input_path)?;
            input.for_each_ordered(|pair| {
                rows_tx
                    .blocking_send(pair)
                    .map_err(|_| anyhow::anyhow!("row consumer hung up"))
            })?;
            input.close()
        });

        // Classic sorted group-by: remember the previous key, rotate the
        // group when it changes. The scanner cannot run ahead because the
        // value channel is only consumed by the current callback.
        let first = match rows_rx.recv().await {
            Some(row) => row,
            None => {
                scanner.await.context("row scanner panicked")??;
                output.close().context("failed to close reduce output store")?;
                return Ok(());
            }
        };
        let mut group = self.start_group(first.key, output);
        group
            .values
            .send(first.value)
            .await
            .context("reduce callback stopped consuming")?;

        while let Some(row) = rows_rx.recv().await {
            if row.key != group.key {
                let store = finish_group(group).await?;
                group = self.start_group(row.key, store);
            }
            group
                .values
                .send(row.value)
                .await
                .context("reduce callback stopped consuming")?;
        }

        let store = finish_group(group).await?;
        scanner.await.context("row scanner panicked")??;
        store.close().context("failed to close reduce output store")?;
        Ok(())
    }

    fn start_group(&self, key: String, output: RecordStore) -> Group {
        let (values_tx, values_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (out_tx, out_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let sink = tokio::spawn(drain_into_store(out_rx, output));
        let reducer = self.reducer.clone();
        let callback = tokio::spawn({
            let key = key.clone();
            async move { reducer.reduce(key, values_rx, out_tx).await }
        });
        Group {
            key,
            values: values_tx,
            callback,
            sink,
        }
    }
}

/// Closes the values feed, waits for the callback to finish, and waits for
/// its emissions to drain into the store before the next group may start.
async fn finish_group(group: Group) -> anyhow::Result<RecordStore> {
    drop(group.values);
    let reduced = group.callback.await.context("reduce callback panicked")?;
    let store = group.sink.await.context("output sink panicked")??;
    reduced.context("reduce callback failed")?;
    Ok(store)
}

async fn drain_into_store(
    mut pairs: mpsc::Receiver<Pair>,
    output: RecordStore,
) -> anyhow::Result<RecordStore> {
    while let Some(pair) = pairs.recv().await {
        output.insert(&pair.key, &pair.value)?;
    }
    Ok(output)
}
