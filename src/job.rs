//! src/job.rs
use crate::error::write_error_chain;
use crate::master::{Address, MapTask, MasterHandle, ReduceTask};
use crate::merger::merge_stores;
use crate::naming::{make_url, map_output_file, map_source_file, reduce_output_file};
use crate::splitter::{split_store, SplitError};
use anyhow::Context;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::task;

#[derive(thiserror::Error)]
pub enum JobError {
    #[error(transparent)]
    Split(#[from] SplitError),
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl std::fmt::Debug for JobError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_error_chain(f, self)
    }
}

/// What a finished job looked like: where the merged store landed and which
/// worker ran each task.
#[derive(Debug)]
pub struct JobReport {
    pub output_path: PathBuf,
    pub mappers: Vec<Address>,
    pub reducers: Vec<Address>,
}

/// Master-side orchestration of one job: split, drive the map phase, derive
/// and drive the reduce phase from the mapper addresses, merge, shut down.
pub struct JobDriver {
    master: MasterHandle,
    data_address: String,
    scratch_dir: PathBuf,
    map_tasks: usize,
    reduce_tasks: usize,
    poll_interval: Duration,
}

impl JobDriver {
    pub fn new(
        master: MasterHandle,
        data_address: String,
        scratch_dir: PathBuf,
        map_tasks: usize,
        reduce_tasks: usize,
        poll_interval: Duration,
    ) -> Self {
        Self {
            master,
            data_address,
            scratch_dir,
            map_tasks,
            reduce_tasks,
            poll_interval,
        }
    }

    #[tracing::instrument("Run job", skip_all, fields(input = %input.display(), m = self.map_tasks, r = self.reduce_tasks))]
    pub async fn run(&self, input: &Path) -> Result<JobReport, JobError> {
        // A failed split aborts the job before any task is installed.
        let source = input.to_path_buf();
        let scratch = self.scratch_dir.clone();
        let shards = self.map_tasks;
        task::spawn_blocking(move || split_store(&source, &scratch, map_source_file, shards))
            .await
            .context("split task panicked")??;
        tracing::info!("input split into {} source shards", self.map_tasks);

        let map_tasks: Vec<MapTask> = (0..self.map_tasks)
            .map(|n| MapTask {
                m: self.map_tasks,
                r: self.reduce_tasks,
                n,
                source_host: self.data_address.clone(),
            })
            .collect();
        self.master
            .execute_map_tasks(map_tasks)
            .await
            .context("failed to install map tasks")?;
        let mappers = self
            .await_phase(|master| async move { master.map_tasks_finished().await })
            .await?;
        tracing::info!("map phase complete, {} tasks done", self.map_tasks);

        // Reduce task n pulls the n-th partition from every mapper.
        let reduce_tasks: Vec<ReduceTask> = (0..self.reduce_tasks)
            .map(|n| ReduceTask {
                m: self.map_tasks,
                r: self.reduce_tasks,
                n,
                source_hosts: (0..self.map_tasks)
                    .map(|j| make_url(&mappers[j], &map_output_file(j, n)))
                    .collect(),
            })
            .collect();
        self.master
            .execute_reduce_tasks(reduce_tasks)
            .await
            .context("failed to install reduce tasks")?;
        let reducers = self
            .await_phase(|master| async move { master.reduce_tasks_finished().await })
            .await?;
        tracing::info!("reduce phase complete, {} tasks done", self.reduce_tasks);

        let output_path = results_path(input)?;
        let urls: Vec<String> = (0..self.reduce_tasks)
            .map(|n| make_url(&reducers[n], &reduce_output_file(n)))
            .collect();
        merge_stores(&urls, &output_path, &self.scratch_dir.join("merge_temp.db"))
            .await
            .context("failed to merge reducer outputs")?;
        tracing::info!("final output merged into {}", output_path.display());

        self.master
            .shutdown()
            .await
            .context("failed to request shutdown")?;

        Ok(JobReport {
            output_path,
            mappers,
            reducers,
        })
    }

    async fn await_phase<F, Fut>(&self, poll: F) -> Result<Vec<Address>, JobError>
    where
        F: Fn(MasterHandle) -> Fut,
        Fut: std::future::Future<
            Output = Result<Option<Vec<Address>>, crate::master::ActorGone>,
        >,
    {
        loop {
            if let Some(addresses) = poll(self.master.clone())
                .await
                .context("master actor is gone")?
            {
                return Ok(addresses);
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

/// `ResultsOf-<basename>` next to the input store.
fn results_path(input: &Path) -> anyhow::Result<PathBuf> {
    let basename = input
        .file_name()
        .and_then(|name| name.to_str())
        .context("input path has no usable file name")?;
    Ok(input.with_file_name(format!("ResultsOf-{basename}")))
}
