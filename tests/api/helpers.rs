//! tests/api/helpers.rs
use mapred::configuration::{JobSettings, NodeSettings, Settings};
use mapred::mappers::WordCounter;
use mapred::reducers::Adder;
use mapred::startup::MasterNode;
use mapred::store::{Pair, RecordStore};
use mapred::worker::WorkerNode;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::task::JoinHandle;
use uuid::Uuid;

pub fn test_settings() -> Settings {
    Settings {
        node: NodeSettings {
            host: "127.0.0.1".into(),
            // Fast polling keeps the suite snappy; production default is 1s.
            poll_interval_ms: 25,
            scratch_root: std::env::temp_dir()
                .join("mapred-tests")
                .to_string_lossy()
                .into_owned(),
        },
        job: JobSettings {
            input_path: "unused.db".into(),
        },
    }
}

pub fn test_data_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("mapred-api-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).expect("Failed to create test data dir");
    dir
}

pub fn make_input_store(dir: &Path, name: &str, rows: &[(&str, &str)]) -> PathBuf {
    let path = dir.join(name);
    let store = RecordStore::create(&path).expect("Failed to create input store");
    for (key, value) in rows {
        store.insert(key, value).expect("Failed to insert input row");
    }
    store.close().expect("Failed to close input store");
    path
}

pub fn read_output(path: &Path) -> Vec<Pair> {
    let store = RecordStore::open(path).expect("Failed to open output store");
    store
        .all_pairs_ordered()
        .expect("Failed to scan output store")
}

pub struct TestCluster {
    pub master: MasterNode,
    pub worker_addresses: Vec<String>,
    pub worker_handles: Vec<JoinHandle<anyhow::Result<()>>>,
}

/// One master plus `workers` word-count workers, all on ephemeral ports.
pub async fn spawn_cluster(workers: usize) -> TestCluster {
    let settings = test_settings();
    let master = MasterNode::build(&settings, 0)
        .await
        .expect("Failed to build master");

    let mut worker_addresses = vec![];
    let mut worker_handles = vec![];
    for _ in 0..workers {
        let worker = WorkerNode::build(
            &settings,
            0,
            &master.rpc_address,
            Arc::new(WordCounter),
            Arc::new(Adder),
        )
        .await
        .expect("Failed to build worker");
        worker_addresses.push(worker.address().to_string());
        worker_handles.push(tokio::spawn(worker.run()));
    }

    TestCluster {
        master,
        worker_addresses,
        worker_handles,
    }
}

impl TestCluster {
    /// Waits for every worker to observe shutdown and exit cleanly.
    pub async fn join_workers(self) -> MasterNode {
        for handle in self.worker_handles {
            handle
                .await
                .expect("worker task panicked")
                .expect("worker exited with an error");
        }
        self.master
    }
}
