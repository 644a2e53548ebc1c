//! src/master/service.rs
use crate::error::write_error_chain;

/// Immutable map task descriptor, created by the driver and consumed by
/// exactly one worker.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct MapTask {
    /// Total map tasks in the job.
    pub m: usize,
    /// Total reduce tasks in the job.
    pub r: usize,
    /// This task's 0-based index.
    pub n: usize,
    /// Address whose file server holds `map_<n>_source.db`.
    pub source_host: String,
}

/// Immutable reduce task descriptor.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ReduceTask {
    pub m: usize,
    pub r: usize,
    pub n: usize,
    /// The M URLs of the intermediate shards whose reducer index equals `n`.
    pub source_hosts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Work {
    Map(MapTask),
    Reduce(ReduceTask),
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct WorkResponse {
    pub work: Work,
    pub shutdown: bool,
}

/// Protocol-level failures a worker can see from the coordination RPCs.
///
/// Neither kind is fatal to the worker: on `BadRequest` it may fix the call
/// and re-poll, on `CoordinatorStopped` there is no more work to fetch.
#[derive(thiserror::Error, serde::Serialize, serde::Deserialize)]
pub enum CoordinationError {
    /// The request was understood but cannot be honored as sent.
    #[error("bad coordination request: {0}")]
    BadRequest(String),
    /// The state actor is gone; no further assignments can be made.
    #[error("the master coordinator has stopped")]
    CoordinatorStopped,
}

impl std::fmt::Debug for CoordinationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write_error_chain(f, self)
    }
}

#[tarpc::service]
pub trait MasterService {
    /// Liveness probe.
    async fn ping(address: String) -> Result<String, CoordinationError>;

    /// Hands the caller the first idle task, map phase first.
    async fn get_work(address: String) -> Result<WorkResponse, CoordinationError>;

    /// Marks every task currently assigned to `address` as done.
    async fn finished_work(address: String) -> Result<(), CoordinationError>;
}
