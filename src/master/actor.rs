//! src/master/actor.rs
use crate::master::service::{MapTask, ReduceTask, Work, WorkResponse};
use tokio::sync::{mpsc, oneshot};

pub type Address = String;

/// Task lifecycle. Transitions are monotonic: Idle → Assigned → Done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Progress {
    Idle,
    Assigned,
    Done,
}

/// The coordinator's whole mutable world. Owned by a single actor task;
/// every access goes through a [`MasterHandle`].
#[derive(Debug, Default)]
pub struct MasterState {
    map_tasks: Vec<MapTask>,
    map_prog: Vec<Progress>,
    mappers: Vec<Address>,
    reduce_tasks: Vec<ReduceTask>,
    reduce_prog: Vec<Progress>,
    reducers: Vec<Address>,
    shutdown: bool,
}

impl MasterState {
    /// First idle slot wins; map tasks outrank reduce tasks, which drains
    /// the map phase before any reducer can start.
    fn get_work(&mut self, address: &str) -> WorkResponse {
        if self.shutdown {
            return WorkResponse {
                work: Work::None,
                shutdown: true,
            };
        }
        for (i, prog) in self.map_prog.iter_mut().enumerate() {
            if *prog == Progress::Idle {
                tracing::info!("worker '{address}' has taken map task #{i}");
                *prog = Progress::Assigned;
                self.mappers[i] = address.to_string();
                return WorkResponse {
                    work: Work::Map(self.map_tasks[i].clone()),
                    shutdown: false,
                };
            }
        }
        for (i, prog) in self.reduce_prog.iter_mut().enumerate() {
            if *prog == Progress::Idle {
                tracing::info!("worker '{address}' has taken reduce task #{i}");
                *prog = Progress::Assigned;
                self.reducers[i] = address.to_string();
                return WorkResponse {
                    work: Work::Reduce(self.reduce_tasks[i].clone()),
                    shutdown: false,
                };
            }
        }
        WorkResponse {
            work: Work::None,
            shutdown: false,
        }
    }

    /// An address from a previous phase matches nothing here and the call is
    /// a no-op.
    fn finished_work(&mut self, address: &str) {
        for (i, mapper) in self.mappers.iter().enumerate() {
            if mapper == address {
                self.map_prog[i] = Progress::Done;
            }
        }
        for (i, reducer) in self.reducers.iter().enumerate() {
            if reducer == address {
                self.reduce_prog[i] = Progress::Done;
            }
        }
    }

    fn install_map_tasks(&mut self, tasks: Vec<MapTask>) {
        self.map_prog = vec![Progress::Idle; tasks.len()];
        self.mappers = vec![Address::new(); tasks.len()];
        self.map_tasks = tasks;
    }

    /// Once every map task is done, reports the mapper addresses and clears
    /// the map-phase arrays for the next phase.
    fn map_tasks_finished(&mut self) -> Option<Vec<Address>> {
        if self.map_prog.iter().any(|prog| *prog != Progress::Done) {
            return None;
        }
        self.map_tasks.clear();
        self.map_prog.clear();
        Some(std::mem::take(&mut self.mappers))
    }

    fn install_reduce_tasks(&mut self, tasks: Vec<ReduceTask>) {
        self.reduce_prog = vec![Progress::Idle; tasks.len()];
        self.reducers = vec![Address::new(); tasks.len()];
        self.reduce_tasks = tasks;
    }

    fn reduce_tasks_finished(&mut self) -> Option<Vec<Address>> {
        if self.reduce_prog.iter().any(|prog| *prog != Progress::Done) {
            return None;
        }
        self.reduce_tasks.clear();
        self.reduce_prog.clear();
        Some(std::mem::take(&mut self.reducers))
    }

    fn shutdown(&mut self) {
        self.shutdown = true;
    }
}

type Command = Box<dyn FnOnce(&mut MasterState) + Send>;

#[derive(thiserror::Error, Debug)]
#[error("master actor is no longer running")]
pub struct ActorGone;

/// Cheaply cloneable entry point to the master actor. RPC methods and the
/// driver both submit closures; the actor applies them one at a time, which
/// is the only synchronization the master needs.
#[derive(Debug, Clone)]
pub struct MasterHandle {
    commands: mpsc::Sender<Command>,
}

impl MasterHandle {
    pub fn spawn() -> Self {
        let (commands, mut inbox) = mpsc::channel::<Command>(64);
        tokio::spawn(async move {
            let mut state = MasterState::default();
            while let Some(command) = inbox.recv().await {
                command(&mut state);
            }
        });
        Self { commands }
    }

    async fn submit<T, F>(&self, update: F) -> Result<T, ActorGone>
    where
        T: Send + 'static,
        F: FnOnce(&mut MasterState) -> T + Send + 'static,
    {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.commands
            .send(Box::new(move |state| {
                let _ = reply_tx.send(update(state));
            }))
            .await
            .map_err(|_| ActorGone)?;
        reply_rx.await.map_err(|_| ActorGone)
    }

    pub async fn ping(&self, address: Address) -> Result<String, ActorGone> {
        self.submit(move |_| {
            tracing::debug!("ping from '{address}'");
            "ping successful".to_string()
        })
        .await
    }

    pub async fn get_work(&self, address: Address) -> Result<WorkResponse, ActorGone> {
        self.submit(move |state| state.get_work(&address)).await
    }

    pub async fn finished_work(&self, address: Address) -> Result<(), ActorGone> {
        self.submit(move |state| state.finished_work(&address)).await
    }

    pub async fn execute_map_tasks(&self, tasks: Vec<MapTask>) -> Result<(), ActorGone> {
        self.submit(move |state| state.install_map_tasks(tasks)).await
    }

    pub async fn map_tasks_finished(&self) -> Result<Option<Vec<Address>>, ActorGone> {
        self.submit(|state| state.map_tasks_finished()).await
    }

    pub async fn execute_reduce_tasks(&self, tasks: Vec<ReduceTask>) -> Result<(), ActorGone> {
        self.submit(move |state| state.install_reduce_tasks(tasks))
            .await
    }

    pub async fn reduce_tasks_finished(&self) -> Result<Option<Vec<Address>>, ActorGone> {
        self.submit(|state| state.reduce_tasks_finished()).await
    }

    /// Sticky: once set, every later `get_work` reports shutdown.
    pub async fn shutdown(&self) -> Result<(), ActorGone> {
        self.submit(|state| state.shutdown()).await
    }
}
