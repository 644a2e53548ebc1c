//! src/reducers/mod.rs
use crate::store::Pair;
use async_trait::async_trait;
use tokio::sync::mpsc::{Receiver, Sender};

/// User reduce callback.
///
/// `values` is a lazy, finite, non-restartable stream of every value for
/// `key`; the producer closes it after the last value and it always carries
/// at least one. The callback consumes `values` until closed, emits output
/// pairs on `output`, and closes `output` on every exit path by dropping the
/// sender. Exactly one invocation happens per distinct key.
#[async_trait]
pub trait Reducer: Send + Sync + 'static {
    async fn reduce(
        &self,
        key: String,
        values: Receiver<String>,
        output: Sender<Pair>,
    ) -> anyhow::Result<()>;
}

mod adder;
pub use adder::Adder;
