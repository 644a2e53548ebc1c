//! src/mappers/mod.rs
use crate::store::Pair;
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

/// User map callback.
///
/// Consumes one input pair and emits zero or more output pairs on `output`.
/// The channel is owned by the callback, so it closes on every exit path
/// (return or error) when the sender drops; the processor relies on that to
/// know the emission is over. `map` is never invoked concurrently with
/// itself on the same processor.
#[async_trait]
pub trait Mapper: Send + Sync + 'static {
    async fn map(&self, key: String, value: String, output: Sender<Pair>) -> anyhow::Result<()>;
}

mod word_counter;
pub use word_counter::WordCounter;
