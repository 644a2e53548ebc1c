//! src/mappers/word_counter.rs
use crate::mappers::Mapper;
use crate::store::Pair;
use anyhow::Context;
use async_trait::async_trait;
use tokio::sync::mpsc::Sender;

/// Emits `(word, "1")` for every lowercased alphanumeric run in the value.
pub struct WordCounter;

#[async_trait]
impl Mapper for WordCounter {
    async fn map(&self, _key: String, value: String, output: Sender<Pair>) -> anyhow::Result<()> {
        for word in value.to_lowercase().split(|c: char| !c.is_alphanumeric()) {
            if !word.is_empty() {
                output
                    .send(Pair::new(word, "1"))
                    .await
                    .context("pair consumer hung up")?;
            }
        }
        Ok(())
    }
}
